//! Findings Aggregator: reads per-repo and per-agent findings files and
//! presents combined views across sources.

pub mod collect;
pub mod filter;
pub mod render;

pub use collect::{collect, Scope, SourceKind, SourcedFinding};
pub use filter::FindingFilter;
pub use render::{render as render_findings, Format};

#[cfg(test)]
mod tests {
    use super::*;
    use air_types::Severity;

    #[test]
    fn collect_filter_render_end_to_end() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(workspace.path().join("analysis/reviews")).unwrap();
        std::fs::write(
            workspace.path().join("analysis/reviews/svc-a-findings.json"),
            serde_json::to_vec(&serde_json::json!({
                "repo": "svc-a",
                "generated_at": "2026-07-29T00:00:00Z",
                "results": [],
                "findings": [
                    {"category": "security", "severity": "critical", "title": "sqli", "description": "d", "location": "a.py", "metadata": {}},
                    {"category": "quality", "severity": "low", "title": "long fn", "description": "d", "location": "b.py", "metadata": {}}
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let collected = collect(workspace.path(), &Scope::All).unwrap();
        assert_eq!(collected.len(), 2);

        let filtered = FindingFilter { severity_min: Some(Severity::High), category: None }.apply(collected);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].finding.title, "sqli");

        let rendered = render_findings(&filtered, Format::Markdown);
        assert!(rendered.contains("svc-a"));
        assert!(rendered.contains("sqli"));
    }
}
