//! Rendering combined findings views.

use crate::collect::SourcedFinding;
use air_types::Severity;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Markdown,
    Json,
    Html,
}

/// Groups by source, then by severity (descending), preserving
/// `SourcedFinding`'s insertion order within each severity bucket.
fn group(findings: &[SourcedFinding]) -> BTreeMap<String, BTreeMap<Severity, Vec<&SourcedFinding>>> {
    let mut grouped: BTreeMap<String, BTreeMap<Severity, Vec<&SourcedFinding>>> = BTreeMap::new();
    for item in findings {
        grouped.entry(item.source.clone()).or_default().entry(item.finding.severity).or_default().push(item);
    }
    grouped
}

fn severities_desc() -> [Severity; 5] {
    [Severity::Critical, Severity::High, Severity::Medium, Severity::Low, Severity::Info]
}

pub fn render(findings: &[SourcedFinding], format: Format) -> String {
    match format {
        Format::Text => render_text(findings),
        Format::Markdown => render_markdown(findings),
        Format::Json => render_json(findings),
        Format::Html => render_html(findings),
    }
}

fn render_text(findings: &[SourcedFinding]) -> String {
    let grouped = group(findings);
    let mut out = String::new();
    for (source, by_severity) in &grouped {
        out.push_str(&format!("== {source} ==\n"));
        for severity in severities_desc() {
            let Some(items) = by_severity.get(&severity) else { continue };
            out.push_str(&format!("[{severity:?}]\n"));
            for item in items {
                out.push_str(&format!("  {} ({}): {}\n", item.finding.title, item.finding.location, item.finding.description));
            }
        }
        out.push('\n');
    }
    out.trim_end().to_string() + "\n"
}

fn render_markdown(findings: &[SourcedFinding]) -> String {
    let grouped = group(findings);
    let mut out = String::from("# Findings\n\n");
    for (source, by_severity) in &grouped {
        out.push_str(&format!("## {source}\n\n"));
        for severity in severities_desc() {
            let Some(items) = by_severity.get(&severity) else { continue };
            out.push_str(&format!("### {severity:?}\n\n"));
            for item in items {
                out.push_str(&format!("- **{}** (`{}`): {}\n", item.finding.title, item.finding.location, item.finding.description));
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string() + "\n"
}

fn render_json(findings: &[SourcedFinding]) -> String {
    let grouped = group(findings);
    let mut by_source = serde_json::Map::new();
    for (source, by_severity) in &grouped {
        let mut severities = serde_json::Map::new();
        for severity in severities_desc() {
            let Some(items) = by_severity.get(&severity) else { continue };
            let values: Vec<serde_json::Value> = items.iter().map(|item| serde_json::to_value(&item.finding).unwrap_or_default()).collect();
            severities.insert(format!("{severity:?}").to_lowercase(), serde_json::Value::Array(values));
        }
        by_source.insert(source.clone(), serde_json::Value::Object(severities));
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(by_source)).unwrap_or_default()
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// A self-contained HTML document: inline `<style>`, no external assets
/// or scripts.
fn render_html(findings: &[SourcedFinding]) -> String {
    let grouped = group(findings);
    let mut body = String::new();
    for (source, by_severity) in &grouped {
        body.push_str(&format!("<h2>{}</h2>\n", html_escape(source)));
        for severity in severities_desc() {
            let Some(items) = by_severity.get(&severity) else { continue };
            body.push_str(&format!("<h3 class=\"sev-{:?}\">{:?}</h3>\n<ul>\n", severity, severity));
            for item in items {
                body.push_str(&format!(
                    "<li><strong>{}</strong> (<code>{}</code>): {}</li>\n",
                    html_escape(&item.finding.title),
                    html_escape(&item.finding.location),
                    html_escape(&item.finding.description),
                ));
            }
            body.push_str("</ul>\n");
        }
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Findings</title>\n<style>\nbody {{ font-family: sans-serif; margin: 2rem; }}\nh2 {{ border-bottom: 1px solid #ccc; }}\n.sev-Critical {{ color: #b00020; }}\n.sev-High {{ color: #d84315; }}\n.sev-Medium {{ color: #ef6c00; }}\n.sev-Low {{ color: #757575; }}\n.sev-Info {{ color: #9e9e9e; }}\n</style>\n</head>\n<body>\n<h1>Findings</h1>\n{body}</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::SourceKind;
    use air_types::Finding;

    fn sample() -> Vec<SourcedFinding> {
        vec![
            SourcedFinding {
                finding: Finding::new("security", Severity::Critical, "sql injection", "d", "a.py"),
                source: "svc-a".to_string(),
                source_kind: SourceKind::Repo,
            },
            SourcedFinding {
                finding: Finding::new("quality", Severity::Low, "long function", "d", "b.py"),
                source: "svc-a".to_string(),
                source_kind: SourceKind::Repo,
            },
        ]
    }

    #[test]
    fn text_groups_by_source_then_severity() {
        let out = render(&sample(), Format::Text);
        assert!(out.contains("== svc-a =="));
        let critical_pos = out.find("Critical").unwrap();
        let low_pos = out.find("Low").unwrap();
        assert!(critical_pos < low_pos);
    }

    #[test]
    fn html_is_self_contained_and_escapes_titles() {
        let mut findings = sample();
        findings[0].finding.title = "<script>alert(1)</script>".to_string();
        let out = render(&findings, Format::Html);
        assert!(out.contains("<style>"));
        assert!(!out.contains("<script>alert"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn json_round_trips_through_serde_value() {
        let out = render(&sample(), Format::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value.get("svc-a").is_some());
    }
}
