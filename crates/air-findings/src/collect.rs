//! Scans `analysis/reviews/*.json` and `.air/agents/*/findings.json` into a
//! flat, source-attributed finding list.

use air_errors::AirResult;
use air_types::Finding;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A finding plus the source it was collected from.
#[derive(Debug, Clone)]
pub struct SourcedFinding {
    pub finding: Finding,
    pub source: String,
    pub source_kind: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceKind {
    Repo,
    Agent,
}

#[derive(Debug, Clone)]
pub enum Scope {
    All,
    AgentIds(Vec<String>),
}

/// Mirrors `analysis/reviews/<repo>-findings.json`'s shape loosely enough to
/// tolerate the richer `FindingsArtifact` the orchestrator writes without
/// depending on that crate.
#[derive(Debug, Deserialize)]
struct RepoArtifact {
    repo: String,
    #[serde(default)]
    findings: Vec<Finding>,
}

/// `.air/agents/<id>/findings.json` is a bare findings array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentArtifact {
    Bare(Vec<Finding>),
    Wrapped { findings: Vec<Finding> },
}

/// Collects findings from every repo artifact, plus agent artifacts
/// matching `scope`.
pub fn collect(workspace_root: &Path, scope: &Scope) -> AirResult<Vec<SourcedFinding>> {
    let mut collected = Vec::new();
    collected.extend(collect_repo_findings(workspace_root)?);

    let agent_ids = match scope {
        Scope::All => None,
        Scope::AgentIds(ids) => Some(ids),
    };
    collected.extend(collect_agent_findings(workspace_root, agent_ids)?);
    Ok(collected)
}

fn collect_repo_findings(workspace_root: &Path) -> AirResult<Vec<SourcedFinding>> {
    let reviews_dir = workspace_root.join("analysis/reviews");
    let mut out = Vec::new();
    if !reviews_dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(&reviews_dir)? {
        let entry = entry?;
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            let bytes = std::fs::read(entry.path())?;
            let artifact: RepoArtifact = match serde_json::from_slice(&bytes) {
                Ok(artifact) => artifact,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable findings artifact");
                    continue;
                }
            };
            for finding in artifact.findings {
                out.push(SourcedFinding { finding, source: artifact.repo.clone(), source_kind: SourceKind::Repo });
            }
        }
    }
    Ok(out)
}

fn collect_agent_findings(workspace_root: &Path, agent_ids: Option<&Vec<String>>) -> AirResult<Vec<SourcedFinding>> {
    let agents_dir = workspace_root.join(".air/agents");
    let mut out = Vec::new();
    if !agents_dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(&agents_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let agent_id = entry.file_name().to_string_lossy().into_owned();
        if let Some(ids) = agent_ids {
            if !ids.iter().any(|id| id == &agent_id) {
                continue;
            }
        }
        let findings_path: PathBuf = entry.path().join("findings.json");
        if !findings_path.is_file() {
            continue;
        }
        let bytes = std::fs::read(&findings_path)?;
        let findings = match serde_json::from_slice::<AgentArtifact>(&bytes) {
            Ok(AgentArtifact::Bare(findings)) => findings,
            Ok(AgentArtifact::Wrapped { findings }) => findings,
            Err(e) => {
                tracing::warn!(path = %findings_path.display(), error = %e, "skipping unreadable agent findings");
                continue;
            }
        };
        for finding in findings {
            out.push(SourcedFinding { finding, source: agent_id.clone(), source_kind: SourceKind::Agent });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_types::Severity;

    fn finding_json(title: &str) -> serde_json::Value {
        serde_json::json!({
            "category": "security",
            "severity": "high",
            "title": title,
            "description": "d",
            "location": "f.py",
            "metadata": {}
        })
    }

    #[test]
    fn collects_repo_and_agent_findings() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(workspace.path().join("analysis/reviews")).unwrap();
        std::fs::write(
            workspace.path().join("analysis/reviews/svc-a-findings.json"),
            serde_json::to_vec(&serde_json::json!({
                "repo": "svc-a",
                "generated_at": "2026-07-29T00:00:00Z",
                "results": [],
                "findings": [finding_json("sql injection")]
            }))
            .unwrap(),
        )
        .unwrap();

        std::fs::create_dir_all(workspace.path().join(".air/agents/agent-1")).unwrap();
        std::fs::write(
            workspace.path().join(".air/agents/agent-1/findings.json"),
            serde_json::to_vec(&vec![finding_json("dead code")]).unwrap(),
        )
        .unwrap();

        let collected = collect(workspace.path(), &Scope::All).unwrap();
        assert_eq!(collected.len(), 2);
        assert!(collected.iter().any(|c| c.source == "svc-a" && c.source_kind == SourceKind::Repo));
        assert!(collected.iter().any(|c| c.source == "agent-1" && c.source_kind == SourceKind::Agent));
        assert!(collected.iter().all(|c| c.finding.severity == Severity::High));
    }

    #[test]
    fn agent_scope_filters_to_requested_ids() {
        let workspace = tempfile::tempdir().unwrap();
        for id in ["agent-1", "agent-2"] {
            std::fs::create_dir_all(workspace.path().join(".air/agents").join(id)).unwrap();
            std::fs::write(
                workspace.path().join(".air/agents").join(id).join("findings.json"),
                serde_json::to_vec(&vec![finding_json("x")]).unwrap(),
            )
            .unwrap();
        }

        let collected = collect(workspace.path(), &Scope::AgentIds(vec!["agent-1".to_string()])).unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].source, "agent-1");
    }
}
