//! Analysis Orchestrator: sequences Analyzer runs across one or many repos,
//! threading through the Worker Pool and the Dependency Graph's leveling,
//! and writes one findings artifact per repo plus one dependency-graph
//! artifact per multi-repo run.

use air_classifier::Classifier;
use air_depgraph::{DependencyGraph, RepoInput};
use air_errors::{AirError, AirResult};
use air_types::{AnalyzerResult, Finding};
use air_worker_pool::{CancelToken, ProgressEvent, UnitState, WorkUnit, WorkerPool, WorkerPoolConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// One unit's lifecycle as reported to the caller's progress callback.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    UnitStarted { repo: String, analyzer: String },
    UnitCompleted { repo: String, analyzer: String, elapsed_ms: u64 },
    LevelCompleted { level_index: usize, repos: Vec<String> },
    DegradedMode { reason: String },
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub worker_pool: WorkerPoolConfig,
    /// Directory findings artifacts are written under (default: `analysis/reviews`).
    pub output_root: PathBuf,
    /// Analyzer names to run; defaults to every built-in analyzer.
    pub analyzers: Vec<String>,
    pub include_external: bool,
    /// Set when the run was restricted to one analyzer via a focus filter
    /// (e.g. `--focus=security`); recorded in each artifact's metadata.
    pub focus: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_pool: WorkerPoolConfig::default(),
            output_root: PathBuf::from("analysis/reviews"),
            analyzers: air_analyzers::AnalyzerRegistry::with_builtins()
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            include_external: false,
            focus: None,
        }
    }
}

/// Header describing how and when a findings artifact was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analyzed_at: DateTime<Utc>,
    pub software_version: String,
    pub analyzers_run: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

/// Persisted at `analysis/reviews/<repo>-findings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsArtifact {
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology_stack: Option<String>,
    pub analysis_metadata: AnalysisMetadata,
    pub results: Vec<AnalyzerResult>,
    pub findings: Vec<Finding>,
}

impl FindingsArtifact {
    fn new(repo: &str, technology_stack: Option<String>, results: Vec<AnalyzerResult>, config: &OrchestratorConfig) -> Self {
        let mut findings: Vec<Finding> = results.iter().flat_map(|r| r.findings.clone()).collect();
        findings.sort();
        Self {
            repo: repo.to_string(),
            technology_stack,
            analysis_metadata: AnalysisMetadata {
                analyzed_at: Utc::now(),
                software_version: config.worker_pool.software_version.clone(),
                analyzers_run: config.analyzers.clone(),
                focus: config.focus.clone(),
            },
            results,
            findings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMode {
    /// `--all`: level by dependency order.
    Ordered,
    /// `--no-order`: flat, single level.
    NoOrder,
    /// `--deps-only`: ordered, excluding isolated (no-edge) repos.
    DepsOnly,
}

fn artifact_path(output_root: &std::path::Path, repo_name: &str) -> PathBuf {
    output_root.join(format!("{repo_name}-findings.json"))
}

/// Atomic write: temp file beside the destination, then rename, mirroring
/// the cache's write convention.
fn write_artifact(output_root: &std::path::Path, artifact: &FindingsArtifact) -> AirResult<PathBuf> {
    std::fs::create_dir_all(output_root)?;
    let path = artifact_path(output_root, &artifact.repo);
    let tmp_path = output_root.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    let serialized = serde_json::to_vec_pretty(artifact)?;
    std::fs::write(&tmp_path, &serialized)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

fn read_artifact(path: &std::path::Path) -> AirResult<FindingsArtifact> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `analysis/dependency-graph.json` lives beside `analysis/reviews/`, i.e.
/// one level up from `output_root`.
fn dependency_graph_path(output_root: &std::path::Path) -> PathBuf {
    output_root
        .parent()
        .map(|parent| parent.join("dependency-graph.json"))
        .unwrap_or_else(|| output_root.join("dependency-graph.json"))
}

/// Writes the full repo -> [dep-repo, ...] edge map atomically.
fn write_dependency_graph(output_root: &std::path::Path, graph: &DependencyGraph) -> AirResult<PathBuf> {
    let path = dependency_graph_path(output_root);
    let dir = path.parent().unwrap_or(output_root);
    std::fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    let serialized = serde_json::to_vec_pretty(&graph.to_map())?;
    std::fs::write(&tmp_path, &serialized)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// Runs every configured analyzer against one repo and returns its results
/// in submission order, alongside the classifier's technology stack guess.
/// Progress events are emitted with the repo/analyzer names the worker
/// pool itself does not carry (it only knows unit ids).
async fn run_repo_units(
    repo: &RepoInput,
    config: &OrchestratorConfig,
    cancel: &CancelToken,
    on_progress: &mut impl FnMut(OrchestratorEvent),
) -> (Option<String>, Vec<AnalyzerResult>) {
    let classification = Classifier::new().classify(&repo.path);
    let pool = WorkerPool::new(config.worker_pool.clone());

    let units: Vec<WorkUnit> = config
        .analyzers
        .iter()
        .map(|name| WorkUnit::new(name.clone(), repo.path.clone(), config.include_external))
        .collect();
    let analyzer_by_id: HashMap<String, String> =
        units.iter().map(|u| (u.id.clone(), u.analyzer_name.clone())).collect();
    let repo_name = repo.name.clone();
    let started_at: HashMap<String, Instant> = units.iter().map(|u| (u.id.clone(), Instant::now())).collect();

    let results = pool
        .run(units, cancel, |event: ProgressEvent| {
            let Some(analyzer) = analyzer_by_id.get(&event.unit_id) else { return };
            match event.state {
                UnitState::Started => on_progress(OrchestratorEvent::UnitStarted {
                    repo: repo_name.clone(),
                    analyzer: analyzer.clone(),
                }),
                UnitState::Completed | UnitState::Failed => {
                    let elapsed_ms = started_at
                        .get(&event.unit_id)
                        .map(|i| i.elapsed().as_millis() as u64)
                        .unwrap_or(0);
                    on_progress(OrchestratorEvent::UnitCompleted {
                        repo: repo_name.clone(),
                        analyzer: analyzer.clone(),
                        elapsed_ms,
                    });
                }
            }
        })
        .await;

    (classification.technology_stack, results.into_iter().map(|(_, r)| r).collect())
}

/// Single-repo mode: runs the classifier and every configured analyzer,
/// then writes one findings artifact.
pub async fn run_single(
    repo: &RepoInput,
    config: &OrchestratorConfig,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(OrchestratorEvent),
) -> AirResult<PathBuf> {
    let (technology_stack, results) = run_repo_units(repo, config, cancel, &mut on_progress).await;
    let artifact = FindingsArtifact::new(&repo.name, technology_stack, results, config);
    write_artifact(&config.output_root, &artifact)
}

/// Multi-repo mode: builds and levels the dependency graph, writes the
/// graph artifact, then walks levels in order, awaiting each level's
/// completion before the next starts.
pub async fn run_multi(
    repos: &[RepoInput],
    config: &OrchestratorConfig,
    mode: MultiMode,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(OrchestratorEvent),
) -> AirResult<Vec<PathBuf>> {
    let graph = DependencyGraph::build(repos);
    let by_name: HashMap<&str, &RepoInput> = repos.iter().map(|r| (r.name.as_str(), r)).collect();

    let (ordered_levels, cycle_findings) = graph.levels();
    let levels: Vec<Vec<String>> = match mode {
        MultiMode::NoOrder => vec![repos.iter().map(|r| r.name.clone()).collect()],
        MultiMode::Ordered => ordered_levels,
        MultiMode::DepsOnly => {
            let connected: std::collections::HashSet<String> = graph.repos_with_dependencies().into_iter().collect();
            ordered_levels
                .into_iter()
                .map(|level| level.into_iter().filter(|n| connected.contains(n)).collect::<Vec<_>>())
                .filter(|level: &Vec<String>| !level.is_empty())
                .collect()
        }
    };
    if matches!(mode, MultiMode::Ordered | MultiMode::DepsOnly) && !cycle_findings.is_empty() {
        tracing::warn!(count = cycle_findings.len(), "dependency graph contains cycles; leveling is partial");
    }

    write_dependency_graph(&config.output_root, &graph)?;

    let mut written = Vec::new();
    for (level_index, level) in levels.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        for repo_name in level {
            let Some(repo) = by_name.get(repo_name.as_str()) else { continue };
            let (technology_stack, results) = run_repo_units(repo, config, cancel, &mut on_progress).await;
            let artifact = FindingsArtifact::new(&repo.name, technology_stack, results, config);
            let path = write_artifact(&config.output_root, &artifact)?;
            written.push(path);
        }
        on_progress(OrchestratorEvent::LevelCompleted {
            level_index,
            repos: level.clone(),
        });
    }

    Ok(written)
}

/// Gap-analysis mode: analyzes `lib_name` first, then each of its
/// transitive dependents, appending cross-repo version-gap findings to
/// every dependent's findings artifact.
pub async fn run_gap(
    lib_name: &str,
    repos: &[RepoInput],
    config: &OrchestratorConfig,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(OrchestratorEvent),
) -> AirResult<Vec<PathBuf>> {
    let graph = DependencyGraph::build(repos);
    let by_name: HashMap<&str, &RepoInput> = repos.iter().map(|r| (r.name.as_str(), r)).collect();

    let Some(lib_repo) = by_name.get(lib_name) else {
        return Err(AirError::validation(format!("unknown repo: {lib_name}")));
    };

    write_dependency_graph(&config.output_root, &graph)?;

    let mut written = Vec::new();
    let (technology_stack, results) = run_repo_units(lib_repo, config, cancel, &mut on_progress).await;
    let artifact = FindingsArtifact::new(lib_name, technology_stack, results, config);
    written.push(write_artifact(&config.output_root, &artifact)?);

    for dependent_name in graph.transitive_dependents(lib_name) {
        if cancel.is_cancelled() {
            break;
        }
        let Some(dependent) = by_name.get(dependent_name.as_str()) else { continue };
        let (technology_stack, results) = run_repo_units(dependent, config, cancel, &mut on_progress).await;
        let mut artifact = FindingsArtifact::new(&dependent_name, technology_stack, results, config);
        let extra = graph.gap_findings_for(&dependent_name);
        if !extra.is_empty() {
            artifact.findings.extend(extra);
            artifact.findings.sort();
        }
        let path = write_artifact(&config.output_root, &artifact)?;
        written.push(path);
    }

    Ok(written)
}

/// Reads back a previously written artifact, appends `extra` to its
/// findings list, and rewrites it atomically. Used by callers that need to
/// attach gap findings to an artifact written by a prior run rather than
/// one produced in the same invocation.
pub fn append_findings(output_root: &std::path::Path, repo_name: &str, extra: Vec<Finding>) -> AirResult<PathBuf> {
    let path = artifact_path(output_root, repo_name);
    let mut artifact = read_artifact(&path)?;
    artifact.findings.extend(extra);
    artifact.findings.sort();
    write_artifact(output_root, &artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_repo(dir: &std::path::Path, name: &str) -> RepoInput {
        let path = dir.join(name);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("app.py"), "password = \"hunter2\"\n").unwrap();
        RepoInput::new(name, path)
    }

    fn test_config(dir: &std::path::Path) -> OrchestratorConfig {
        OrchestratorConfig {
            worker_pool: WorkerPoolConfig {
                workers: 2,
                timeout: std::time::Duration::from_secs(5),
                worker_binary: PathBuf::from("/nonexistent/air-worker-binary-for-tests"),
                cache_dir: dir.join("cache"),
                software_version: "1.0.0".to_string(),
            },
            output_root: dir.join("reviews"),
            analyzers: vec!["security".to_string()],
            include_external: false,
            focus: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_repo_mode_writes_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let repo = sample_repo(dir.path(), "svc-a");
        let config = test_config(dir.path());
        let cancel = CancelToken::new();

        let path = run_single(&repo, &config, &cancel, |_| {}).await.unwrap();
        assert!(path.exists());
        let artifact: FindingsArtifact = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(artifact.repo, "svc-a");
        assert!(artifact.findings.iter().any(|f| f.title == "Hardcoded secret"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn multi_repo_ordered_mode_runs_in_dependency_levels() {
        let dir = tempfile::tempdir().unwrap();
        let lib = sample_repo(dir.path(), "widget-core");
        let app = sample_repo(dir.path(), "app");
        std::fs::write(app.path.join("requirements.txt"), "widget-core>=1.0\n").unwrap();
        std::fs::write(lib.path.join("pyproject.toml"), "[project]\nname = \"widget-core\"\nversion = \"1.0.0\"\n").unwrap();

        let repos = vec![app.clone(), lib.clone()];
        let config = test_config(dir.path());
        let cancel = CancelToken::new();
        let mut level_order = Vec::new();
        let paths = run_multi(&repos, &config, MultiMode::Ordered, &cancel, |event| {
            if let OrchestratorEvent::LevelCompleted { repos, .. } = event {
                level_order.push(repos);
            }
        })
        .await
        .unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(level_order[0], vec!["widget-core".to_string()]);
        assert_eq!(level_order[1], vec!["app".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deps_only_mode_excludes_isolated_repos() {
        let dir = tempfile::tempdir().unwrap();
        let lonely = sample_repo(dir.path(), "lonely");
        let config = test_config(dir.path());
        let cancel = CancelToken::new();
        let paths = run_multi(&[lonely], &config, MultiMode::DepsOnly, &cancel, |_| {}).await.unwrap();
        assert!(paths.is_empty());
    }
}
