//! Worker Pool: runs analyzers out-of-process, bounded by a configurable
//! concurrency limit, behind a small JSON request/response contract so
//! the child never needs anything but stdin/stdout.
//!
//! The child side of the contract (reading a [`WorkerRequest`], running the
//! named analyzer, writing a [`WorkerResponse`]) lives in the `air-worker`
//! binary crate, not here — this crate is the parent-side pool plus the
//! shared wire types.

use air_analyzers::AnalyzerRegistry;
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::AnalyzerResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinSet;

/// One (repo, analyzer) pair submitted to the pool.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub id: String,
    pub analyzer_name: String,
    pub repo_path: PathBuf,
    pub include_external: bool,
}

impl WorkUnit {
    pub fn new(analyzer_name: impl Into<String>, repo_path: impl Into<PathBuf>, include_external: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            analyzer_name: analyzer_name.into(),
            repo_path: repo_path.into(),
            include_external,
        }
    }
}

/// The JSON object written to the child's stdin.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub analyzer_name: String,
    pub repo_path: PathBuf,
    pub include_external: bool,
    pub cache_dir: PathBuf,
    pub software_version: String,
}

/// The JSON object the child writes to stdout on completion.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub status: WorkerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalyzerResult>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Started,
    Completed,
    Failed,
}

/// `(unit_id, state)` emitted to the caller's progress callback, always
/// from the thread driving [`WorkerPool::run`], never from a worker task.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub unit_id: String,
    pub state: UnitState,
}

/// Shared flag an orchestrator can flip to request cancellation.
/// Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub workers: usize,
    pub timeout: Duration,
    pub worker_binary: PathBuf,
    pub cache_dir: PathBuf,
    pub software_version: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            timeout: Duration::from_secs(5 * 60),
            worker_binary: default_worker_binary_path(),
            cache_dir: PathBuf::from(".air/cache"),
            software_version: air_types::SOFTWARE_VERSION.to_string(),
        }
    }
}

/// Looks for an `air-worker` binary next to the current executable, the
/// convention used by multi-binary toolchains that spawn a sibling helper
/// rather than re-exec themselves.
pub fn default_worker_binary_path() -> PathBuf {
    let name = if cfg!(windows) { "air-worker.exe" } else { "air-worker" };
    match std::env::current_exe() {
        Ok(exe) => exe.with_file_name(name),
        Err(_) => PathBuf::from(name),
    }
}

pub struct WorkerPool {
    config: WorkerPoolConfig,
    registry: Arc<AnalyzerRegistry>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            registry: Arc::new(AnalyzerRegistry::with_builtins()),
        }
    }

    /// Runs every unit, calling `on_progress` from this task only. Returns
    /// one `(WorkUnit, AnalyzerResult)` per unit that reached a terminal
    /// state before cancellation; units never started after a cancel are
    /// dropped silently: cancellation stops submitting new units.
    pub async fn run(
        &self,
        units: Vec<WorkUnit>,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> Vec<(WorkUnit, AnalyzerResult)> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.workers.max(1)));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
        let mut join_set = JoinSet::new();
        let mut results = Vec::with_capacity(units.len());

        for unit in units {
            if cancel.is_cancelled() {
                break;
            }
            let permit = semaphore.clone();
            let tx = tx.clone();
            let config = self.config.clone();
            let registry = self.registry.clone();
            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore not closed");
                let _ = tx.send(ProgressEvent {
                    unit_id: unit.id.clone(),
                    state: UnitState::Started,
                });
                let result = run_unit(&config, &registry, &unit).await;
                let state = if result.is_error() { UnitState::Failed } else { UnitState::Completed };
                let _ = tx.send(ProgressEvent {
                    unit_id: unit.id.clone(),
                    state,
                });
                (unit, result)
            });
        }
        drop(tx);

        loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => {
                    on_progress(event);
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok(pair)) => results.push(pair),
                        Some(Err(_join_error)) => {
                            // Task panicked or was aborted; nothing to record.
                        }
                        None => break,
                    }
                }
            }
            if cancel.is_cancelled() {
                join_set.abort_all();
            }
        }

        while let Some(event) = rx.recv().await {
            on_progress(event);
        }

        results
    }
}

async fn run_unit(config: &WorkerPoolConfig, registry: &AnalyzerRegistry, unit: &WorkUnit) -> AnalyzerResult {
    let request = WorkerRequest {
        analyzer_name: unit.analyzer_name.clone(),
        repo_path: unit.repo_path.clone(),
        include_external: unit.include_external,
        cache_dir: config.cache_dir.clone(),
        software_version: config.software_version.clone(),
    };

    let mut command = Command::new(&config.worker_binary);
    command
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(
                analyzer = %unit.analyzer_name,
                error = %err,
                "worker pool spawn failed, falling back to in-process execution"
            );
            return run_in_process(config, registry, unit);
        }
    };

    let request_bytes = match serde_json::to_vec(&request) {
        Ok(bytes) => bytes,
        Err(err) => return AnalyzerResult::failed(unit.analyzer_name.clone(), err.to_string()),
    };
    if let Some(mut stdin) = child.stdin.take() {
        if stdin.write_all(&request_bytes).await.is_err() {
            return AnalyzerResult::failed(unit.analyzer_name.clone(), "failed to write worker request".to_string());
        }
    }

    let mut stdout = child.stdout.take();
    let read_fut = async move {
        let mut buf = Vec::new();
        if let Some(stdout) = stdout.as_mut() {
            let _ = stdout.read_to_end(&mut buf).await;
        }
        buf
    };

    match tokio::time::timeout(config.timeout, async { tokio::join!(child.wait(), read_fut) }).await {
        Ok((_status, stdout_bytes)) => parse_response(&unit.analyzer_name, &stdout_bytes),
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            tracing::warn!(analyzer = %unit.analyzer_name, repo = %unit.repo_path.display(), "worker timed out");
            let mut result = AnalyzerResult::failed(unit.analyzer_name.clone(), "timeout".to_string());
            result.metadata.insert("error_message".to_string(), "timeout".to_string());
            result
        }
    }
}

fn parse_response(analyzer_name: &str, bytes: &[u8]) -> AnalyzerResult {
    let response: WorkerResponse = match serde_json::from_slice(bytes) {
        Ok(response) => response,
        Err(err) => return AnalyzerResult::failed(analyzer_name.to_string(), format!("malformed worker response: {err}")),
    };
    match response.status {
        WorkerStatus::Ok => response
            .result
            .unwrap_or_else(|| AnalyzerResult::failed(analyzer_name.to_string(), "worker reported ok with no result".to_string())),
        WorkerStatus::Error => {
            AnalyzerResult::failed(analyzer_name.to_string(), response.error.unwrap_or_else(|| "unknown worker error".to_string()))
        }
    }
}

/// Degraded-mode sequential fallback when the worker binary cannot be
/// spawned at all: runs the analyzer in-process instead.
fn run_in_process(config: &WorkerPoolConfig, registry: &AnalyzerRegistry, unit: &WorkUnit) -> AnalyzerResult {
    let Some(analyzer) = registry.get(&unit.analyzer_name) else {
        return AnalyzerResult::failed(unit.analyzer_name.clone(), format!("unknown analyzer: {}", unit.analyzer_name));
    };
    let filter = PathFilter::new();
    let cache = Cache::new(config.cache_dir.clone(), config.software_version.clone());
    air_analyzers::run_contained(analyzer, &unit.repo_path, unit.include_external, &filter, Some(&cache))
}

/// Exposed for callers that want to run one unit without the pool's
/// concurrency machinery, e.g. the orchestrator's own degraded-mode path
/// when the pool cannot be constructed at all.
pub fn run_in_process_direct(repo_path: &Path, analyzer_name: &str, include_external: bool, cache: Option<&Cache>) -> AnalyzerResult {
    let registry = AnalyzerRegistry::with_builtins();
    let Some(analyzer) = registry.get(analyzer_name) else {
        return AnalyzerResult::failed(analyzer_name.to_string(), format!("unknown analyzer: {analyzer_name}"));
    };
    let filter = PathFilter::new();
    air_analyzers::run_contained(analyzer, repo_path, include_external, &filter, cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_worker_binary_falls_back_in_process() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.py"), "password = \"hunter2\"\n").unwrap();

        let config = WorkerPoolConfig {
            workers: 2,
            timeout: Duration::from_secs(5),
            worker_binary: PathBuf::from("/nonexistent/air-worker-binary-for-tests"),
            cache_dir: dir.path().join("cache"),
            software_version: "1.0.0".to_string(),
        };
        let pool = WorkerPool::new(config);
        let unit = WorkUnit::new("security", dir.path().to_path_buf(), false);
        let cancel = CancelToken::new();
        let mut events = Vec::new();
        let results = pool.run(vec![unit], &cancel, |event| events.push(event.state)).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].1.is_error());
        assert!(results[0].1.findings.iter().any(|f| f.title == "Hardcoded secret"));
        assert!(events.contains(&UnitState::Started));
        assert!(events.contains(&UnitState::Completed));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_before_submission_stops_remaining_units() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerPoolConfig {
            workers: 1,
            timeout: Duration::from_secs(5),
            worker_binary: PathBuf::from("/nonexistent/air-worker-binary-for-tests"),
            cache_dir: dir.path().join("cache"),
            software_version: "1.0.0".to_string(),
        };
        let pool = WorkerPool::new(config);
        let cancel = CancelToken::new();
        cancel.cancel();
        let units = vec![WorkUnit::new("security", dir.path().to_path_buf(), false)];
        let results = pool.run(units, &cancel, |_| {}).await;
        assert!(results.is_empty());
    }
}
