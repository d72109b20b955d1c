//! Child-process half of the Worker Pool's IPC contract.
//!
//! Reads one [`air_worker_pool::WorkerRequest`] JSON document from stdin,
//! runs the named analyzer, and writes one [`air_worker_pool::WorkerResponse`]
//! JSON document to stdout. Diagnostics go to stderr only — stdout is
//! reserved for the single response document.

use air_analyzers::AnalyzerRegistry;
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_worker_pool::{WorkerRequest, WorkerResponse, WorkerStatus};
use std::io::{Read, Write};
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let response = run();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(err) = serde_json::to_writer(&mut handle, &response) {
        tracing::error!(error = %err, "failed to write worker response");
        std::process::exit(2);
    }
    let _ = handle.flush();
}

fn run() -> WorkerResponse {
    let started = Instant::now();

    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        return error_response("unknown", started, format!("failed to read request: {err}"));
    }

    let request: WorkerRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(err) => return error_response("unknown", started, format!("malformed request: {err}")),
    };

    tracing::info!(
        analyzer = %request.analyzer_name,
        repo = %request.repo_path.display(),
        "worker starting analysis"
    );

    let registry = AnalyzerRegistry::with_builtins();
    let Some(analyzer) = registry.get(&request.analyzer_name) else {
        return error_response(
            &request.analyzer_name,
            started,
            format!("unknown analyzer: {}", request.analyzer_name),
        );
    };

    let filter = PathFilter::new();
    let cache = Cache::new(request.cache_dir.clone(), request.software_version.clone());
    let result = air_analyzers::run_contained(
        analyzer,
        &request.repo_path,
        request.include_external,
        &filter,
        Some(&cache),
    );

    let duration_ms = started.elapsed().as_millis() as u64;
    if result.is_error() {
        let message = result
            .metadata
            .get("error_message")
            .cloned()
            .unwrap_or_else(|| "analyzer failed".to_string());
        tracing::warn!(analyzer = %request.analyzer_name, error = %message, "analyzer reported failure");
        WorkerResponse {
            status: WorkerStatus::Error,
            result: None,
            duration_ms,
            error: Some(message),
        }
    } else {
        WorkerResponse {
            status: WorkerStatus::Ok,
            result: Some(result),
            duration_ms,
            error: None,
        }
    }
}

fn error_response(analyzer_name: &str, started: Instant, message: String) -> WorkerResponse {
    tracing::error!(analyzer = %analyzer_name, error = %message, "worker failed before running analyzer");
    WorkerResponse {
        status: WorkerStatus::Error,
        result: None,
        duration_ms: started.elapsed().as_millis() as u64,
        error: Some(message),
    }
}
