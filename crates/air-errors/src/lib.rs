//! Unified error handling for the air assessment engine.
//!
//! Every component crate (Path Filter, Detector Registry, Analyzer Registry,
//! Classifier, Cache, Worker Pool, Dependency Graph, Orchestrator, Workspace
//! Store, Task Log, Findings Aggregator) returns `AirResult<T>` at its public
//! boundary. Errors inside an analyzer or detector are contained at the
//! component that produced them (they become a failed `AnalyzerResult` /
//! skipped `DependencyResult`, never an `AirError`); `AirError` is reserved
//! for orchestration-level and user-operation failures per the propagation
//! policy below.

/// Result alias used across the workspace.
pub type AirResult<T> = Result<T, AirError>;

/// Unified error taxonomy.
///
/// Variants map directly onto the error kinds named in the engine's error
/// handling design: config/path/validation/git errors surface to the CLI
/// caller with a hint; analyzer/worker/cache/timeout errors are always
/// contained by the component that produced them and only reach this type
/// when the containment itself fails (e.g. the findings file cannot be
/// written after an analyzer error was already recorded).
#[derive(thiserror::Error, Debug)]
pub enum AirError {
    /// Config missing, malformed, or schema-violating.
    #[error("config error: {0}")]
    Config(String),

    /// Referenced filesystem entity missing or not a directory.
    #[error("path error: {0}")]
    Path(String),

    /// Structural invariant violated (unique-name, dangling symlink, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(String),

    /// An analyzer raised while scanning; contained into a failed
    /// `AnalyzerResult` by the orchestrator, but may still bubble up when
    /// the analyzer registry itself cannot be consulted (e.g. unknown name).
    #[error("analyzer error: {0}")]
    Analyzer(String),

    /// Worker subprocess spawn or IPC parse failed.
    #[error("worker error: {0}")]
    Worker(String),

    /// Cache read/write failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// Per-unit analysis timeout.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem walk failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl AirError {
    /// Whether this error should abort the current run (fatal, §7) or has
    /// already been contained by the component that raised it and is only
    /// being carried for logging purposes.
    ///
    /// Fatal: cannot write findings/config/archive output, cannot read
    /// config, cannot construct the worker pool at all. Everything else
    /// (a single analyzer/detector/worker/cache failure) is contained by
    /// construction before it ever becomes an `AirError`, so by the time one
    /// of those variants exists here it is being surfaced for an end-of-run
    /// summary, not to abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AirError::Config(_) | AirError::Path(_) | AirError::Validation(_) | AirError::Io(_)
        )
    }

    /// A short, actionable hint shown alongside the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AirError::Validation(_) => Some("Hint: run validate --fix"),
            AirError::Path(_) => Some("Hint: check the resource path and re-run link-add"),
            AirError::Config(_) => Some("Hint: inspect .air/air-config.json for schema drift"),
            AirError::Worker(_) => Some("Hint: worker pool will fall back to sequential execution"),
            _ => None,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AirError::Config(msg.into())
    }

    pub fn path(msg: impl Into<String>) -> Self {
        AirError::Path(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AirError::Validation(msg.into())
    }

    pub fn analyzer(msg: impl Into<String>) -> Self {
        AirError::Analyzer(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        AirError::Worker(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        AirError::Cache(msg.into())
    }
}

/// Exit codes for orchestrator-level commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    UserError = 1,
    SystemError = 2,
    ValidationFailure = 3,
}

impl From<&AirError> for ExitCode {
    fn from(err: &AirError) -> Self {
        match err {
            AirError::Validation(_) => ExitCode::ValidationFailure,
            AirError::Config(_) | AirError::Path(_) | AirError::Git(_) => ExitCode::UserError,
            _ => ExitCode::SystemError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_fatal_and_carry_a_hint() {
        let err = AirError::validation("dangling symlink");
        assert!(err.is_fatal());
        assert_eq!(err.hint(), Some("Hint: run validate --fix"));
        assert_eq!(ExitCode::from(&err), ExitCode::ValidationFailure);
    }

    #[test]
    fn contained_errors_are_not_fatal() {
        let err = AirError::worker("spawn failed");
        assert!(!err.is_fatal());
        assert_eq!(ExitCode::from(&err), ExitCode::SystemError);
    }
}
