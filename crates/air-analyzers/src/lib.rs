//! Analyzer Registry.
//!
//! An [`Analyzer`] enumerates files through the Path Filter (directly
//! globbing without filtering is a defect) and produces zero or more
//! [`air_types::Finding`]s per file. This crate ships five built-in
//! analyzers; the registry dispatches by name so the Worker Pool's JSON
//! request (`{ analyzer_name, ... }`) can select one without the caller
//! needing the concrete type.

pub mod architecture;
pub mod code_structure;
pub mod performance;
pub mod quality;
pub mod security;

use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding};
use std::path::Path;

/// Strategy producing Findings for one repo.
///
/// `analyze` must never glob files directly; it receives a [`PathFilter`]
/// and is expected to route all file iteration through it.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the analyzer. `cache`, when present, is consulted per file so
    /// unchanged files are not re-scanned; analyzers that find
    /// it simpler to scan repo-wide (e.g. `ArchitectureAnalyzer`'s
    /// whole-graph cycle check) may ignore it for those findings.
    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        cache: Option<&Cache>,
    ) -> AnalyzerResult;
}

/// Process-wide registry of analyzers, seeded once with the built-in set.
/// Dispatches by analyzer name.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AnalyzerRegistry {
    pub fn empty() -> Self {
        Self { analyzers: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(security::SecurityAnalyzer::new()));
        registry.register(Box::new(performance::PerformanceAnalyzer::new()));
        registry.register(Box::new(quality::QualityAnalyzer::new()));
        registry.register(Box::new(architecture::ArchitectureAnalyzer::new()));
        registry.register(Box::new(code_structure::CodeStructureAnalyzer::new()));
        registry
    }

    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Analyzer> {
        self.analyzers.iter().find(|a| a.name() == name).map(|a| a.as_ref())
    }

    /// Runs every registered analyzer, catching any panic so one
    /// analyzer's failure never aborts the others. A raising analyzer
    /// yields a result with `metadata.error = true`.
    pub fn run_all(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        cache: Option<&Cache>,
    ) -> Vec<AnalyzerResult> {
        self.analyzers
            .iter()
            .map(|analyzer| run_contained(analyzer.as_ref(), repo_path, include_external, filter, cache))
            .collect()
    }
}

/// Runs one analyzer, converting a panic into a failed `AnalyzerResult`
/// rather than letting it unwind past the registry.
pub fn run_contained(
    analyzer: &dyn Analyzer,
    repo_path: &Path,
    include_external: bool,
    filter: &PathFilter,
    cache: Option<&Cache>,
) -> AnalyzerResult {
    let name = analyzer.name();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        analyzer.analyze(repo_path, include_external, filter, cache)
    }));
    match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            tracing::error!(analyzer = name, error = %message, "analyzer panicked");
            AnalyzerResult::failed(name, message)
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Shared helper: run `analyze_file` over every first-party file,
/// consulting `cache` per file when present, and concatenate findings.
pub(crate) fn analyze_per_file(
    name: &'static str,
    repo_path: &Path,
    include_external: bool,
    filter: &PathFilter,
    cache: Option<&Cache>,
    mut analyze_file: impl FnMut(&Path, &str) -> Vec<Finding>,
) -> AnalyzerResult {
    let mut findings = Vec::new();
    for entry in filter.walk_first_party(repo_path, include_external) {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(repo_path) else {
            continue;
        };
        let relative_str = relative.to_string_lossy().to_string();

        if let Some(cache) = cache {
            if let Ok(air_cache::Lookup::Hit(cached)) = cache.lookup(repo_path, path, name) {
                findings.extend(cached.findings);
                continue;
            }
        }

        let file_findings = analyze_file(path, &relative_str);

        if let Some(cache) = cache {
            let partial = AnalyzerResult::new(name, file_findings.clone());
            let _ = cache.store(repo_path, path, name, partial);
        }

        findings.extend(file_findings);
    }
    AnalyzerResult::new(name, findings)
}
