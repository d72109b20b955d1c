//! Detector Registry.
//!
//! A [`Detector`] is a strategy that extracts package/import dependencies
//! from a repo. Four built-in package detectors read manifests; three
//! import detectors scan source files; one API detector is a registered
//! stub. The registry accumulates results from every detector whose
//! `can_detect` returns true and never lets one detector's failure stop
//! the others.

pub mod api;
pub mod imports;
pub mod packages;

use air_errors::AirResult;
use air_types::{DependencyResult, DependencyType};
use std::path::Path;

/// Strategy producing dependency names for one repo.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap manifest-existence (or characteristic-file) check; the
    /// registry only calls `detect` for detectors that answer true here.
    fn can_detect(&self, repo_path: &Path) -> bool;

    /// Must never mutate the repo.
    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult>;

    fn dependency_type(&self) -> DependencyType;
}

/// Process-wide registry of detectors, seeded once with the built-in set.
/// Registration order is preserved and is the order detectors run in.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        Self { detectors: Vec::new() }
    }

    /// The four manifest detectors, three import detectors, and the one
    /// API stub, registered in run order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(packages::RequirementsTxtDetector));
        registry.register(Box::new(packages::PyprojectTomlDetector));
        registry.register(Box::new(packages::PackageJsonDetector));
        registry.register(Box::new(packages::GoModDetector));
        registry.register(Box::new(imports::PythonImportDetector));
        registry.register(Box::new(imports::JsTsImportDetector));
        registry.register(Box::new(imports::GoImportDetector));
        registry.register(Box::new(api::ApiDetectorStub));
        registry
    }

    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    /// Runs every detector whose `can_detect` matches, logging and
    /// skipping any that raise; other detectors continue.
    pub fn detect_all(&self, repo_path: &Path) -> Vec<DependencyResult> {
        let mut results = Vec::new();
        for detector in &self.detectors {
            if !detector.can_detect(repo_path) {
                continue;
            }
            match detector.detect(repo_path) {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::warn!(detector = detector.name(), error = %err, "detector failed, skipping");
                }
            }
        }
        results
    }

    pub fn detect_by_type(&self, repo_path: &Path, dependency_type: DependencyType) -> Vec<DependencyResult> {
        self.detect_all(repo_path)
            .into_iter()
            .filter(|r| r.dependency_type == dependency_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_eight_detectors_in_order() {
        let registry = DetectorRegistry::with_builtins();
        let names: Vec<_> = registry.detectors.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "requirements.txt",
                "pyproject.toml",
                "package.json",
                "go.mod",
                "python-imports",
                "js-ts-imports",
                "go-imports",
                "api-stub",
            ]
        );
    }

    #[test]
    fn detect_all_skips_nothing_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DetectorRegistry::with_builtins();
        assert!(registry.detect_all(dir.path()).is_empty());
    }
}
