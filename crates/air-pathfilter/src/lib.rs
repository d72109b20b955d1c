//! Path Filter.
//!
//! Decides whether a path, relative to a repository root, belongs to
//! first-party code or should be skipped as vendored/ephemeral. Every
//! analyzer must route file iteration through this filter; a direct glob
//! without filtering is a defect.

use std::collections::HashSet;
use std::path::Path;

/// Exact path-segment match, case-sensitive. Matching by segment rather
/// than prefix means a shallow `build/` directory is excluded without
/// false-positive matches on files whose names merely contain "build".
const DEFAULT_EXCLUDED_SEGMENTS: &[&str] = &[
    ".venv",
    "venv",
    "env",
    "site-packages",
    "__pycache__",
    ".tox",
    ".nox",
    ".egg-info",
    ".poetry",
    "node_modules",
    "bower_components",
    ".npm",
    "vendor",
    "pkg",
    ".bundle",
    ".git",
    "build",
    "dist",
    "target",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
];

/// Strategy gating file selection for every analyzer and detector.
#[derive(Debug, Clone)]
pub struct PathFilter {
    excluded_segments: HashSet<&'static str>,
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathFilter {
    pub fn new() -> Self {
        Self {
            excluded_segments: DEFAULT_EXCLUDED_SEGMENTS.iter().copied().collect(),
        }
    }

    /// Returns true iff `relative_path` should be skipped.
    ///
    /// `include_external = true` always returns false (spec contract).
    /// Otherwise returns true iff any path segment exactly matches the
    /// exclusion set.
    pub fn should_exclude(&self, relative_path: &Path, include_external: bool) -> bool {
        if include_external {
            return false;
        }
        relative_path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|segment| self.excluded_segments.contains(segment))
    }

    /// Walks `repo_root` and yields first-party files, applying this
    /// filter to every path as it is encountered so analyzers never need
    /// to reimplement directory pruning.
    pub fn walk_first_party<'a>(
        &'a self,
        repo_root: &'a Path,
        include_external: bool,
    ) -> impl Iterator<Item = walkdir::DirEntry> + 'a {
        walkdir::WalkDir::new(repo_root)
            .into_iter()
            .filter_entry(move |entry| {
                let Ok(relative) = entry.path().strip_prefix(repo_root) else {
                    return true;
                };
                if relative.as_os_str().is_empty() {
                    return true;
                }
                !self.should_exclude(relative, include_external)
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn include_external_always_false() {
        let filter = PathFilter::new();
        let p = PathBuf::from("node_modules/left-pad/index.js");
        assert!(!filter.should_exclude(&p, true));
    }

    #[test]
    fn excludes_by_exact_segment() {
        let filter = PathFilter::new();
        assert!(filter.should_exclude(&PathBuf::from("node_modules/left-pad/index.js"), false));
        assert!(filter.should_exclude(&PathBuf::from("src/build/out.rs"), false));
        assert!(filter.should_exclude(&PathBuf::from(".venv/lib/site-packages/x.py"), false));
    }

    #[test]
    fn does_not_false_positive_on_substring_matches() {
        let filter = PathFilter::new();
        // "rebuild_system.py" contains "build" as a substring but not as a
        // whole path segment, so it must not be excluded.
        assert!(!filter.should_exclude(&PathBuf::from("src/rebuild_system.py"), false));
        assert!(!filter.should_exclude(&PathBuf::from("src/vendored_notice.md"), false));
    }

    #[test]
    fn no_match_is_never_excluded() {
        let filter = PathFilter::new();
        assert!(!filter.should_exclude(&PathBuf::from("src/main.py"), false));
    }

    #[test]
    fn walk_first_party_prunes_vendored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.py"), "x").unwrap();

        let filter = PathFilter::new();
        let found: Vec<_> = filter
            .walk_first_party(dir.path(), false)
            .map(|e| e.path().to_path_buf())
            .collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("src/main.py"));
    }
}
