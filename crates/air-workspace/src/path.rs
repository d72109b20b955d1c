//! `GIT_REPOS_PATH` storage rules.

use std::path::{Path, PathBuf};

/// Reads `GIT_REPOS_PATH`, if set, as an absolute root.
pub fn repos_root() -> Option<PathBuf> {
    std::env::var_os("GIT_REPOS_PATH").map(PathBuf::from)
}

fn expand_tilde(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix('~') {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest)
    } else {
        PathBuf::from(input)
    }
}

/// Decides the stored-path form for a `link_add` input:
/// - Absolute input is stored as given.
/// - `~`-prefixed input is expanded; if the expansion falls under
///   `GIT_REPOS_PATH`, stored relative to it; else stored absolute.
/// - Other relative input is resolved against `GIT_REPOS_PATH` (else the
///   current directory) for existence checks, but stored in the relative
///   form the caller gave when it falls under the root.
pub fn store_path(input: &str, cwd: &Path) -> String {
    if input.starts_with('/') {
        return input.to_string();
    }
    if input.starts_with('~') {
        let expanded = expand_tilde(input);
        if let Some(root) = repos_root() {
            if let Ok(relative) = expanded.strip_prefix(&root) {
                return relative.to_string_lossy().into_owned();
            }
        }
        return expanded.to_string_lossy().into_owned();
    }
    input.to_string()
}

/// Resolves a stored path (as `store_path` would have recorded it) to an
/// absolute filesystem location, for symlink targets and existence checks.
pub fn resolve(stored: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(stored);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match repos_root() {
        Some(root) => root.join(path),
        None => cwd.join(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_input_is_stored_verbatim() {
        assert_eq!(store_path("/srv/repos/svc-a", Path::new("/cwd")), "/srv/repos/svc-a");
    }

    #[test]
    fn relative_input_is_preserved() {
        assert_eq!(store_path("../svc-a", Path::new("/cwd")), "../svc-a");
    }

    #[test]
    fn resolve_joins_relative_against_cwd_without_root() {
        if std::env::var_os("GIT_REPOS_PATH").is_none() {
            assert_eq!(resolve("svc-a", Path::new("/cwd")), Path::new("/cwd/svc-a"));
        }
    }
}
