//! Cross-platform symlink creation for `repos/<name> -> <resolved path>`.

use std::path::Path;

#[cfg(unix)]
pub fn create(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub fn create(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Whether `link` exists as a symlink (broken or not) without following it.
pub fn exists(link: &Path) -> bool {
    link.symlink_metadata().is_ok()
}

/// Whether `link` is a symlink whose target exists.
pub fn is_valid(link: &Path) -> bool {
    link.symlink_metadata().is_ok() && link.exists()
}
