//! Content-Hash Cache.
//!
//! Memoizes per-file, per-analyzer partial results so unchanged files are
//! not re-scanned. Storage layout:
//! `.air/cache/<repo-hash>/<file-content-hash>-<analyzer-name>.json`.
//! Writes are atomic (write to a `tmp` sibling, then rename); reads never
//! block writes and never observe a partial file because the rename is the
//! publish point.

use air_errors::{AirError, AirResult};
use air_types::AnalyzerResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Persisted per-(file-content-hash, analyzer-name) entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub software_version: String,
    pub partial_result: AnalyzerResult,
}

/// In-memory, per-process counters. Not persisted.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

pub enum Lookup {
    Hit(AnalyzerResult),
    Miss,
}

/// Filesystem-backed content-hash cache rooted at `.air/cache`.
pub struct Cache {
    root: PathBuf,
    software_version: String,
    stats: CacheStats,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>, software_version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            software_version: software_version.into(),
            stats: CacheStats::default(),
        }
    }

    fn repo_hash(repo_path: &Path) -> String {
        hex_sha256(repo_path.to_string_lossy().as_bytes())
    }

    fn partition_dir(&self, repo_path: &Path) -> PathBuf {
        self.root.join(Self::repo_hash(repo_path))
    }

    fn entry_path(&self, repo_path: &Path, file_hash: &str, analyzer_name: &str) -> PathBuf {
        self.partition_dir(repo_path)
            .join(format!("{file_hash}-{analyzer_name}.json"))
    }

    /// Looks up a cached partial result. Returns `Miss` (not an error) if
    /// the file is unreadable, the entry doesn't exist, the entry is
    /// malformed, or the stored `software_version` differs from the
    /// current one.
    pub fn lookup(&self, repo_path: &Path, file_path: &Path, analyzer_name: &str) -> AirResult<Lookup> {
        let bytes = match std::fs::read(file_path) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.stats.record_miss();
                return Ok(Lookup::Miss);
            }
        };
        let file_hash = hex_sha256(&bytes);
        let entry_path = self.entry_path(repo_path, &file_hash, analyzer_name);
        let raw = match std::fs::read(&entry_path) {
            Ok(raw) => raw,
            Err(_) => {
                self.stats.record_miss();
                return Ok(Lookup::Miss);
            }
        };
        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(_) => {
                self.stats.record_miss();
                return Ok(Lookup::Miss);
            }
        };
        if entry.software_version != self.software_version {
            self.stats.record_miss();
            return Ok(Lookup::Miss);
        }
        self.stats.record_hit();
        Ok(Lookup::Hit(entry.partial_result))
    }

    /// Writes atomically: write to a `tmp` file in the same directory,
    /// then rename. Concurrent writers to the same entry race; the last
    /// rename wins and both results are equivalent by construction (spec
    /// §4.E concurrency).
    pub fn store(
        &self,
        repo_path: &Path,
        file_path: &Path,
        analyzer_name: &str,
        partial_result: AnalyzerResult,
    ) -> AirResult<()> {
        let bytes = std::fs::read(file_path).map_err(AirError::from)?;
        let file_hash = hex_sha256(&bytes);
        let dir = self.partition_dir(repo_path);
        std::fs::create_dir_all(&dir)?;
        let entry_path = dir.join(format!("{file_hash}-{analyzer_name}.json"));
        let tmp_path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));

        let entry = CacheEntry {
            software_version: self.software_version.clone(),
            partial_result,
        };
        let serialized = serde_json::to_vec_pretty(&entry)?;
        std::fs::write(&tmp_path, &serialized)?;
        std::fs::rename(&tmp_path, &entry_path)?;
        Ok(())
    }

    /// Deletes the cache partition for one repo.
    pub fn clear_repo(&self, repo_path: &Path) -> AirResult<()> {
        let dir = self.partition_dir(repo_path);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Deletes every partition under the cache root.
    pub fn clear_all(&self) -> AirResult<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Total entries and on-disk bytes currently stored (for `stats()`'s
    /// `total_entries`/`bytes` fields).
    pub fn disk_usage(&self) -> AirResult<(usize, u64)> {
        if !self.root.exists() {
            return Ok((0, 0));
        }
        let mut count = 0usize;
        let mut bytes = 0u64;
        for entry in walkdir_entries(&self.root)? {
            if entry.is_file() {
                count += 1;
                bytes += std::fs::metadata(&entry).map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok((count, bytes))
    }
}

fn walkdir_entries(root: &Path) -> AirResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    Ok(out)
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_types::{Finding, Severity};

    fn sample_result() -> AnalyzerResult {
        AnalyzerResult::new(
            "security",
            vec![Finding::new("security", Severity::High, "t", "d", "a.py")],
        )
    }

    #[test]
    fn miss_then_store_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let file = repo.join("a.py");
        std::fs::write(&file, "password = 'hunter2'\n").unwrap();

        let cache = Cache::new(dir.path().join("cache"), "1.0.0");
        assert!(matches!(cache.lookup(&repo, &file, "security").unwrap(), Lookup::Miss));
        cache.store(&repo, &file, "security", sample_result()).unwrap();
        match cache.lookup(&repo, &file, "security").unwrap() {
            Lookup::Hit(result) => assert_eq!(result.analyzer_name, "security"),
            Lookup::Miss => panic!("expected hit"),
        }
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn content_change_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let file = repo.join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let cache = Cache::new(dir.path().join("cache"), "1.0.0");
        cache.store(&repo, &file, "security", sample_result()).unwrap();
        std::fs::write(&file, "x = 2\n").unwrap();
        assert!(matches!(cache.lookup(&repo, &file, "security").unwrap(), Lookup::Miss));
    }

    #[test]
    fn stale_software_version_is_treated_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let file = repo.join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let old_cache = Cache::new(dir.path().join("cache"), "0.9.0");
        old_cache.store(&repo, &file, "security", sample_result()).unwrap();

        let new_cache = Cache::new(dir.path().join("cache"), "1.0.0");
        assert!(matches!(new_cache.lookup(&repo, &file, "security").unwrap(), Lookup::Miss));
    }

    #[test]
    fn clear_all_removes_every_partition() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let file = repo.join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let cache = Cache::new(dir.path().join("cache"), "1.0.0");
        cache.store(&repo, &file, "security", sample_result()).unwrap();
        let (count_before, _) = cache.disk_usage().unwrap();
        assert_eq!(count_before, 1);
        cache.clear_all().unwrap();
        let (count_after, _) = cache.disk_usage().unwrap();
        assert_eq!(count_after, 0);
    }
}
