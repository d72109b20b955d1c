//! `CodeStructureAnalyzer`: file counts, total source lines,
//! large-file flagging, test/docs directory presence, per-language counts.
//! Emits mostly informational findings plus summary metadata.

use crate::Analyzer;
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding, Severity, ThresholdsConfig};
use std::collections::HashMap;
use std::path::Path;

fn language_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "py" => "Python",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "rs" => "Rust",
        "java" => "Java",
        "rb" => "Ruby",
        "php" => "PHP",
        _ => return None,
    })
}

pub struct CodeStructureAnalyzer {
    thresholds: ThresholdsConfig,
}

impl CodeStructureAnalyzer {
    pub fn new() -> Self {
        Self {
            thresholds: ThresholdsConfig::default(),
        }
    }
}

impl Default for CodeStructureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CodeStructureAnalyzer {
    fn name(&self) -> &'static str {
        "code-structure"
    }

    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        _cache: Option<&Cache>,
    ) -> AnalyzerResult {
        let mut findings = Vec::new();
        let mut per_language: HashMap<&'static str, usize> = HashMap::new();
        let mut total_files = 0usize;
        let mut total_lines = 0usize;
        let mut has_tests = false;
        let mut has_docs = false;

        for entry in filter.walk_first_party(repo_path, include_external) {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(repo_path) else {
                continue;
            };
            let relative_str = relative.to_string_lossy();
            if relative_str.contains("test") {
                has_tests = true;
            }
            if relative_str.contains("docs") {
                has_docs = true;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let Some(lang) = language_for_extension(ext) else {
                continue;
            };
            total_files += 1;
            *per_language.entry(lang).or_insert(0) += 1;

            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            let line_count = content.lines().count();
            total_lines += line_count;
            if line_count as u32 > self.thresholds.large_file_lines {
                findings.push(
                    Finding::new(
                        "code-structure",
                        Severity::Info,
                        "Large file",
                        format!(
                            "{} has {} lines, exceeding the configured threshold of {}.",
                            relative_str, line_count, self.thresholds.large_file_lines
                        ),
                        relative_str.to_string(),
                    ),
                );
            }
        }

        let mut summary = AnalyzerResult::new("code-structure", findings);
        summary
            .metadata
            .insert("total_files".to_string(), total_files.to_string());
        summary
            .metadata
            .insert("total_lines".to_string(), total_lines.to_string());
        summary
            .metadata
            .insert("has_tests".to_string(), has_tests.to_string());
        summary
            .metadata
            .insert("has_docs".to_string(), has_docs.to_string());
        for (lang, count) in &per_language {
            summary
                .metadata
                .insert(format!("language:{lang}"), count.to_string());
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_pathfilter::PathFilter;

    #[test]
    fn flags_large_files_and_counts_languages() {
        let dir = tempfile::tempdir().unwrap();
        let big_content: String = (0..600).map(|i| format!("line {i}\n")).collect();
        std::fs::write(dir.path().join("big.py"), big_content).unwrap();
        std::fs::write(dir.path().join("small.go"), "package main\n").unwrap();

        let filter = PathFilter::new();
        let analyzer = CodeStructureAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);

        assert!(result.findings.iter().any(|f| f.title == "Large file"));
        assert_eq!(result.metadata.get("total_files").unwrap(), "2");
        assert_eq!(result.metadata.get("language:Python").unwrap(), "1");
        assert_eq!(result.metadata.get("language:Go").unwrap(), "1");
    }
}
