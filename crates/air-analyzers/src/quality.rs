//! `QualityAnalyzer`.

use crate::Analyzer;
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding, Severity, ThresholdsConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static FN_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:pub\s+)?(?:async\s+)?(?:def|fn|function)\s+(\w+)\s*\(([^)]*)\)").unwrap());
static PUBLIC_PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+([A-Za-z][A-Za-z0-9_]*)\s*\(").unwrap());
static COMMENT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(#|//|/\*|\*)").unwrap());
static CODE_EXTENSIONS: &[&str] = &["py", "js", "jsx", "ts", "tsx", "go", "rs", "java", "rb", "php"];
static TEST_MARKERS: &[&str] = &["test_", "_test", ".test.", ".spec."];

pub struct QualityAnalyzer {
    thresholds: ThresholdsConfig,
}

impl QualityAnalyzer {
    pub fn new() -> Self {
        Self {
            thresholds: ThresholdsConfig::default(),
        }
    }

    pub fn with_thresholds(thresholds: ThresholdsConfig) -> Self {
        Self { thresholds }
    }
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for QualityAnalyzer {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        _cache: Option<&Cache>,
    ) -> AnalyzerResult {
        // This analyzer's findings (missing README, test ratio) are
        // repo-scoped, not purely per-file, so it does not thread through
        // the per-file cache helper the other analyzers use.
        let mut findings = Vec::new();
        let mut code_files = 0usize;
        let mut test_files = 0usize;

        for entry in filter.walk_first_party(repo_path, include_external) {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(repo_path) else {
                continue;
            };
            let relative_str = relative.to_string_lossy().to_string();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !CODE_EXTENSIONS.contains(&ext) {
                continue;
            }
            let is_test = TEST_MARKERS.iter().any(|m| relative_str.contains(m));
            if is_test {
                test_files += 1;
            } else {
                code_files += 1;
            }
            findings.extend(scan_file(path, &relative_str, &self.thresholds));
        }

        if !repo_path.join("README.md").exists() && !repo_path.join("README.rst").exists() && !repo_path.join("README").exists() {
            findings.push(Finding::new(
                "quality",
                Severity::Low,
                "Missing top-level README",
                "No README.md/README.rst/README was found at the repository root.",
                ".",
            ));
        }

        if code_files > 0 {
            let ratio = test_files as f64 / code_files as f64;
            if ratio < self.thresholds.min_test_to_code_ratio {
                findings.push(
                    Finding::new(
                        "quality",
                        Severity::Medium,
                        "Low test coverage heuristic",
                        format!(
                            "Test-to-code file ratio is {ratio:.2}, below the configured minimum of {:.2}.",
                            self.thresholds.min_test_to_code_ratio
                        ),
                        ".",
                    )
                    .with_metadata("test_files", test_files.to_string())
                    .with_metadata("code_files", code_files.to_string()),
                );
            }
        }

        AnalyzerResult::new("quality", findings)
    }
}

fn scan_file(path: &Path, relative: &str, thresholds: &ThresholdsConfig) -> Vec<Finding> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let mut findings = Vec::new();

    let mut comment_lines = 0usize;
    for line in &lines {
        if COMMENT_LINE.is_match(line) {
            comment_lines += 1;
        }
    }
    let code_line_count = lines.len().saturating_sub(comment_lines).max(1);
    let ratio = comment_lines as f64 / code_line_count as f64;
    if lines.len() > 40 && (ratio < 0.02 || ratio > 0.8) {
        findings.push(Finding::new(
            "quality",
            Severity::Info,
            "Comment-to-code ratio anomaly",
            format!("Comment ratio {ratio:.2} is unusually low or high for a {}-line file.", lines.len()),
            relative,
        ));
    }

    let mut fn_start: Option<(usize, String, usize)> = None; // (line_idx, name, indent)
    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = FN_DEF.captures(line) {
            if let Some((start_idx, name, _indent)) = fn_start.take() {
                close_function(&mut findings, relative, start_idx, i, &name, thresholds);
            }
            let indent = line.len() - line.trim_start().len();
            let name = caps[1].to_string();
            let params = caps[2].split(',').filter(|p| !p.trim().is_empty()).count();
            if params > thresholds.max_parameters as usize {
                findings.push(
                    Finding::new(
                        "quality",
                        Severity::Low,
                        "Excessive parameter count",
                        format!("`{name}` takes {params} parameters, exceeding the configured maximum of {}.", thresholds.max_parameters),
                        relative,
                    )
                    .with_line((i + 1) as u32),
                );
            }
            if let Some(py_caps) = PUBLIC_PY_DEF.captures(line) {
                let prev_docstring = lines.get(i + 1).map(|l| l.trim_start().starts_with("\"\"\"")).unwrap_or(false);
                if !prev_docstring && !py_caps[1].starts_with('_') {
                    findings.push(
                        Finding::new(
                            "quality",
                            Severity::Info,
                            "Missing docstring on public entry point",
                            format!("`{}` has no docstring on the line following its definition.", &py_caps[1]),
                            relative,
                        )
                        .with_line((i + 1) as u32),
                    );
                }
            }
            fn_start = Some((i, name, indent));
        }
    }
    if let Some((start_idx, name, _)) = fn_start {
        close_function(&mut findings, relative, start_idx, lines.len(), &name, thresholds);
    }

    findings
}

fn close_function(
    findings: &mut Vec<Finding>,
    relative: &str,
    start_idx: usize,
    end_idx: usize,
    name: &str,
    thresholds: &ThresholdsConfig,
) {
    let length = end_idx.saturating_sub(start_idx);
    if length as u32 > thresholds.long_function_lines {
        findings.push(
            Finding::new(
                "quality",
                Severity::Medium,
                "Long function",
                format!("`{name}` spans {length} lines, exceeding the configured maximum of {}.", thresholds.long_function_lines),
                relative,
            )
            .with_line((start_idx + 1) as u32),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_pathfilter::PathFilter;

    #[test]
    fn flags_excessive_parameter_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.py"), "def f(a, b, c, d, e, f, g):\n    return a\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = QualityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.title == "Excessive parameter count"));
    }

    #[test]
    fn flags_missing_readme() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.py"), "def f():\n    return 1\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = QualityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.title == "Missing top-level README"));
    }

    #[test]
    fn readme_present_suppresses_finding() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# hi").unwrap();
        std::fs::write(dir.path().join("x.py"), "def f():\n    return 1\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = QualityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(!result.findings.iter().any(|f| f.title == "Missing top-level README"));
    }
}
