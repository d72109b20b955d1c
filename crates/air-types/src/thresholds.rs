use serde::{Deserialize, Serialize};

/// Tuning thresholds shared by the quality, performance, and code-structure
/// analyzers. Callers may override by constructing a non-default value;
/// there is no separate on-disk format for these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdsConfig {
    /// `QualityAnalyzer` long-function cutoff, in source lines.
    pub long_function_lines: u32,
    /// `QualityAnalyzer` excessive-parameter-count cutoff.
    pub max_parameters: u32,
    /// `PerformanceAnalyzer` nested-loop depth cutoff.
    pub nested_loop_depth: u32,
    /// `CodeStructureAnalyzer` large-file cutoff, in source lines.
    pub large_file_lines: u32,
    /// `QualityAnalyzer` minimum acceptable ratio of test files to code
    /// files before a low-coverage finding is emitted.
    pub min_test_to_code_ratio: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            long_function_lines: 100,
            max_parameters: 5,
            nested_loop_depth: 2,
            large_file_lines: 500,
            min_test_to_code_ratio: 0.25,
        }
    }
}
