//! `PerformanceAnalyzer`: seven pattern families.

use crate::{analyze_per_file, Analyzer};
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static N_PLUS_ONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"for\s+\w+\s+in\s+\w+(?:\.all\(\)|\.objects\.all\(\))?:\s*$").unwrap());
static QUERY_IN_LOOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(?:query|execute|get|filter)\(").unwrap());
static STRING_ACCUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\w+\s*\+=\s*(?:f?['\x22])").unwrap());
static LIST_COMPREHENSION_OPPORTUNITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s*=\s*\[\]\s*$").unwrap());
static APPEND_IN_LOOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\w+\.append\(").unwrap());
static WHOLE_TABLE_FETCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.objects\.all\(\)(?!\[)|SELECT\s+\*\s+FROM").unwrap());
static USE_MEMO_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\s+\w+\s*\([^)]*\)\s*\{[^}]*return\s*\(").unwrap());
static MUTATE_THEN_ITERATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*for\s+\w+\s+in\s+\w+:\s*$").unwrap());
static MUTATE_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.append\(|\.push\(").unwrap());
static FOR_LOOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)for\b").unwrap());

pub struct PerformanceAnalyzer {
    max_nesting: u32,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self { max_nesting: 2 }
    }
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        cache: Option<&Cache>,
    ) -> AnalyzerResult {
        let max_nesting = self.max_nesting;
        analyze_per_file("performance", repo_path, include_external, filter, cache, move |path, relative| {
            scan_file(path, relative, max_nesting)
        })
    }
}

fn scan_file(path: &Path, relative: &str, max_nesting: u32) -> Vec<Finding> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let mut findings = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line_no = (i + 1) as u32;

        if N_PLUS_ONE.is_match(line) {
            if lines[i + 1..].iter().take(5).any(|l| QUERY_IN_LOOP.is_match(l)) {
                findings.push(
                    Finding::new(
                        "performance",
                        Severity::Medium,
                        "N+1 query pattern",
                        "A query-like call appears inside a loop body; consider a bulk fetch.",
                        relative,
                    )
                    .with_line(line_no),
                );
            }
        }

        if STRING_ACCUM.is_match(line) {
            findings.push(
                Finding::new(
                    "performance",
                    Severity::Low,
                    "String concatenation accumulation in loop",
                    "Repeated `+=` on a string inside a loop is quadratic; prefer join() or a buffer.",
                    relative,
                )
                .with_line(line_no),
            );
        }

        if let Some(caps) = LIST_COMPREHENSION_OPPORTUNITY.captures(line) {
            let var = &caps[1];
            let appends_var = lines[i + 1..]
                .iter()
                .take(4)
                .filter(|l| APPEND_IN_LOOP.is_match(l))
                .any(|l| l.contains(&format!("{var}.append(")));
            if appends_var {
                findings.push(
                    Finding::new(
                        "performance",
                        Severity::Low,
                        "List-comprehension opportunity",
                        "An empty list built up with repeated `.append()` could be a comprehension.",
                        relative,
                    )
                    .with_line(line_no),
                );
            }
        }

        if WHOLE_TABLE_FETCH.is_match(line) {
            findings.push(
                Finding::new(
                    "performance",
                    Severity::Medium,
                    "Missing pagination on whole-table fetch",
                    "A query fetches an entire table without limit/offset.",
                    relative,
                )
                .with_line(line_no),
            );
        }

        let is_react_file = relative.ends_with(".jsx") || relative.ends_with(".tsx");
        if is_react_file && USE_MEMO_CANDIDATE.is_match(line) {
            findings.push(
                Finding::new(
                    "performance",
                    Severity::Low,
                    "Missing memoization of pure component",
                    "A component that renders purely from its props is not wrapped in `memo`/`useMemo`.",
                    relative,
                )
                .with_line(line_no),
            );
        }

        if MUTATE_THEN_ITERATE.is_match(line)
            && lines[i + 1..].iter().take(3).any(|l| MUTATE_CALL.is_match(l))
        {
            findings.push(
                Finding::new(
                    "performance",
                    Severity::Low,
                    "Iterate+mutate convertible to map/transform",
                    "A loop that only appends a transformed element could be a map()/list comprehension.",
                    relative,
                )
                .with_line(line_no),
            );
        }
    }

    findings.extend(nested_loop_findings(&lines, relative, max_nesting));
    findings
}

/// Flags loops nested deeper than `max_nesting`, tracked via indentation
/// depth of consecutive `for`/`while` headers (a pragmatic heuristic; an
/// AST-based implementation is out of scope for a line-oriented scanner).
fn nested_loop_findings(lines: &[&str], relative: &str, max_nesting: u32) -> Vec<Finding> {
    let mut stack: Vec<usize> = Vec::new();
    let mut findings = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        while let Some(&top) = stack.last() {
            if indent <= top {
                stack.pop();
            } else {
                break;
            }
        }
        if FOR_LOOP.is_match(line) || trimmed.starts_with("while ") {
            stack.push(indent);
            if stack.len() as u32 > max_nesting {
                findings.push(
                    Finding::new(
                        "performance",
                        Severity::Medium,
                        "Deeply nested loop",
                        format!("Loop nesting depth {} exceeds the configured threshold of {}.", stack.len(), max_nesting),
                        relative,
                    )
                    .with_line((i + 1) as u32),
                );
            }
        }
    }
    findings
}
