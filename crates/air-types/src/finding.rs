use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One observation produced by one analyzer on one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Repo-relative file path.
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Finding {
    pub fn new(
        category: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            severity,
            title: title.into(),
            description: description.into(),
            suggestion: None,
            location: location.into(),
            line_number: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Ordering for within-analyzer sort: severity desc, file asc, line asc.
impl Ord for Finding {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.line_number.cmp(&other.line_number))
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Severity ordering is declared critical-highest so that deriving `Ord`
/// gives severity-descending sort for free when reversed (see `Finding`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// One analyzer's output for one repo.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzerResult {
    pub analyzer_name: String,
    pub findings: Vec<Finding>,
    pub summary: AnalyzerSummary,
    pub metadata: HashMap<String, String>,
}

impl AnalyzerResult {
    pub fn new(analyzer_name: impl Into<String>, mut findings: Vec<Finding>) -> Self {
        findings.sort();
        let summary = AnalyzerSummary::from_findings(&findings);
        Self {
            analyzer_name: analyzer_name.into(),
            findings,
            summary,
            metadata: HashMap::new(),
        }
    }

    /// The degraded `AnalyzerResult` produced when an analyzer raises:
    /// empty findings, `error=true`.
    pub fn failed(analyzer_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), "true".to_string());
        metadata.insert("error_message".to_string(), error_message.into());
        Self {
            analyzer_name: analyzer_name.into(),
            findings: Vec::new(),
            summary: AnalyzerSummary::default(),
            metadata,
        }
    }

    pub fn is_error(&self) -> bool {
        self.metadata.get("error").map(|v| v == "true").unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzerSummary {
    pub by_severity: HashMap<Severity, usize>,
    pub by_category: HashMap<String, usize>,
    pub total: usize,
}

impl AnalyzerSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut by_severity: HashMap<Severity, usize> = HashMap::new();
        let mut by_category: HashMap<String, usize> = HashMap::new();
        for f in findings {
            *by_severity.entry(f.severity).or_insert(0) += 1;
            *by_category.entry(f.category.clone()).or_insert(0) += 1;
        }
        Self {
            by_severity,
            by_category,
            total: findings.len(),
        }
    }
}

// Hashing `HashMap<Severity, usize>` requires `Severity: Hash`, already
// derived above; serde_json serializes enum-keyed maps via `Serialize` on
// the key, which for a unit-variant enum with `rename_all` falls back to
// the variant name — acceptable for this internal summary structure.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_severity_desc_then_file_then_line() {
        let mut findings = vec![
            Finding::new("security", Severity::Medium, "b", "d", "b.py").with_line(5),
            Finding::new("security", Severity::Critical, "a", "d", "a.py").with_line(1),
            Finding::new("security", Severity::Critical, "a", "d", "a.py").with_line(0),
        ];
        findings.sort();
        assert_eq!(findings[0].location, "a.py");
        assert_eq!(findings[0].line_number, Some(0));
        assert_eq!(findings[1].line_number, Some(1));
        assert_eq!(findings[2].severity, Severity::Medium);
    }

    #[test]
    fn failed_result_carries_error_metadata() {
        let r = AnalyzerResult::failed("security", "boom");
        assert!(r.is_error());
        assert!(r.findings.is_empty());
    }
}
