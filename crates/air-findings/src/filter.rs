//! Standard predicates over collected findings.

use crate::collect::SourcedFinding;
use air_types::Severity;

#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub severity_min: Option<Severity>,
    pub category: Option<String>,
}

impl FindingFilter {
    pub fn matches(&self, item: &SourcedFinding) -> bool {
        if let Some(min) = self.severity_min {
            if item.finding.severity < min {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &item.finding.category != category {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, findings: Vec<SourcedFinding>) -> Vec<SourcedFinding> {
        findings.into_iter().filter(|item| self.matches(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::SourceKind;
    use air_types::Finding;

    fn item(severity: Severity, category: &str) -> SourcedFinding {
        SourcedFinding {
            finding: Finding::new(category, severity, "t", "d", "f.py"),
            source: "svc-a".to_string(),
            source_kind: SourceKind::Repo,
        }
    }

    #[test]
    fn severity_min_excludes_lower_severities() {
        let filter = FindingFilter { severity_min: Some(Severity::High), category: None };
        assert!(filter.matches(&item(Severity::Critical, "x")));
        assert!(filter.matches(&item(Severity::High, "x")));
        assert!(!filter.matches(&item(Severity::Medium, "x")));
    }

    #[test]
    fn category_filter_is_exact_match() {
        let filter = FindingFilter { severity_min: None, category: Some("security".to_string()) };
        assert!(filter.matches(&item(Severity::Low, "security")));
        assert!(!filter.matches(&item(Severity::Low, "quality")));
    }
}
