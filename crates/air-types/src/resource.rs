use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One external repository linked into a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    /// Unique, non-empty identifier within a workspace.
    pub name: String,
    /// Filesystem path, possibly in environment-relative stored form.
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub relationship: Relationship,
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_stack: Option<String>,
    #[serde(default)]
    pub clone: bool,
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

impl Resource {
    pub fn new(name: impl Into<String>, path: impl Into<String>, relationship: Relationship) -> Self {
        let writable = matches!(relationship, Relationship::Contributor);
        Self {
            name: name.into(),
            path: path.into(),
            resource_type: ResourceType::Library,
            relationship,
            writable,
            technology_stack: None,
            clone: false,
            outputs: Vec::new(),
            contributions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Library,
    Documentation,
    Service,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Relationship {
    ReviewOnly,
    Contributor,
}

/// Computed, not persisted: the result of cross-referencing config against
/// the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Valid,
    Broken,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: ContributionStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Proposed,
    Draft,
    Submitted,
    Merged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributor_resources_default_to_writable() {
        let r = Resource::new("svc-a", "/tmp/svc-a", Relationship::Contributor);
        assert!(r.writable);
    }

    #[test]
    fn review_only_resources_default_to_read_only() {
        let r = Resource::new("svc-a", "/tmp/svc-a", Relationship::ReviewOnly);
        assert!(!r.writable);
    }

    #[test]
    fn round_trips_through_json() {
        let r = Resource::new("svc-a", "/tmp/svc-a", Relationship::ReviewOnly);
        let json = serde_json::to_string(&r).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
