use crate::resource::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version written by this engine. Bumped when the on-disk
/// shape of `WorkspaceConfig` changes in a way `upgrade()` must handle.
pub const CONFIG_VERSION: &str = "2.0.0";

/// Versioned record persisted at `.air/air-config.json`.
///
/// `deny_unknown_fields` guarantees a config round-trip: unknown fields
/// are rejected rather than silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub version: String,
    pub name: String,
    pub mode: Mode,
    pub created: DateTime<Utc>,
    pub resources: ResourceLists,
    #[serde(default)]
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ResourceLists {
    #[serde(default)]
    pub review: Vec<Resource>,
    #[serde(default)]
    pub develop: Vec<Resource>,
}

impl ResourceLists {
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.review.iter().chain(self.develop.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.review.iter_mut().chain(self.develop.iter_mut())
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn push(&mut self, resource: Resource) {
        use crate::resource::Relationship;
        match resource.relationship {
            Relationship::ReviewOnly => self.review.push(resource),
            Relationship::Contributor => self.develop.push(resource),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Resource> {
        if let Some(pos) = self.review.iter().position(|r| r.name == name) {
            return Some(self.review.remove(pos));
        }
        if let Some(pos) = self.develop.iter().position(|r| r.name == name) {
            return Some(self.develop.remove(pos));
        }
        None
    }

    pub fn len(&self) -> usize {
        self.review.len() + self.develop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Review,
    Develop,
    Mixed,
}

impl WorkspaceConfig {
    pub fn new(name: impl Into<String>, mode: Mode, created: DateTime<Utc>) -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            name: name.into(),
            mode,
            created,
            resources: ResourceLists::default(),
            goals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Relationship, Resource};

    #[test]
    fn round_trip_preserves_equality() {
        let mut cfg = WorkspaceConfig::new("my-review", Mode::Mixed, Utc::now());
        cfg.resources
            .push(Resource::new("svc-a", "/tmp/svc-a", Relationship::ReviewOnly));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: WorkspaceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{
            "version": "2.0.0", "name": "x", "mode": "mixed",
            "created": "2025-10-03T10:00:00Z",
            "resources": {"review": [], "develop": []},
            "goals": [], "unknown_field": true
        }"#;
        let parsed: Result<WorkspaceConfig, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }
}
