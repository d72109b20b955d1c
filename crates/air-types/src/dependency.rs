use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One detector's output for one repo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyResult {
    pub dependency_type: DependencyType,
    /// External package names, normalized lowercase.
    pub dependencies: BTreeSet<String>,
    pub source_file: String,
    pub metadata: HashMap<String, String>,
}

impl DependencyResult {
    pub fn new(dependency_type: DependencyType, source_file: impl Into<String>) -> Self {
        Self {
            dependency_type,
            dependencies: BTreeSet::new(),
            source_file: source_file.into(),
            metadata: HashMap::new(),
        }
    }

    /// Inserts a package name, normalizing to lowercase.
    pub fn insert(&mut self, name: impl AsRef<str>) {
        self.dependencies.insert(name.as_ref().to_lowercase());
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Package,
    Import,
    Api,
}
