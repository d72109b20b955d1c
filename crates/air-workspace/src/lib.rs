//! Workspace Store: owns the `WorkspaceConfig`, materializes `repos/<name>`
//! symlinks, and validates/repairs the on-disk structure.

pub mod path;
pub mod symlink;

use air_classifier::Classifier;
use air_errors::{AirError, AirResult};
use air_types::{Mode, Relationship, Resource, ResourceStatus, ResourceType, WorkspaceConfig};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Rooted at a workspace directory (the parent of `.air/` and `repos/`).
pub struct WorkspaceStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub broken: Vec<String>,
    pub missing: Vec<String>,
    pub fixed: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.broken.is_empty() && self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpgradeReport {
    pub orphans_added: Vec<String>,
    pub config_bootstrapped: bool,
    pub legacy_config_migrated: bool,
}

impl WorkspaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(".air/air-config.json")
    }

    fn legacy_config_path(&self) -> PathBuf {
        self.root.join("air-config.json")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    fn link_path(&self, name: &str) -> PathBuf {
        self.repos_dir().join(name)
    }

    /// Creates the directory skeleton and an empty config.
    /// `.air/{tasks,agents,context}` and `repos/` are always
    /// created; `analysis/{reviews,assessments,improvements}` serves
    /// review-mode work and `contributions/` serves develop-mode work, so
    /// mixed mode gets both.
    pub fn init(&self, name: impl Into<String>, mode: Mode) -> AirResult<WorkspaceConfig> {
        for dir in [".air", ".air/tasks", ".air/agents", ".air/context", "repos"] {
            std::fs::create_dir_all(self.root.join(dir))?;
        }
        if matches!(mode, Mode::Review | Mode::Mixed) {
            for dir in ["analysis/reviews", "analysis/assessments", "analysis/improvements"] {
                std::fs::create_dir_all(self.root.join(dir))?;
            }
        }
        if matches!(mode, Mode::Develop | Mode::Mixed) {
            std::fs::create_dir_all(self.root.join("contributions"))?;
        }

        let config = WorkspaceConfig::new(name, mode, Utc::now());
        self.save_config(&config)?;
        Ok(config)
    }

    /// Atomic write: temp file in `.air/`, then rename. No advisory lock is
    /// taken; concurrent mutation is out of scope.
    pub fn save_config(&self, config: &WorkspaceConfig) -> AirResult<()> {
        let path = self.config_path();
        let dir = path.parent().ok_or_else(|| AirError::config("config path has no parent"))?;
        std::fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        let serialized = serde_json::to_vec_pretty(config)?;
        std::fs::write(&tmp_path, &serialized)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load_config(&self) -> AirResult<WorkspaceConfig> {
        let path = self.config_path();
        let bytes = std::fs::read(&path).map_err(|e| AirError::config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| AirError::config(format!("{}: {e}", path.display())))
    }

    /// Registers an external repo under `repos/<name>`.
    #[allow(clippy::too_many_arguments)]
    pub fn link_add(
        &self,
        config: &mut WorkspaceConfig,
        input_path: &str,
        name: &str,
        relationship: Relationship,
        resource_type: Option<ResourceType>,
        writable_override: Option<bool>,
        classify: bool,
    ) -> AirResult<Resource> {
        if config.resources.contains(name) {
            return Err(AirError::validation(format!("resource name already in use: {name}")));
        }

        let cwd = std::env::current_dir()?;
        let stored_path = path::store_path(input_path, &cwd);
        let resolved = path::resolve(&stored_path, &cwd);
        if !resolved.is_dir() {
            return Err(AirError::path(format!("{} is not a directory", resolved.display())));
        }

        let mut resource = Resource::new(name, stored_path, relationship);
        if let Some(writable) = writable_override {
            resource.writable = writable;
        }
        if let Some(resource_type) = resource_type {
            resource.resource_type = resource_type;
        }
        if classify {
            let classification = Classifier::new().classify(&resolved);
            resource.technology_stack = classification.technology_stack;
            resource.resource_type = classification.resource_type;
        }

        std::fs::create_dir_all(self.repos_dir())?;
        let link = self.link_path(name);
        symlink::create(&resolved, &link).map_err(|e| AirError::path(format!("failed to create symlink for {name}: {e}")))?;

        config.resources.push(resource.clone());
        Ok(resource)
    }

    /// Drops a resource from the config, optionally leaving its symlink in place.
    pub fn link_remove(&self, config: &mut WorkspaceConfig, name: &str, keep_link: bool) -> AirResult<()> {
        if config.resources.remove(name).is_none() {
            return Err(AirError::validation(format!("no such resource: {name}")));
        }
        if !keep_link {
            let link = self.link_path(name);
            if symlink::exists(&link) {
                std::fs::remove_file(&link)?;
            }
        }
        Ok(())
    }

    /// Lists every registered resource alongside its symlink status.
    pub fn link_list(&self, config: &WorkspaceConfig) -> Vec<(Resource, ResourceStatus)> {
        config
            .resources
            .iter()
            .map(|r| {
                let link = self.link_path(&r.name);
                let status = if !symlink::exists(&link) {
                    ResourceStatus::Missing
                } else if symlink::is_valid(&link) {
                    ResourceStatus::Valid
                } else {
                    ResourceStatus::Broken
                };
                (r.clone(), status)
            })
            .collect()
    }

    /// Reports broken/missing links, repairing them when `fix` is set.
    pub fn validate(&self, config: &WorkspaceConfig, fix: bool) -> AirResult<ValidationReport> {
        let mut report = ValidationReport::default();
        let cwd = std::env::current_dir()?;

        for (resource, status) in self.link_list(config) {
            match status {
                ResourceStatus::Valid => continue,
                ResourceStatus::Broken => report.broken.push(resource.name.clone()),
                ResourceStatus::Missing => report.missing.push(resource.name.clone()),
            }
            if fix {
                let link = self.link_path(&resource.name);
                if symlink::exists(&link) {
                    std::fs::remove_file(&link)?;
                }
                let resolved = path::resolve(&resource.path, &cwd);
                std::fs::create_dir_all(self.repos_dir())?;
                if symlink::create(&resolved, &link).is_ok() {
                    report.fixed.push(resource.name.clone());
                }
            }
        }
        Ok(report)
    }

    /// Migrates a legacy config to the current layout.
    pub fn upgrade(&self, config: &mut WorkspaceConfig, force: bool) -> AirResult<UpgradeReport> {
        let mut report = UpgradeReport::default();

        if !self.config_path().exists() {
            let legacy = self.legacy_config_path();
            if legacy.exists() {
                std::fs::create_dir_all(self.root.join(".air"))?;
                std::fs::rename(&legacy, self.config_path())?;
                *config = self.load_config()?;
                report.legacy_config_migrated = true;
            } else {
                self.save_config(config)?;
                report.config_bootstrapped = true;
            }
        }

        let repos_dir = self.repos_dir();
        if repos_dir.is_dir() {
            for entry in std::fs::read_dir(&repos_dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if config.resources.contains(&name) {
                    continue;
                }
                if !force {
                    continue;
                }
                let resolved = entry.path();
                let classification = Classifier::new().classify(&resolved);
                let stored_path = resolved.to_string_lossy().into_owned();
                let mut resource = Resource::new(&name, stored_path, Relationship::ReviewOnly);
                resource.technology_stack = classification.technology_stack;
                resource.resource_type = classification.resource_type;
                config.resources.push(resource);
                report.orphans_added.push(name);
            }
        }

        Ok(report)
    }
}

/// Detects whether `root` has a pre-migration config at its top level
/// rather than under `.air/`.
pub fn has_legacy_config(root: &Path) -> bool {
    root.join("air-config.json").is_file() && !root.join(".air/air-config.json").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_types::{Mode, Relationship};

    fn make_resource_dir(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("main.py"), "print(1)\n").unwrap();
        path
    }

    #[test]
    fn init_creates_skeleton_and_empty_config() {
        let workspace = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::new(workspace.path());
        let config = store.init("my-review", Mode::Mixed).unwrap();

        assert!(workspace.path().join(".air/tasks").is_dir());
        assert!(workspace.path().join("repos").is_dir());
        assert!(workspace.path().join("analysis/reviews").is_dir());
        assert!(workspace.path().join("contributions").is_dir());
        assert!(config.resources.is_empty());
        assert!(store.config_path().is_file());
    }

    #[test]
    fn link_add_creates_symlink_and_appends_config() {
        let workspace = tempfile::tempdir().unwrap();
        let target_root = tempfile::tempdir().unwrap();
        let svc_a = make_resource_dir(target_root.path(), "svc-a");

        let store = WorkspaceStore::new(workspace.path());
        let mut config = store.init("my-review", Mode::Review).unwrap();
        let resource = store
            .link_add(&mut config, svc_a.to_str().unwrap(), "svc-a", Relationship::ReviewOnly, None, None, false)
            .unwrap();

        assert!(!resource.writable);
        assert!(store.link_path("svc-a").exists());
        assert_eq!(config.resources.len(), 1);
    }

    #[test]
    fn link_add_rejects_duplicate_names() {
        let workspace = tempfile::tempdir().unwrap();
        let target_root = tempfile::tempdir().unwrap();
        let svc_a = make_resource_dir(target_root.path(), "svc-a");

        let store = WorkspaceStore::new(workspace.path());
        let mut config = store.init("my-review", Mode::Review).unwrap();
        store
            .link_add(&mut config, svc_a.to_str().unwrap(), "svc-a", Relationship::ReviewOnly, None, None, false)
            .unwrap();
        let err = store
            .link_add(&mut config, svc_a.to_str().unwrap(), "svc-a", Relationship::ReviewOnly, None, None, false)
            .unwrap_err();
        assert!(matches!(err, AirError::Validation(_)));
    }

    #[test]
    fn validate_detects_and_fixes_broken_symlink() {
        let workspace = tempfile::tempdir().unwrap();
        let target_root = tempfile::tempdir().unwrap();
        let svc_a = make_resource_dir(target_root.path(), "svc-a");

        let store = WorkspaceStore::new(workspace.path());
        let mut config = store.init("my-review", Mode::Review).unwrap();
        store
            .link_add(&mut config, svc_a.to_str().unwrap(), "svc-a", Relationship::ReviewOnly, None, None, false)
            .unwrap();

        std::fs::remove_file(store.link_path("svc-a")).unwrap();
        let report = store.validate(&config, false).unwrap();
        assert_eq!(report.missing, vec!["svc-a".to_string()]);
        assert!(!report.is_clean());

        let fixed_report = store.validate(&config, true).unwrap();
        assert_eq!(fixed_report.fixed, vec!["svc-a".to_string()]);
        assert!(store.link_path("svc-a").exists());
    }

    #[test]
    fn link_remove_deletes_symlink_unless_keep_link() {
        let workspace = tempfile::tempdir().unwrap();
        let target_root = tempfile::tempdir().unwrap();
        let svc_a = make_resource_dir(target_root.path(), "svc-a");

        let store = WorkspaceStore::new(workspace.path());
        let mut config = store.init("my-review", Mode::Review).unwrap();
        store
            .link_add(&mut config, svc_a.to_str().unwrap(), "svc-a", Relationship::ReviewOnly, None, None, false)
            .unwrap();

        store.link_remove(&mut config, "svc-a", false).unwrap();
        assert!(!store.link_path("svc-a").exists());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn upgrade_migrates_legacy_config_location() {
        let workspace = tempfile::tempdir().unwrap();
        std::fs::write(
            workspace.path().join("air-config.json"),
            serde_json::to_vec(&WorkspaceConfig::new("legacy", Mode::Review, Utc::now())).unwrap(),
        )
        .unwrap();

        let store = WorkspaceStore::new(workspace.path());
        let mut config = WorkspaceConfig::new("placeholder", Mode::Review, Utc::now());
        let report = store.upgrade(&mut config, false).unwrap();

        assert!(report.legacy_config_migrated);
        assert_eq!(config.name, "legacy");
        assert!(store.config_path().is_file());
        assert!(!workspace.path().join("air-config.json").exists());
    }
}
