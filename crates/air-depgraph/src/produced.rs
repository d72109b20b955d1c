//! Extracts the package name (and, where available, version) each repo's
//! own manifest says it produces.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produced {
    pub name: String,
    pub version: Option<String>,
    pub manifest_path: Option<String>,
}

pub fn produced_package(repo_path: &Path, fallback_name: &str) -> Produced {
    from_pyproject(repo_path)
        .or_else(|| from_package_json(repo_path))
        .or_else(|| from_go_mod(repo_path))
        .unwrap_or_else(|| Produced {
            name: fallback_name.to_lowercase(),
            version: None,
            manifest_path: None,
        })
}

fn from_pyproject(repo_path: &Path) -> Option<Produced> {
    let content = std::fs::read_to_string(repo_path.join("pyproject.toml")).ok()?;
    let value: toml::Value = content.parse().ok()?;

    if let Some(project) = value.get("project") {
        let name = project.get("name").and_then(|v| v.as_str())?;
        let version = project.get("version").and_then(|v| v.as_str()).map(str::to_string);
        return Some(Produced {
            name: name.to_lowercase(),
            version,
            manifest_path: Some("pyproject.toml".to_string()),
        });
    }
    if let Some(poetry) = value.get("tool").and_then(|t| t.get("poetry")) {
        let name = poetry.get("name").and_then(|v| v.as_str())?;
        let version = poetry.get("version").and_then(|v| v.as_str()).map(str::to_string);
        return Some(Produced {
            name: name.to_lowercase(),
            version,
            manifest_path: Some("pyproject.toml".to_string()),
        });
    }
    None
}

fn from_package_json(repo_path: &Path) -> Option<Produced> {
    let content = std::fs::read_to_string(repo_path.join("package.json")).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    let name = value.get("name").and_then(|v| v.as_str())?;
    let version = value.get("version").and_then(|v| v.as_str()).map(str::to_string);
    Some(Produced {
        name: name.to_lowercase(),
        version,
        manifest_path: Some("package.json".to_string()),
    })
}

fn from_go_mod(repo_path: &Path) -> Option<Produced> {
    let content = std::fs::read_to_string(repo_path.join("go.mod")).ok()?;
    let module_line = content.lines().find(|l| l.trim_start().starts_with("module "))?;
    let name = module_line.trim_start().strip_prefix("module ")?.trim();
    Some(Produced {
        name: name.to_lowercase(),
        // go.mod does not declare its own module's version; consumers pin
        // it via a git tag the detector side has no visibility into.
        version: None,
        manifest_path: Some("go.mod".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pep621_name_and_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"widget-core\"\nversion = \"1.4.0\"\n",
        )
        .unwrap();
        let produced = produced_package(dir.path(), "fallback");
        assert_eq!(produced.name, "widget-core");
        assert_eq!(produced.version.as_deref(), Some("1.4.0"));
    }

    #[test]
    fn reads_package_json_name_and_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name": "Widget-UI", "version": "2.1.0"}"#).unwrap();
        let produced = produced_package(dir.path(), "fallback");
        assert_eq!(produced.name, "widget-ui");
        assert_eq!(produced.version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn falls_back_to_repo_name_when_no_manifest_present() {
        let dir = tempfile::tempdir().unwrap();
        let produced = produced_package(dir.path(), "MyRepo");
        assert_eq!(produced.name, "myrepo");
        assert!(produced.version.is_none());
    }
}
