//! Manifest-reading package detectors.

use crate::Detector;
use air_errors::{AirError, AirResult};
use air_types::{DependencyResult, DependencyType};
use regex::Regex;
use std::path::Path;

pub struct RequirementsTxtDetector;

impl Detector for RequirementsTxtDetector {
    fn name(&self) -> &'static str {
        "requirements.txt"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        repo_path.join("requirements.txt").is_file()
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let path = repo_path.join("requirements.txt");
        let content = std::fs::read_to_string(&path)?;
        let mut result = DependencyResult::new(DependencyType::Package, "requirements.txt");
        let cutter = Regex::new(r"^[A-Za-z0-9_.\-]+").expect("static regex compiles");
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() || line.starts_with('-') {
                continue;
            }
            if let Some(m) = cutter.find(line) {
                let name = m.as_str();
                result.insert(name);
                let constraint = line[m.end()..].trim();
                if !constraint.is_empty() {
                    result
                        .metadata
                        .insert(format!("{}@version", name.to_lowercase()), constraint.to_string());
                }
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Package
    }
}

pub struct PyprojectTomlDetector;

impl Detector for PyprojectTomlDetector {
    fn name(&self) -> &'static str {
        "pyproject.toml"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        repo_path.join("pyproject.toml").is_file()
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let path = repo_path.join("pyproject.toml");
        let content = std::fs::read_to_string(&path)?;
        let value: toml::Value = content
            .parse()
            .map_err(|e| AirError::analyzer(format!("pyproject.toml parse error: {e}")))?;
        let mut result = DependencyResult::new(DependencyType::Package, "pyproject.toml");

        // Poetry-style: [tool.poetry.dependencies]
        if let Some(deps) = value
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_table())
        {
            for (name, spec) in deps {
                if name == "python" {
                    continue;
                }
                result.insert(name);
                if let Some(spec_str) = spec.as_str() {
                    result
                        .metadata
                        .insert(format!("{}@version", name.to_lowercase()), spec_str.to_string());
                }
            }
        }

        // PEP 621-style: [project] dependencies = [...]
        if let Some(deps) = value
            .get("project")
            .and_then(|p| p.get("dependencies"))
            .and_then(|d| d.as_array())
        {
            let cutter = Regex::new(r"^[A-Za-z0-9_.\-]+").expect("static regex compiles");
            for dep in deps.iter().filter_map(|v| v.as_str()) {
                if let Some(m) = cutter.find(dep) {
                    let name = m.as_str();
                    result.insert(name);
                    let constraint = dep[m.end()..].trim();
                    if !constraint.is_empty() {
                        result
                            .metadata
                            .insert(format!("{}@version", name.to_lowercase()), constraint.to_string());
                    }
                }
            }
        }

        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Package
    }
}

pub struct PackageJsonDetector;

impl Detector for PackageJsonDetector {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        repo_path.join("package.json").is_file()
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let path = repo_path.join("package.json");
        let content = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let mut result = DependencyResult::new(DependencyType::Package, "package.json");
        for field in ["dependencies", "devDependencies", "peerDependencies"] {
            if let Some(deps) = value.get(field).and_then(|v| v.as_object()) {
                for (name, version) in deps {
                    result.insert(name);
                    if let Some(v) = version.as_str() {
                        result
                            .metadata
                            .insert(format!("{name}@version"), v.to_string());
                    }
                }
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Package
    }
}

pub struct GoModDetector;

impl Detector for GoModDetector {
    fn name(&self) -> &'static str {
        "go.mod"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        repo_path.join("go.mod").is_file()
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let path = repo_path.join("go.mod");
        let content = std::fs::read_to_string(&path)?;
        let mut result = DependencyResult::new(DependencyType::Package, "go.mod");
        let mut in_require_block = false;
        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.starts_with("require (") {
                in_require_block = true;
                continue;
            }
            if in_require_block && line == ")" {
                in_require_block = false;
                continue;
            }
            let stripped = line.strip_prefix("require ");
            let candidate = if in_require_block {
                Some(line)
            } else {
                stripped
            };
            if let Some(candidate) = candidate {
                let mut tokens = candidate.split_whitespace();
                if let Some(module_path) = tokens.next() {
                    if !module_path.is_empty() {
                        result.insert(module_path);
                        if let Some(version) = tokens.next() {
                            result
                                .metadata
                                .insert(format!("{}@version", module_path.to_lowercase()), version.to_string());
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Package
    }
}
