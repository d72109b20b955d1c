//! Source-scanning import detectors. Each yields imported top-level
//! module/package names, excluding relative imports.

use crate::Detector;
use air_errors::AirResult;
use air_pathfilter::PathFilter;
use air_types::{DependencyResult, DependencyType};
use regex::Regex;
use std::path::Path;

fn any_file_with_extension(repo_path: &Path, filter: &PathFilter, exts: &[&str]) -> bool {
    filter
        .walk_first_party(repo_path, false)
        .take(2000)
        .any(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| exts.contains(&e))
                .unwrap_or(false)
        })
}

pub struct PythonImportDetector;

impl Detector for PythonImportDetector {
    fn name(&self) -> &'static str {
        "python-imports"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        let filter = PathFilter::new();
        any_file_with_extension(repo_path, &filter, &["py"])
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let filter = PathFilter::new();
        let mut result = DependencyResult::new(DependencyType::Import, "*.py");
        let import_re = Regex::new(r"^\s*(?:import|from)\s+([A-Za-z0-9_.]+)").expect("static regex compiles");
        for entry in filter.walk_first_party(repo_path, false) {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            for line in content.lines() {
                if let Some(caps) = import_re.captures(line) {
                    let module = &caps[1];
                    if module.starts_with('.') {
                        continue; // relative import, excluded by contract
                    }
                    let top_level = module.split('.').next().unwrap_or(module);
                    result.insert(top_level);
                }
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Import
    }
}

pub struct JsTsImportDetector;

impl Detector for JsTsImportDetector {
    fn name(&self) -> &'static str {
        "js-ts-imports"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        let filter = PathFilter::new();
        any_file_with_extension(repo_path, &filter, &["js", "jsx", "ts", "tsx"])
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let filter = PathFilter::new();
        let mut result = DependencyResult::new(DependencyType::Import, "*.{js,ts}");
        let import_re = Regex::new(
            r#"(?:import\s+(?:[^'"]*\s+from\s+)?|require\()\s*['"]([^'"]+)['"]"#,
        )
        .expect("static regex compiles");
        for entry in filter.walk_first_party(repo_path, false) {
            let is_js_ts = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| ["js", "jsx", "ts", "tsx"].contains(&e))
                .unwrap_or(false);
            if !is_js_ts {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            for caps in import_re.captures_iter(&content) {
                let module = &caps[1];
                if module.starts_with('.') || module.starts_with('/') {
                    continue; // relative/absolute-path import, excluded
                }
                let top_level = if module.starts_with('@') {
                    module.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
                } else {
                    module.split('/').next().unwrap_or(module).to_string()
                };
                result.insert(top_level);
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Import
    }
}

pub struct GoImportDetector;

impl Detector for GoImportDetector {
    fn name(&self) -> &'static str {
        "go-imports"
    }

    fn can_detect(&self, repo_path: &Path) -> bool {
        let filter = PathFilter::new();
        any_file_with_extension(repo_path, &filter, &["go"])
    }

    fn detect(&self, repo_path: &Path) -> AirResult<DependencyResult> {
        let filter = PathFilter::new();
        let mut result = DependencyResult::new(DependencyType::Import, "*.go");
        let single_re = Regex::new(r#"^\s*import\s+"([^"]+)""#).expect("static regex compiles");
        let block_line_re = Regex::new(r#"^\s*(?:[A-Za-z0-9_]+\s+)?"([^"]+)""#).expect("static regex compiles");
        for entry in filter.walk_first_party(repo_path, false) {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            let mut in_block = false;
            for line in content.lines() {
                let trimmed = line.trim();
                if trimmed.starts_with("import (") {
                    in_block = true;
                    continue;
                }
                if in_block && trimmed == ")" {
                    in_block = false;
                    continue;
                }
                let path = if in_block {
                    block_line_re.captures(trimmed).map(|c| c[1].to_string())
                } else {
                    single_re.captures(trimmed).map(|c| c[1].to_string())
                };
                if let Some(path) = path {
                    if !path.contains('.') && !path.contains('/') {
                        continue; // standard-library-only segment heuristic left to the caller
                    }
                    result.insert(path);
                }
            }
        }
        Ok(result)
    }

    fn dependency_type(&self) -> DependencyType {
        DependencyType::Import
    }
}
