//! `ArchitectureAnalyzer`: dependency pinning audit,
//! circular-import detection, architectural-pattern tags.

use crate::Analyzer;
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding, Severity};
use once_cell::sync::Lazy;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PINNED_REQUIREMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+\s*==\s*\S+").unwrap());
static UNPINNED_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+\s*(?:>=|<=|~=|>|<)\s*\S+|^[A-Za-z0-9_.\-]+\s*$").unwrap());
static RELATIVE_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*from\s+(\.+)(\w*)\s+import\s+(.+)$").unwrap());

const LAYER_DIRS: &[(&str, &str)] = &[
    ("api", "API layer"),
    ("models", "models layer"),
    ("model", "models layer"),
    ("services", "services layer"),
    ("service", "services layer"),
    ("controllers", "controllers layer"),
    ("views", "views layer"),
];

pub struct ArchitectureAnalyzer;

impl ArchitectureAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArchitectureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ArchitectureAnalyzer {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        _cache: Option<&Cache>,
    ) -> AnalyzerResult {
        let mut findings = Vec::new();
        findings.extend(pinning_audit(repo_path));
        findings.extend(circular_import_findings(repo_path, include_external, filter));
        findings.extend(architectural_pattern_tags(repo_path, include_external, filter));
        AnalyzerResult::new("architecture", findings)
    }
}

fn pinning_audit(repo_path: &Path) -> Vec<Finding> {
    let path = repo_path.join("requirements.txt");
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    let mut findings = Vec::new();
    for (i, raw_line) in content.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') {
            continue;
        }
        if !PINNED_REQUIREMENT.is_match(line) && UNPINNED_REQUIREMENT.is_match(line) {
            findings.push(
                Finding::new(
                    "architecture",
                    Severity::Low,
                    "Unpinned dependency",
                    format!("`{line}` has no exact version pin (`==`)."),
                    "requirements.txt",
                )
                .with_line((i + 1) as u32),
            );
        }
    }
    findings
}

fn circular_import_findings(repo_path: &Path, include_external: bool, filter: &PathFilter) -> Vec<Finding> {
    let mut graph = DiGraph::<String, ()>::new();
    let mut index_of: HashMap<String, petgraph::graph::NodeIndex> = HashMap::new();
    let mut module_to_file: HashMap<String, String> = HashMap::new();

    let mut node_index = |graph: &mut DiGraph<String, ()>, index_of: &mut HashMap<String, _>, key: &str| {
        *index_of
            .entry(key.to_string())
            .or_insert_with(|| graph.add_node(key.to_string()))
    };

    let py_files: Vec<_> = filter
        .walk_first_party(repo_path, include_external)
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("py"))
        .collect();

    for entry in &py_files {
        let Ok(relative) = entry.path().strip_prefix(repo_path) else {
            continue;
        };
        let module = module_name_for(relative);
        module_to_file.insert(module.clone(), relative.to_string_lossy().to_string());
        node_index(&mut graph, &mut index_of, &module);
    }

    for entry in &py_files {
        let Ok(relative) = entry.path().strip_prefix(repo_path) else {
            continue;
        };
        let from_module = module_name_for(relative);
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };
        for line in content.lines() {
            if let Some(caps) = RELATIVE_IMPORT.captures(line) {
                let module_part = caps[2].to_string();
                let candidates: Vec<String> = if !module_part.is_empty() {
                    vec![module_part]
                } else {
                    caps[3]
                        .split(',')
                        .map(|name| name.trim().split_whitespace().next().unwrap_or("").to_string())
                        .filter(|name| !name.is_empty())
                        .collect()
                };
                for target in candidates {
                    if module_to_file.contains_key(&target) && target != from_module {
                        let from_idx = node_index(&mut graph, &mut index_of, &from_module);
                        let to_idx = node_index(&mut graph, &mut index_of, &target);
                        graph.add_edge(from_idx, to_idx, ());
                    }
                }
            }
        }
    }

    let mut findings = Vec::new();
    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let names: Vec<String> = component.iter().map(|idx| graph[*idx].clone()).collect();
            findings.push(Finding::new(
                "architecture",
                Severity::Medium,
                "Circular import detected",
                format!("Modules form an import cycle: {}.", names.join(" -> ")),
                module_to_file.get(&names[0]).cloned().unwrap_or_default(),
            ));
        }
    }
    findings
}

fn module_name_for(relative: &Path) -> String {
    relative
        .with_extension("")
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, ".")
}

fn architectural_pattern_tags(repo_path: &Path, include_external: bool, filter: &PathFilter) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut seen = Vec::new();
    for entry in filter.walk_first_party(repo_path, include_external) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.path().file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for (dir, label) in LAYER_DIRS {
            if name.eq_ignore_ascii_case(dir) && !seen.contains(label) {
                seen.push(*label);
                findings.push(Finding::new(
                    "architecture",
                    Severity::Info,
                    "Architectural layer present",
                    format!("Detected a {label} (`{name}/`)."),
                    name,
                ));
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_pathfilter::PathFilter;

    #[test]
    fn flags_unpinned_requirement() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "flask>=2.0\ndjango==4.2.1\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = ArchitectureAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.title == "Unpinned dependency"));
        assert!(!result
            .findings
            .iter()
            .any(|f| f.title == "Unpinned dependency" && f.description.contains("django")));
    }

    #[test]
    fn detects_a_two_file_import_cycle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "from . import b\n").unwrap();
        std::fs::write(dir.path().join("b.py"), "from . import a\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = ArchitectureAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.title == "Circular import detected"));
    }

    #[test]
    fn tags_known_layer_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("services")).unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        let filter = PathFilter::new();
        let analyzer = ArchitectureAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.description.contains("services layer")));
        assert!(result.findings.iter().any(|f| f.description.contains("models layer")));
    }
}
