//! Dependency Graph: builds a directed graph of "R depends on R'" edges
//! from each resource's produced package name and detected needs, levels
//! it with Kahn's algorithm, and reports cross-repo version gaps.

pub mod gap;
pub mod produced;

use air_detectors::DetectorRegistry;
use air_types::{DependencyType, Finding, Severity};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use produced::{produced_package, Produced};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One resource as seen by the graph builder; deliberately decoupled from
/// `air_types::Resource` so this crate does not need the whole workspace
/// config shape, just a name and a filesystem path.
#[derive(Debug, Clone)]
pub struct RepoInput {
    pub name: String,
    pub path: PathBuf,
}

impl RepoInput {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index_of: HashMap<String, NodeIndex>,
    produced: HashMap<String, Produced>,
    produced_by: HashMap<String, String>,
    /// Per-resource: needed package name (lowercase) -> version constraint
    /// string, empty when the detector that found it carries no constraint
    /// (e.g. an import detector, or an unconstrained requirement).
    needs: HashMap<String, HashMap<String, String>>,
    /// Per-resource manifest file that declared its `needs`, used as the
    /// `location` of any gap finding attributed to that resource.
    manifests: HashMap<String, String>,
}

impl DependencyGraph {
    /// Node insertion happens for every resource regardless of whether it
    /// has any edges, so isolated repos still appear as their own
    /// single-node level.
    pub fn build(repos: &[RepoInput]) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();
        let mut produced = HashMap::new();
        let mut produced_by: HashMap<String, String> = HashMap::new();
        let mut needs = HashMap::new();
        let mut manifests = HashMap::new();

        for repo in repos {
            index_of.insert(repo.name.clone(), graph.add_node(repo.name.clone()));

            let produced_here = produced_package(&repo.path, &repo.name);
            if let Some(existing) = produced_by.get(&produced_here.name) {
                tracing::warn!(
                    package = %produced_here.name,
                    first = %existing,
                    second = %repo.name,
                    "multiple resources produce the same package name; keeping the first"
                );
            } else {
                produced_by.insert(produced_here.name.clone(), repo.name.clone());
            }
            produced.insert(repo.name.clone(), produced_here);

            let (repo_needs, manifest) = collect_needs(&repo.path);
            if let Some(manifest) = manifest {
                manifests.insert(repo.name.clone(), manifest);
            }
            needs.insert(repo.name.clone(), repo_needs);
        }

        for repo in repos {
            let Some(repo_needs) = needs.get(&repo.name) else { continue };
            for package_name in repo_needs.keys() {
                let Some(target) = produced_by.get(package_name) else { continue };
                if target == &repo.name {
                    continue; // a resource never depends on its own produced package
                }
                let from = index_of[&repo.name];
                let to = index_of[target];
                graph.add_edge(from, to, ());
            }
        }

        Self {
            graph,
            index_of,
            produced,
            produced_by,
            needs,
            manifests,
        }
    }

    /// Kahn's-algorithm leveling. A node's prerequisites are the repos it
    /// depends on (its out-edges);
    /// it becomes ready once all of them have already been placed in an
    /// earlier level. Ties within a level break alphabetically. Any nodes
    /// left over after the loop drains form a cycle: they are emitted as
    /// one final level alongside a warning finding naming the participants.
    pub fn levels(&self) -> (Vec<Vec<String>>, Vec<Finding>) {
        let mut remaining_deps: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();
        let mut pending: HashSet<NodeIndex> = self.graph.node_indices().collect();
        let mut levels = Vec::new();

        loop {
            let mut ready: Vec<NodeIndex> = pending
                .iter()
                .copied()
                .filter(|n| remaining_deps[n] == 0)
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            for n in &ready {
                pending.remove(n);
                for predecessor in self.graph.neighbors_directed(*n, Direction::Incoming) {
                    if pending.contains(&predecessor) {
                        *remaining_deps.get_mut(&predecessor).unwrap() -= 1;
                    }
                }
            }
            levels.push(ready.into_iter().map(|n| self.graph[n].clone()).collect());
        }

        let mut findings = Vec::new();
        if !pending.is_empty() {
            let mut names: Vec<String> = pending.iter().map(|n| self.graph[*n].clone()).collect();
            names.sort();
            findings.push(Finding::new(
                "architecture",
                Severity::Medium,
                "Circular dependency between repositories",
                format!("A dependency cycle prevents full ordering: {}.", names.join(", ")),
                names[0].clone(),
            ));
            levels.push(names);
        }
        (levels, findings)
    }

    /// Nodes with at least one incoming or outgoing edge.
    pub fn repos_with_dependencies(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .node_indices()
            .filter(|n| {
                self.graph.neighbors_directed(*n, Direction::Incoming).count() > 0
                    || self.graph.neighbors_directed(*n, Direction::Outgoing).count() > 0
            })
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names
    }

    /// All resources that transitively depend on `repo_name`, used by the
    /// orchestrator's gap-analysis mode to find a library's dependents.
    pub fn transitive_dependents(&self, repo_name: &str) -> Vec<String> {
        let Some(&start) = self.index_of.get(repo_name) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(n) = stack.pop() {
            for dependent in self.graph.neighbors_directed(n, Direction::Incoming) {
                if visited.insert(dependent) {
                    out.push(self.graph[dependent].clone());
                    stack.push(dependent);
                }
            }
        }
        out.sort();
        out
    }

    /// Version-gap findings for every edge where the dependent's
    /// constraint cannot be satisfied by what the dependency currently
    /// produces.
    pub fn gap_findings(&self) -> Vec<Finding> {
        let mut out: Vec<Finding> = self.needs.keys().flat_map(|resource| self.gap_findings_for(resource)).collect();
        out.sort();
        out
    }

    /// Gap findings attributable to one resource's own `needs`, used by the
    /// orchestrator's gap-analysis mode to attach findings to the correct
    /// dependent's artifact.
    pub fn gap_findings_for(&self, resource: &str) -> Vec<Finding> {
        let mut out = Vec::new();
        let Some(repo_needs) = self.needs.get(resource) else { return out };
        for (package_name, constraint) in repo_needs {
            if constraint.is_empty() {
                continue;
            }
            let Some(target_resource) = self.produced_by.get(package_name) else { continue };
            if target_resource == resource {
                continue;
            }
            let Some(target) = self.produced.get(target_resource) else { continue };
            let Some(version) = &target.version else { continue };
            let manifest = self.manifests.get(resource).map(String::as_str).unwrap_or(resource);
            if let Some(finding) = gap::gap_finding(resource, manifest, package_name, constraint, version) {
                out.push(finding);
            }
        }
        out.sort();
        out
    }

    pub fn produced_package_for(&self, resource: &str) -> Option<&Produced> {
        self.produced.get(resource)
    }

    /// The full edge set as `repo-name -> [dep-repo-name, ...]`, the shape
    /// persisted to `analysis/dependency-graph.json`. Every node appears,
    /// including ones with no outgoing edges (an empty list).
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map = BTreeMap::new();
        for n in self.graph.node_indices() {
            let mut deps: Vec<String> = self
                .graph
                .neighbors_directed(n, Direction::Outgoing)
                .map(|d| self.graph[d].clone())
                .collect();
            deps.sort();
            map.insert(self.graph[n].clone(), deps);
        }
        map
    }
}

fn collect_needs(repo_path: &Path) -> (HashMap<String, String>, Option<String>) {
    let registry = DetectorRegistry::with_builtins();
    let mut needs = HashMap::new();
    let mut manifest = None;

    for result in registry.detect_by_type(repo_path, DependencyType::Package) {
        if manifest.is_none() {
            manifest = Some(result.source_file.clone());
        }
        for dep in &result.dependencies {
            let constraint = result.metadata.get(&format!("{dep}@version")).cloned().unwrap_or_default();
            needs.entry(dep.clone()).or_insert(constraint);
        }
    }
    for result in registry.detect_by_type(repo_path, DependencyType::Import) {
        for dep in &result.dependencies {
            needs.entry(dep.clone()).or_insert_with(String::new);
        }
    }
    (needs, manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_python_lib(dir: &Path, name: &str, version: &str) {
        std::fs::write(
            dir.join("pyproject.toml"),
            format!("[project]\nname = \"{name}\"\nversion = \"{version}\"\n"),
        )
        .unwrap();
    }

    #[test]
    fn edges_follow_produced_needs_matching() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        let lib = root.path().join("widget-core");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        write_python_lib(&lib, "widget-core", "1.0.0");
        std::fs::write(app.join("requirements.txt"), "widget-core>=1.0\n").unwrap();

        let graph = DependencyGraph::build(&[RepoInput::new("app", &app), RepoInput::new("widget-core", &lib)]);
        let (levels, cycle_findings) = graph.levels();
        assert!(cycle_findings.is_empty());
        assert_eq!(levels[0], vec!["widget-core".to_string()]);
        assert_eq!(levels[1], vec!["app".to_string()]);
    }

    #[test]
    fn cycle_is_reported_and_still_produces_a_final_level() {
        let root = tempfile::tempdir().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        write_python_lib(&a, "pkg-a", "1.0.0");
        write_python_lib(&b, "pkg-b", "1.0.0");
        std::fs::write(a.join("requirements.txt"), "pkg-b>=1.0\n").unwrap();
        std::fs::write(b.join("requirements.txt"), "pkg-a>=1.0\n").unwrap();

        let graph = DependencyGraph::build(&[RepoInput::new("a", &a), RepoInput::new("b", &b)]);
        let (levels, findings) = graph.levels();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0], vec!["a".to_string(), "b".to_string()]);
        assert!(findings.iter().any(|f| f.title == "Circular dependency between repositories"));
    }

    #[test]
    fn gap_finding_emitted_when_constraint_unsatisfied() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        let lib = root.path().join("widget-core");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        write_python_lib(&lib, "widget-core", "3.0.0");
        std::fs::write(app.join("requirements.txt"), "widget-core>=1.0,<2.0\n").unwrap();

        let graph = DependencyGraph::build(&[RepoInput::new("app", &app), RepoInput::new("widget-core", &lib)]);
        let gaps = graph.gap_findings();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].location, "requirements.txt");
    }

    #[test]
    fn to_map_lists_every_node_with_its_outgoing_deps() {
        let root = tempfile::tempdir().unwrap();
        let app = root.path().join("app");
        let lib = root.path().join("widget-core");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::create_dir_all(&lib).unwrap();
        write_python_lib(&lib, "widget-core", "1.0.0");
        std::fs::write(app.join("requirements.txt"), "widget-core>=1.0\n").unwrap();

        let graph = DependencyGraph::build(&[RepoInput::new("app", &app), RepoInput::new("widget-core", &lib)]);
        let map = graph.to_map();
        assert_eq!(map.get("app"), Some(&vec!["widget-core".to_string()]));
        assert_eq!(map.get("widget-core"), Some(&Vec::<String>::new()));
    }

    #[test]
    fn isolated_repo_forms_its_own_level() {
        let root = tempfile::tempdir().unwrap();
        let solo = root.path().join("solo");
        std::fs::create_dir_all(&solo).unwrap();
        let graph = DependencyGraph::build(&[RepoInput::new("solo", &solo)]);
        let (levels, _) = graph.levels();
        assert_eq!(levels, vec![vec!["solo".to_string()]]);
        assert!(graph.repos_with_dependencies().is_empty());
    }
}
