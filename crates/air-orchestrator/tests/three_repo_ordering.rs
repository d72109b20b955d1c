//! End-to-end dependency-ordering and gap-analysis scenario: `util` produces
//! a package, `api` depends on it, `web` depends on `api`.

use air_depgraph::RepoInput;
use air_orchestrator::{run_gap, run_multi, FindingsArtifact, MultiMode, OrchestratorConfig, OrchestratorEvent};
use air_worker_pool::{CancelToken, WorkerPoolConfig};
use std::path::Path;
use std::time::Duration;

fn write_python_package(dir: &Path, name: &str, version: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("pyproject.toml"),
        format!("[project]\nname = \"{name}\"\nversion = \"{version}\"\n"),
    )
    .unwrap();
    std::fs::write(dir.join("main.py"), "def run():\n    return 1\n").unwrap();
}

fn test_config(root: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        worker_pool: WorkerPoolConfig {
            workers: 4,
            timeout: Duration::from_secs(10),
            worker_binary: Path::new("/nonexistent/air-worker-binary-for-tests").to_path_buf(),
            cache_dir: root.join("cache"),
            software_version: "1.0.0".to_string(),
        },
        output_root: root.join("analysis/reviews"),
        analyzers: vec!["security".to_string()],
        include_external: false,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn three_repos_analyze_in_dependency_order() {
    let root = tempfile::tempdir().unwrap();
    let util = root.path().join("util");
    let api = root.path().join("api");
    let web = root.path().join("web");

    write_python_package(&util, "util", "1.0.0");
    write_python_package(&api, "api", "1.0.0");
    write_python_package(&web, "web", "1.0.0");
    std::fs::write(api.join("requirements.txt"), "util>=1.0\n").unwrap();
    std::fs::write(web.join("requirements.txt"), "api>=1.0\n").unwrap();

    let repos = vec![
        RepoInput::new("web", &web),
        RepoInput::new("api", &api),
        RepoInput::new("util", &util),
    ];
    let config = test_config(root.path());
    let cancel = CancelToken::new();
    let mut levels = Vec::new();

    let paths = run_multi(&repos, &config, MultiMode::Ordered, &cancel, |event| {
        if let OrchestratorEvent::LevelCompleted { repos, .. } = event {
            levels.push(repos);
        }
    })
    .await
    .unwrap();

    assert_eq!(paths.len(), 3);
    assert_eq!(levels, vec![vec!["util".to_string()], vec!["api".to_string()], vec!["web".to_string()]]);

    for name in ["util", "api", "web"] {
        let artifact_path = config.output_root.join(format!("{name}-findings.json"));
        assert!(artifact_path.exists(), "missing findings artifact for {name}");
    }

    let graph_path = config.output_root.parent().unwrap().join("dependency-graph.json");
    let graph: std::collections::BTreeMap<String, Vec<String>> =
        serde_json::from_slice(&std::fs::read(&graph_path).unwrap()).unwrap();
    assert_eq!(
        graph,
        std::collections::BTreeMap::from([
            ("api".to_string(), vec!["util".to_string()]),
            ("web".to_string(), vec!["api".to_string()]),
            ("util".to_string(), Vec::new()),
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn gap_mode_flags_unsatisfied_dependent_constraint() {
    let root = tempfile::tempdir().unwrap();
    let util = root.path().join("util");
    let api = root.path().join("api");

    write_python_package(&util, "util", "1.3.0");
    write_python_package(&api, "api", "1.0.0");
    std::fs::write(api.join("requirements.txt"), "util<=1.2.0\n").unwrap();

    let repos = vec![RepoInput::new("util", &util), RepoInput::new("api", &api)];
    let config = test_config(root.path());
    let cancel = CancelToken::new();

    run_gap("util", &repos, &config, &cancel, |_| {}).await.unwrap();

    let api_artifact_path = config.output_root.join("api-findings.json");
    let artifact: FindingsArtifact = serde_json::from_slice(&std::fs::read(&api_artifact_path).unwrap()).unwrap();
    let gap = artifact
        .findings
        .iter()
        .find(|f| f.category == "architecture" && f.title == "Cross-repo dependency version gap")
        .expect("expected a gap finding referencing util's current version");
    assert!(gap.description.contains("1.3.0"));
}
