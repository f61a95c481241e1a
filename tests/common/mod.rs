#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tokio::sync::mpsc;

use astro::session::ExecutionResult;
use astro::Project;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn mock_terraform(name: &str) -> String {
    fixture_path("mock-terraform")
        .join(name)
        .display()
        .to_string()
}

/// Copy a fixture config into a scratch directory, create stub source trees
/// for its modules, and point it at the given mock terraform script.
pub fn project_with_mock(fixture: &str, mock: &str) -> (TempDir, Project) {
    let dir = tempfile::tempdir().expect("creating scratch dir");
    let config_path = dir.path().join("astro.yaml");
    fs::copy(fixture_path(fixture), &config_path).expect("copying fixture config");

    let mut project = Project::from_config_file(&config_path).expect("loading project");

    let source_dirs: Vec<PathBuf> = project
        .config
        .modules
        .iter()
        .map(|m| dir.path().join(&m.source_dir))
        .collect();
    for source in source_dirs {
        fs::create_dir_all(&source).expect("creating module sources");
        fs::write(source.join("main.tf"), "# test module\n").expect("writing module stub");
    }

    project.config.terraform.path = mock_terraform(mock);
    (dir, project)
}

/// Drain the result channel into a map of execution id -> error message.
pub async fn read_results(
    mut results: mpsc::Receiver<ExecutionResult>,
) -> HashMap<String, Option<String>> {
    let mut out = HashMap::new();
    while let Some(result) = results.recv().await {
        out.insert(
            result.id.clone(),
            result.error.as_ref().map(|e| e.to_string()),
        );
    }
    out
}

/// Drain the result channel preserving delivery order.
pub async fn read_results_ordered(
    mut results: mpsc::Receiver<ExecutionResult>,
) -> Vec<ExecutionResult> {
    let mut out = Vec::new();
    while let Some(result) = results.recv().await {
        out.push(result);
    }
    out
}

/// Position of an id in an ordered result list; panics when absent.
pub fn position(results: &[ExecutionResult], id: &str) -> usize {
    results
        .iter()
        .position(|r| r.id == id)
        .unwrap_or_else(|| panic!("result for {id:?} not delivered"))
}

/// Session directories created under the scratch dir's `.astro`.
pub fn session_dirs(dir: &TempDir) -> Vec<String> {
    let repo = dir.path().join(".astro");
    let shape = regex::Regex::new("^[0-9A-Z]{26}$").expect("session id regex");

    let mut sessions = Vec::new();
    for entry in fs::read_dir(repo).expect("reading session repo") {
        let name = entry.expect("repo entry").file_name();
        let name = name.to_string_lossy().to_string();
        if shape.is_match(&name) {
            sessions.push(name);
        }
    }
    sessions
}
