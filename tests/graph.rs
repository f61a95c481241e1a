mod common;

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use astro::config::load_and_validate;
use astro::dag::{walk, ExecutionGraph};
use astro::errors::AstroError;
use astro::expand::{bind_all, expand, ExecutionSet};
use astro::{ExecutionParameters, UserVariables};

use common::fixture_path;

type TestResult = Result<(), Box<dyn Error>>;

fn foosite_set() -> ExecutionSet {
    let config = load_and_validate(fixture_path("foosite.yaml")).expect("fixture config");
    let params = ExecutionParameters {
        module_names: vec![],
        user_vars: UserVariables {
            values: [("aws_region".to_string(), "east1".to_string())]
                .into_iter()
                .collect(),
            filters: Default::default(),
        },
    };
    let unbound = expand(&config, &params).expect("expansion");
    bind_all(unbound, Path::new("/tmp/astro-graph-test"))
}

fn index_of(graph: &ExecutionGraph, id: &str) -> usize {
    (0..graph.len())
        .find(|&i| graph.vertex(i).id() == id)
        .unwrap_or_else(|| panic!("vertex {id:?} not in graph"))
}

#[test]
fn edges_follow_dependencies_matched_on_shared_identity() -> TestResult {
    let graph = ExecutionGraph::build(&foosite_set())?;

    let users = index_of(&graph, "users");
    let database_dev = index_of(&graph, "database-east1-dev");
    let app_dev = index_of(&graph, "app-east1-dev");
    let app_prod = index_of(&graph, "app-east1-prod");
    let mgmt = index_of(&graph, "mgmt-east1");

    // users has no identity variables, so it precedes every database
    // execution.
    assert_eq!(graph.successors_of(users).len(), 3);
    assert!(graph.successors_of(users).contains(&database_dev));

    // app-east1-dev depends on the matching database execution only.
    assert_eq!(graph.predecessors_of(app_dev), &[database_dev]);
    assert_ne!(graph.predecessors_of(app_prod), &[database_dev]);

    // mgmt shares only aws_region with network, so all four network
    // executions precede it.
    assert_eq!(graph.predecessors_of(mgmt).len(), 4);

    // Executions of dependency-free modules are roots.
    assert!(graph.predecessors_of(users).is_empty());
    assert!(graph
        .predecessors_of(index_of(&graph, "network-east1-dev"))
        .is_empty());
    Ok(())
}

#[test]
fn cyclic_module_dependencies_are_rejected() -> TestResult {
    // Bypasses config validation on purpose: the graph must defend itself.
    let config: astro::config::ProjectConfig = serde_yaml::from_str(
        r#"
modules:
  - name: a
    sourceDir: terraform/a
    dependencies: [b]
  - name: b
    sourceDir: terraform/b
    dependencies: [a]
"#,
    )?;

    let unbound = expand(&config, &ExecutionParameters::default())?;
    let set = bind_all(unbound, Path::new("/tmp/astro-graph-test"));

    match ExecutionGraph::build(&set) {
        Err(AstroError::CyclicGraph(_)) => Ok(()),
        other => panic!("expected CyclicGraph, got {other:?}"),
    }
}

#[tokio::test]
async fn walk_visits_in_dependency_order_and_skips_after_failure() -> TestResult {
    let config: astro::config::ProjectConfig = serde_yaml::from_str(
        r#"
modules:
  - name: base
    sourceDir: terraform/base
  - name: mid
    sourceDir: terraform/mid
    dependencies: [base]
  - name: leaf
    sourceDir: terraform/leaf
    dependencies: [mid]
  - name: lonely
    sourceDir: terraform/lonely
"#,
    )?;

    let unbound = expand(&config, &ExecutionParameters::default())?;
    let set = bind_all(unbound, Path::new("/tmp/astro-graph-test"));
    let graph = ExecutionGraph::build(&set)?;

    let visited: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&visited);

    walk(graph, 4, CancellationToken::new(), move |execution| {
        let log = Arc::clone(&log);
        async move {
            let id = execution.id().to_string();
            log.lock().unwrap().push(id.clone());
            // mid fails, so leaf must never run.
            id != "mid"
        }
        .boxed()
    })
    .await;

    let visited = visited.lock().unwrap().clone();
    assert!(visited.contains(&"base".to_string()));
    assert!(visited.contains(&"mid".to_string()));
    assert!(visited.contains(&"lonely".to_string()));
    assert!(!visited.contains(&"leaf".to_string()));

    let base = visited.iter().position(|v| v == "base").unwrap();
    let mid = visited.iter().position(|v| v == "mid").unwrap();
    assert!(base < mid);
    Ok(())
}

#[tokio::test]
async fn cancelled_walk_starts_nothing_new() -> TestResult {
    let config: astro::config::ProjectConfig = serde_yaml::from_str(
        r#"
modules:
  - name: first
    sourceDir: terraform/first
  - name: second
    sourceDir: terraform/second
    dependencies: [first]
"#,
    )?;

    let unbound = expand(&config, &ExecutionParameters::default())?;
    let set = bind_all(unbound, Path::new("/tmp/astro-graph-test"));
    let graph = ExecutionGraph::build(&set)?;

    let token = CancellationToken::new();
    let visited: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&visited);
    let walk_token = token.clone();

    walk(graph, 4, token.clone(), move |execution| {
        let log = Arc::clone(&log);
        let token = walk_token.clone();
        async move {
            log.lock().unwrap().push(execution.id().to_string());
            // Cancel while the root is "running": its dependent must not
            // start even though the root succeeds.
            token.cancel();
            true
        }
        .boxed()
    })
    .await;

    assert_eq!(*visited.lock().unwrap(), vec!["first".to_string()]);
    Ok(())
}
