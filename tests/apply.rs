mod common;

use std::collections::HashSet;
use std::error::Error;

use astro::errors::AstroError;
use astro::{ApplyExecutionParameters, ExecutionParameters, UserVariables};

use common::{position, project_with_mock, read_results, read_results_ordered, session_dirs};

type TestResult = Result<(), Box<dyn Error>>;

fn east1_params() -> ExecutionParameters {
    ExecutionParameters {
        module_names: vec![],
        user_vars: UserVariables {
            values: [("aws_region".to_string(), "east1".to_string())]
                .into_iter()
                .collect(),
            filters: Default::default(),
        },
    }
}

#[tokio::test]
async fn apply_with_graph_succeeds_and_respects_edges() -> TestResult {
    let (_dir, project) = project_with_mock("foosite.yaml", "success");

    let (_status, results) = project
        .apply(ApplyExecutionParameters {
            execution: east1_params(),
            no_graph: false,
        })
        .await?;

    let results = read_results_ordered(results).await;
    assert_eq!(results.len(), 12);
    for result in &results {
        assert!(result.error.is_none(), "{} failed", result.id);
    }

    // For every dependency edge, the dependency's result is delivered first.
    assert!(position(&results, "users") < position(&results, "database-east1-dev"));
    assert!(position(&results, "users") < position(&results, "database-east1-staging"));
    assert!(position(&results, "users") < position(&results, "database-east1-prod"));
    for env in ["dev", "staging", "prod"] {
        assert!(
            position(&results, &format!("database-east1-{env}"))
                < position(&results, &format!("app-east1-{env}"))
        );
    }
    for env in ["dev", "staging", "prod", "mgmt"] {
        assert!(
            position(&results, &format!("network-east1-{env}"))
                < position(&results, "mgmt-east1")
        );
    }
    Ok(())
}

#[tokio::test]
async fn failed_execution_skips_its_dependents() -> TestResult {
    let (_dir, project) = project_with_mock("foosite.yaml", "fail-users");

    let (_status, results) = project
        .apply(ApplyExecutionParameters {
            execution: east1_params(),
            no_graph: false,
        })
        .await?;

    let results = read_results(results).await;

    // users itself failed...
    assert!(results.get("users").expect("users result").is_some());

    // ...its transitive dependents never ran...
    for id in [
        "database-east1-dev",
        "database-east1-staging",
        "database-east1-prod",
        "app-east1-dev",
        "app-east1-staging",
        "app-east1-prod",
    ] {
        assert!(!results.contains_key(id), "{id} should have been skipped");
    }

    // ...and independent executions were unaffected.
    for id in [
        "network-east1-dev",
        "network-east1-staging",
        "network-east1-prod",
        "network-east1-mgmt",
        "mgmt-east1",
    ] {
        assert_eq!(results.get(id), Some(&None), "{id} should have succeeded");
    }
    Ok(())
}

#[tokio::test]
async fn flat_apply_runs_everything_despite_failures() -> TestResult {
    let (_dir, project) = project_with_mock("foosite.yaml", "fail-users");

    let (_status, results) = project
        .apply(ApplyExecutionParameters {
            execution: east1_params(),
            no_graph: true,
        })
        .await?;

    let results = read_results(results).await;

    assert_eq!(results.len(), 12);
    assert!(results.get("users").expect("users result").is_some());
    assert_eq!(results.get("app-east1-dev"), Some(&None));
    Ok(())
}

#[tokio::test]
async fn hooks_run_on_graph_apply_but_not_flat_apply() -> TestResult {
    for (no_graph, expect_hook) in [(false, true), (true, false)] {
        let (dir, project) = project_with_mock("test-hooks.yaml", "success");

        let (_status, results) = project
            .apply(ApplyExecutionParameters {
                execution: ExecutionParameters::default(),
                no_graph,
            })
            .await?;

        let results = read_results(results).await;
        assert_eq!(results.len(), 2);
        for (id, err) in &results {
            assert!(err.is_none(), "{id} failed: {err:?}");
        }

        let sessions = session_dirs(&dir);
        assert_eq!(sessions.len(), 1);
        for env in ["dev", "prod"] {
            let marker = dir
                .path()
                .join(".astro")
                .join(&sessions[0])
                .join(format!("writer-{env}"))
                .join("hook-ran");
            assert_eq!(
                marker.is_file(),
                expect_hook,
                "unexpected hook state for writer-{env} (no_graph = {no_graph})"
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn failing_hook_fails_the_execution_and_skips_dependents() -> TestResult {
    let (_dir, project) = project_with_mock("test-hook-fail.yaml", "success");

    let (_status, results) = project
        .apply(ApplyExecutionParameters {
            execution: ExecutionParameters::default(),
            no_graph: false,
        })
        .await?;

    let results = read_results_ordered(results).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "base");
    assert!(matches!(results[0].err(), Some(AstroError::Hook(_))));
    Ok(())
}

#[tokio::test]
async fn startup_hook_environment_reaches_module_hooks() -> TestResult {
    // The preModuleRun hook in the fixture only succeeds when it sees the
    // variable exported by the startup hook.
    let (_dir, project) = project_with_mock("test-hooks.yaml", "success");

    let (_status, results) = project
        .apply(ApplyExecutionParameters {
            execution: ExecutionParameters::default(),
            no_graph: false,
        })
        .await?;

    let results = read_results(results).await;
    assert_eq!(results.get("writer-dev"), Some(&None));
    assert_eq!(results.get("writer-prod"), Some(&None));
    Ok(())
}
