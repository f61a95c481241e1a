use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use astro::errors::AstroError;
use astro::exec::{run_hook, run_parallel};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn pool_runs_every_future() -> TestResult {
    let counter = Arc::new(AtomicUsize::new(0));

    let futures: Vec<BoxFuture<'static, ()>> = (0..25)
        .map(|_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
        .collect();

    run_parallel(CancellationToken::new(), 10, futures).await;

    assert_eq!(counter.load(Ordering::SeqCst), 25);
    Ok(())
}

#[tokio::test]
async fn cancelled_pool_starts_nothing() -> TestResult {
    let counter = Arc::new(AtomicUsize::new(0));
    let token = CancellationToken::new();
    token.cancel();

    let futures: Vec<BoxFuture<'static, ()>> = (0..5)
        .map(|_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
        .collect();

    run_parallel(token, 10, futures).await;

    assert_eq!(counter.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn hooks_report_their_exported_environment() -> TestResult {
    let dir = tempfile::tempdir()?;

    let exported = run_hook(
        dir.path(),
        "export GREETING=hello && export REGION=east1",
        &HashMap::new(),
    )
    .await?;

    assert_eq!(exported.get("GREETING").map(String::as_str), Some("hello"));
    assert_eq!(exported.get("REGION").map(String::as_str), Some("east1"));
    Ok(())
}

#[tokio::test]
async fn hooks_see_previously_exported_variables() -> TestResult {
    let dir = tempfile::tempdir()?;

    let mut env = HashMap::new();
    env.insert("GREETING".to_string(), "hello".to_string());

    // Succeeds only when the inherited variable is present.
    run_hook(dir.path(), "test \"$GREETING\" = hello", &env).await?;
    Ok(())
}

#[tokio::test]
async fn failing_hook_surfaces_exit_code_and_stderr() -> TestResult {
    let dir = tempfile::tempdir()?;

    let err = run_hook(dir.path(), "echo boom >&2; exit 3", &HashMap::new())
        .await
        .expect_err("hook should fail");

    match err {
        AstroError::Hook(message) => {
            assert!(message.contains("3"), "missing exit code: {message}");
            assert!(message.contains("boom"), "missing stderr: {message}");
        }
        other => panic!("expected Hook error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn hooks_run_in_the_given_directory() -> TestResult {
    let dir = tempfile::tempdir()?;

    run_hook(dir.path(), "touch here", &HashMap::new()).await?;

    assert!(dir.path().join("here").is_file());
    Ok(())
}
