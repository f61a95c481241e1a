// src/session/runner.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{walker, ExecutionGraph};
use crate::errors::AstroError;
use crate::exec::{hooks, pool};
use crate::expand::{BoundExecution, ExecutionSet};
use crate::session::repo::Session;
use crate::terraform::{TerraformOutput, TerraformSession};

/// Fixed width of the worker pool, for both flat and graph-ordered runs.
pub const WORKER_POOL_WIDTH: usize = 10;

/// Per-execution status messages get `10 * N` slots so that producers never
/// block, even when nobody consumes the channel.
const STATUS_BUFFER_PER_EXECUTION: usize = 10;

/// Outcome of one attempted execution, delivered exactly once on the result
/// channel.
#[derive(Debug)]
pub struct ExecutionResult {
    pub id: String,
    pub terraform: Option<TerraformOutput>,
    pub error: Option<AstroError>,
}

impl ExecutionResult {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn err(&self) -> Option<&AstroError> {
        self.error.as_ref()
    }

    pub fn terraform_result(&self) -> Option<&TerraformOutput> {
        self.terraform.as_ref()
    }
}

/// Everything a worker needs besides its own execution.
pub(crate) struct RunContext {
    pub session: Arc<Session>,
    pub project_root: PathBuf,
    pub terraform_binary: String,
}

impl RunContext {
    /// Environment for terraform children: whatever the hooks exported so
    /// far, plus the shared plugin cache.
    async fn terraform_env(&self) -> HashMap<String, String> {
        let mut env = self.session.hook_env_snapshot().await;
        env.insert(
            "TF_PLUGIN_CACHE_DIR".to_string(),
            self.session.plugin_cache().display().to_string(),
        );
        env
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Plan { detach: bool },
    Apply,
}

/// Plan every execution in the set, flat, through the worker pool.
pub(crate) fn plan(
    ctx: Arc<RunContext>,
    set: ExecutionSet,
    detach: bool,
) -> (mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>) {
    info!(executions = set.len(), "planning execution set");
    run_flat(ctx, set, Operation::Plan { detach }, true)
}

/// Apply every execution in the set, flat. PreModuleRun hooks are not run on
/// this path.
pub(crate) fn apply_flat(
    ctx: Arc<RunContext>,
    set: ExecutionSet,
) -> (mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>) {
    info!(executions = set.len(), "applying execution set without graph");
    run_flat(ctx, set, Operation::Apply, false)
}

/// Apply the executions in dependency order by walking the graph. A failed
/// execution keeps all of its dependents off the result channel.
pub(crate) fn apply_graph(
    ctx: Arc<RunContext>,
    graph: ExecutionGraph,
) -> (mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>) {
    info!(executions = graph.len(), "applying execution set with graph");

    let n = graph.len();
    let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER_PER_EXECUTION * n.max(1));
    let (result_tx, result_rx) = mpsc::channel(n.max(1));
    let token = ctx.session.token();

    let visit = move |execution: BoundExecution| -> BoxFuture<'static, bool> {
        let ctx = Arc::clone(&ctx);
        let status = status_tx.clone();
        let results = result_tx.clone();
        async move { execute_one(ctx, execution, Operation::Apply, true, status, results).await }
            .boxed()
    };

    tokio::spawn(async move {
        walker::walk(graph, WORKER_POOL_WIDTH, token, visit).await;
    });

    (status_rx, result_rx)
}

fn run_flat(
    ctx: Arc<RunContext>,
    set: ExecutionSet,
    op: Operation,
    run_hooks: bool,
) -> (mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>) {
    let n = set.len();
    let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER_PER_EXECUTION * n.max(1));
    let (result_tx, result_rx) = mpsc::channel(n.max(1));
    let token = ctx.session.token();

    let mut futures: Vec<BoxFuture<'static, ()>> = Vec::with_capacity(n);
    for execution in set.into_executions() {
        let ctx = Arc::clone(&ctx);
        let status = status_tx.clone();
        let results = result_tx.clone();
        futures.push(
            async move {
                execute_one(ctx, execution, op, run_hooks, status, results).await;
            }
            .boxed(),
        );
    }

    // The workers hold the only remaining senders; the result channel closing
    // is the end-of-stream signal.
    drop(status_tx);
    drop(result_tx);

    tokio::spawn(pool::run_parallel(token, WORKER_POOL_WIDTH, futures));

    (status_rx, result_rx)
}

/// Run one execution through its phases, delivering exactly one result.
/// Returns whether the execution succeeded.
async fn execute_one(
    ctx: Arc<RunContext>,
    execution: BoundExecution,
    op: Operation,
    run_hooks: bool,
    status: mpsc::Sender<String>,
    results: mpsc::Sender<ExecutionResult>,
) -> bool {
    let id = execution.id().to_string();
    debug!(execution = %id, "starting execution");

    let env = ctx.terraform_env().await;
    let terraform = match TerraformSession::new(
        &ctx.terraform_binary,
        &ctx.project_root,
        &execution,
        env,
        ctx.session.token(),
    )
    .await
    {
        Ok(terraform) => terraform,
        Err(err) => return deliver(&results, &id, None, Some(err)),
    };

    if run_hooks {
        for hook in &execution.module_config().hooks.pre_module_run {
            send_status(&status, &id, "Running PreModuleRun hook");
            let env = ctx.session.hook_env_snapshot().await;
            match hooks::run_hook(terraform.work_dir(), hook, &env).await {
                Ok(exported) => ctx.session.merge_hook_env(exported).await,
                Err(err) => return deliver(&results, &id, None, Some(err)),
            }
        }
    }

    send_status(&status, &id, "Initializing");
    if let Err(err) = terraform.init().await {
        return deliver(&results, &id, None, Some(err));
    }

    match op {
        Operation::Plan { detach } => {
            if detach {
                send_status(&status, &id, "Disconnecting remote state");
                if let Err(err) = terraform.detach().await {
                    return deliver(&results, &id, None, Some(err));
                }
            }

            send_status(&status, &id, "Planning");
            match terraform.plan().await {
                Ok(output) => deliver(&results, &id, Some(output), None),
                Err(err) => deliver(&results, &id, None, Some(err)),
            }
        }
        Operation::Apply => {
            send_status(&status, &id, "Applying");
            match terraform.apply().await {
                Ok(output) => deliver(&results, &id, Some(output), None),
                Err(err) => deliver(&results, &id, None, Some(err)),
            }
        }
    }
}

/// Push one result; never blocks thanks to the N-sized buffer.
fn deliver(
    results: &mpsc::Sender<ExecutionResult>,
    id: &str,
    terraform: Option<TerraformOutput>,
    error: Option<AstroError>,
) -> bool {
    let ok = error.is_none();
    if let Some(err) = &error {
        debug!(execution = %id, error = %err, "execution failed");
    } else {
        debug!(execution = %id, "execution finished");
    }

    let _ = results.try_send(ExecutionResult {
        id: id.to_string(),
        terraform,
        error,
    });
    ok
}

/// Status messages are advisory; when nobody drains the channel the buffer
/// absorbs them, and overflow is dropped rather than blocking a worker.
fn send_status(status: &mpsc::Sender<String>, id: &str, phase: &str) {
    let _ = status.try_send(format!("[{id}] {phase}..."));
}
