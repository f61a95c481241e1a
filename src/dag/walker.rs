// src/dag/walker.rs

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dag::graph::ExecutionGraph;
use crate::expand::BoundExecution;

/// Walk the graph, invoking `visit` once per execution.
///
/// Executions whose predecessors have all completed successfully are
/// dispatched together, bounded by `width` concurrent visits. A visit
/// returns whether the execution succeeded; after a failed visit, none of
/// the vertex's transitive dependents are ever dispatched. Once `token` is
/// cancelled no further vertex starts; visits in flight run to completion.
pub async fn walk<F>(graph: ExecutionGraph, width: usize, token: CancellationToken, visit: F)
where
    F: Fn(BoundExecution) -> BoxFuture<'static, bool> + Send + Sync + 'static,
{
    let (vertices, successors, predecessors) = graph.into_parts();
    let total = vertices.len();

    let mut pending: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut vertices: Vec<Option<BoundExecution>> = vertices.into_iter().map(Some).collect();

    let visit = Arc::new(visit);
    let semaphore = Arc::new(Semaphore::new(width));
    let mut join: JoinSet<(usize, bool)> = JoinSet::new();
    let mut started = 0usize;

    for index in 0..total {
        if pending[index] == 0 {
            dispatch(index, &mut vertices, &visit, &semaphore, &token, &mut join);
            started += 1;
        }
    }

    while let Some(joined) = join.join_next().await {
        let (index, ok) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "graph visit task aborted");
                continue;
            }
        };

        if !ok {
            // Dependents keep an unresolved predecessor forever, so they can
            // never be dispatched.
            warn!(
                dependents = successors[index].len(),
                "execution failed; dependents will be skipped"
            );
            continue;
        }

        for &next in &successors[index] {
            pending[next] -= 1;
            if pending[next] == 0 && !token.is_cancelled() {
                dispatch(next, &mut vertices, &visit, &semaphore, &token, &mut join);
                started += 1;
            }
        }
    }

    debug!(total, started, skipped = total - started, "graph walk finished");
}

fn dispatch<F>(
    index: usize,
    vertices: &mut [Option<BoundExecution>],
    visit: &Arc<F>,
    semaphore: &Arc<Semaphore>,
    token: &CancellationToken,
    join: &mut JoinSet<(usize, bool)>,
) where
    F: Fn(BoundExecution) -> BoxFuture<'static, bool> + Send + Sync + 'static,
{
    let execution = vertices[index]
        .take()
        .expect("graph vertex dispatched twice");
    let visit = Arc::clone(visit);
    let semaphore = Arc::clone(semaphore);
    let token = token.clone();

    join.spawn(async move {
        let _permit = match semaphore.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return (index, false),
        };
        // A vertex that became ready while waiting for a slot must not start
        // after cancellation.
        if token.is_cancelled() {
            return (index, false);
        }
        let ok = visit(execution).await;
        (index, ok)
    });
}
