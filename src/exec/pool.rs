// src/exec/pool.rs

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run the given futures with at most `width` in flight at once, returning
/// when all of them have finished.
///
/// Cancellation is cooperative: futures that have not yet started when
/// `token` fires are dropped unpolled, while futures already running are
/// allowed to finish. Each future owns its own error reporting; the pool
/// surfaces nothing.
pub async fn run_parallel(
    token: CancellationToken,
    width: usize,
    futures: Vec<BoxFuture<'static, ()>>,
) {
    let total = futures.len();
    let semaphore = Arc::new(Semaphore::new(width));
    let mut join: JoinSet<()> = JoinSet::new();

    for future in futures {
        let semaphore = Arc::clone(&semaphore);
        let token = token.clone();
        join.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            if token.is_cancelled() {
                debug!("pool cancelled; dropping queued work");
                return;
            }
            future.await;
        });
    }

    while let Some(joined) = join.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "pooled task aborted");
        }
    }

    debug!(total, "parallel batch drained");
}
