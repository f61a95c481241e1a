// src/session/signal.rs

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Subscribe a session token to interrupt/terminate signals.
///
/// On receipt the handler prints the cancellation notice once and trips the
/// token; everything else (killing children, draining workers) follows from
/// token observation. The background task also exits when the token is
/// cancelled by other means.
pub(crate) fn subscribe(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            name = wait_for_signal() => {
                if let Some(name) = name {
                    println!("\nReceived signal: {name}, cancelling all operations...");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {
                debug!("signal subscription released");
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> Option<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).ok()?;
    let mut terminate = signal(SignalKind::terminate()).ok()?;

    tokio::select! {
        _ = interrupt.recv() => Some("interrupt"),
        _ = terminate.recv() => Some("terminated"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Option<&'static str> {
    tokio::signal::ctrl_c().await.ok()?;
    Some("interrupt")
}
