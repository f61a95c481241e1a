// src/terraform/process.rs

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{AstroError, Result};

/// Raw outcome of a terraform child process.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, -1 when the process died to a signal.
    pub code: i32,
    pub runtime: Duration,
    /// Whether the process was killed because the session was cancelled.
    pub interrupted: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.interrupted
    }
}

/// Spawn the terraform binary and wait for it, honoring cancellation.
///
/// On cancellation the child is killed and waited for; its partial output is
/// still captured so the caller can attach it to the execution's result.
pub(crate) async fn run(
    binary: &str,
    args: &[String],
    work_dir: &Path,
    env: &HashMap<String, String>,
    token: &CancellationToken,
) -> Result<ProcessOutput> {
    debug!(
        binary = %binary,
        args = ?args,
        dir = %work_dir.display(),
        "spawning terraform"
    );

    let start = Instant::now();
    let mut child = Command::new(binary)
        .args(args)
        .current_dir(work_dir)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(AstroError::io(format!("spawning {binary}")))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(read_pipe(stdout_pipe));
    let stderr_task = tokio::spawn(read_pipe(stderr_pipe));

    let (status, interrupted) = tokio::select! {
        status = child.wait() => {
            let status = status.map_err(AstroError::io(format!("waiting for {binary}")))?;
            (status, false)
        }
        _ = token.cancelled() => {
            warn!(binary = %binary, "cancellation: killing terraform child");
            let _ = child.start_kill();
            let status = child
                .wait()
                .await
                .map_err(AstroError::io(format!("waiting for killed {binary}")))?;
            (status, true)
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let code = status.code().unwrap_or(-1);

    debug!(binary = %binary, code, interrupted, "terraform exited");

    Ok(ProcessOutput {
        stdout,
        stderr,
        code,
        runtime: start.elapsed(),
        interrupted,
    })
}

async fn read_pipe<R>(pipe: Option<R>) -> String
where
    R: AsyncRead + Unpin + Send,
{
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf).await;
    }
    buf
}
