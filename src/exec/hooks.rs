// src/exec/hooks.rs

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AstroError, Result};

/// Marker separating hook output from the environment dump appended to it.
const ENV_MARKER: &str = "__ASTRO_HOOK_ENV__";

/// Run a hook command in `dir` and return the environment it left behind.
///
/// The command runs through the platform shell with `env` extending the
/// parent environment. To observe exported variables, an environment dump is
/// chained behind the command; the dump only happens when the command itself
/// succeeded, so a failing hook reports its own exit status.
///
/// A non-zero exit maps to the returned error; stderr is included in the
/// message.
pub async fn run_hook(
    dir: &Path,
    command: &str,
    env: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    debug!(hook = %command, dir = %dir.display(), "running hook");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(format!("{command} && echo {ENV_MARKER} && set"));
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(format!("{command} && echo {ENV_MARKER} && env"));
        c
    };

    let output = cmd
        .current_dir(dir)
        .envs(env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(AstroError::io(format!("spawning hook {command:?}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(hook = %command, code = output.status.code(), "hook failed");
        return Err(AstroError::Hook(format!(
            "{:?} exited with {}: {}",
            command,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(parse_env_dump(&String::from_utf8_lossy(&output.stdout)))
}

/// Extract `KEY=VALUE` pairs from the output following the marker line.
fn parse_env_dump(stdout: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let mut in_dump = false;

    for line in stdout.lines() {
        if line.trim() == ENV_MARKER {
            in_dump = true;
            continue;
        }
        if !in_dump {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if !key.is_empty() {
                vars.insert(key.to_string(), value.to_string());
            }
        }
    }

    vars
}
