// src/terraform/result.rs

use std::time::Duration;

/// Captured outcome of one terraform subcommand.
#[derive(Debug, Clone)]
pub struct TerraformOutput {
    command: String,
    stdout: String,
    stderr: String,
    runtime: Duration,
    has_changes: bool,
}

impl TerraformOutput {
    pub(crate) fn new(
        command: impl Into<String>,
        stdout: String,
        stderr: String,
        runtime: Duration,
        has_changes: bool,
    ) -> Self {
        Self {
            command: command.into(),
            stdout,
            stderr,
            runtime,
            has_changes,
        }
    }

    /// The subcommand this output came from (`init`, `plan`, ...).
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Wall-clock duration of the child process.
    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    /// For plan results: whether the plan reported pending changes.
    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// For plan results with changes: the textual change description.
    pub fn changes(&self) -> Option<&str> {
        self.has_changes.then_some(self.stdout.as_str())
    }
}
