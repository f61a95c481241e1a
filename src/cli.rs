// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::errors::{AstroError, Result};
use crate::{ExecutionParameters, UserVariables};

/// Command-line arguments for `astro`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "astro",
    version,
    about = "Run terraform across a matrix of modules, environments and variables.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (YAML).
    ///
    /// Default: `astro.yaml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASTRO_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Plan all selected executions in parallel.
    Plan {
        /// Disconnect remote state into the session directory before
        /// planning.
        #[arg(long)]
        detach: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Apply all selected executions, ordered by module dependencies.
    Apply {
        /// Ignore dependencies and apply everything in parallel.
        #[arg(long)]
        no_graph: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },
}

/// Execution selection flags shared by the subcommands.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Restrict the run to these modules.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    pub modules: Vec<String>,

    /// A user variable value, e.g. `--var aws_region=east1`.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Like `--var`, but also restricts the run to modules declaring the
    /// variable.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Turn the raw selection flags into [`ExecutionParameters`].
pub fn execution_parameters(selection: &SelectionArgs) -> Result<ExecutionParameters> {
    let mut user_vars = UserVariables::default();

    for raw in &selection.vars {
        let (key, value) = split_var(raw)?;
        user_vars.values.insert(key.to_string(), value.to_string());
    }

    for raw in &selection.filters {
        let (key, value) = split_var(raw)?;
        user_vars.values.insert(key.to_string(), value.to_string());
        user_vars.filters.insert(key.to_string(), true);
    }

    Ok(ExecutionParameters {
        module_names: selection.modules.clone(),
        user_vars,
    })
}

fn split_var(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| {
            AstroError::Validation(format!("expected KEY=VALUE, got {raw:?}"))
        })
}
