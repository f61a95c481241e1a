// src/errors.rs

//! Crate-wide error types.
//!
//! Errors fall into two groups: configuration-time failures (config parsing,
//! validation, unknown/missing variable values, dependency cycles) which are
//! returned synchronously from `Project::plan` / `Project::apply`, and
//! per-execution failures (hooks, terraform, IO) which are delivered on the
//! result channel attached to the owning [`crate::ExecutionResult`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstroError {
    #[error("unable to find config file")]
    ConfigNotFound,

    #[error("reading config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid project config: {0}")]
    Validation(String),

    #[error("unknown value {value:?} for variable {variable:?} of module {module:?}")]
    UnknownValue {
        module: String,
        variable: String,
        value: String,
    },

    #[error("missing value for variable {variable:?} of module {module:?}")]
    MissingValue { module: String, variable: String },

    #[error("cycle detected in dependency graph involving {0:?}")]
    CyclicGraph(String),

    #[error("error running PreModuleRun hook: {0}")]
    Hook(String),

    #[error("error running startup hook: {0}")]
    StartupHook(String),

    /// Non-zero exit from a terraform subcommand. A child killed by
    /// cancellation surfaces here with exit code -1.
    #[error("terraform {command} failed with exit code {code}: {stderr}")]
    Provisioner {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl AstroError {
    /// Adapter for `map_err` on IO results that records what was being done.
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> AstroError {
        let context = context.into();
        move |source| AstroError::Io { context, source }
    }
}

pub type Result<T> = std::result::Result<T, AstroError>;
