// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod display;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod logging;
pub mod session;
pub mod terraform;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::ProjectConfig;
use crate::dag::ExecutionGraph;
use crate::errors::{AstroError, Result};
use crate::session::runner::{self, RunContext};
use crate::session::{ExecutionResult, SessionRepo, SESSION_REPO_DIR};

/// Variable values supplied at invocation time.
///
/// `values` holds the concrete assignments. A variable present in `filters`
/// with a `true` value is restrictive: it pins the variable to the supplied
/// value *and* narrows the run to modules that declare it.
#[derive(Debug, Clone, Default)]
pub struct UserVariables {
    pub values: HashMap<String, String>,
    pub filters: HashMap<String, bool>,
}

/// Selection shared by plan and apply.
#[derive(Debug, Clone, Default)]
pub struct ExecutionParameters {
    /// When non-empty, only these modules are expanded.
    pub module_names: Vec<String>,
    pub user_vars: UserVariables,
}

#[derive(Debug, Clone, Default)]
pub struct PlanExecutionParameters {
    pub execution: ExecutionParameters,
    /// Disconnect each execution from its remote state before planning.
    pub detach: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyExecutionParameters {
    pub execution: ExecutionParameters,
    /// Skip dependency ordering and apply everything through the flat pool.
    pub no_graph: bool,
}

/// A loaded, validated project. Constructed once per process; every
/// [`Project::plan`] / [`Project::apply`] call runs in a fresh session.
pub struct Project {
    pub config: ProjectConfig,
    root: PathBuf,
    repo: SessionRepo,
}

impl Project {
    /// Load a project from its YAML file. The session repository lives in
    /// `.astro` next to the config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = config::load_and_validate(path)?;

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let root = root.canonicalize().map_err(AstroError::io(format!(
            "resolving project root {}",
            root.display()
        )))?;

        let repo = SessionRepo::open(root.join(SESSION_REPO_DIR))?;

        debug!(root = %root.display(), "project loaded");
        Ok(Self { config, root, repo })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Plan the selected executions concurrently.
    ///
    /// Configuration-time failures (unknown or missing variable values,
    /// startup hook errors) are returned synchronously; everything later is
    /// delivered per-execution on the result channel. The result channel
    /// closing is the end-of-stream signal.
    pub async fn plan(
        &self,
        params: PlanExecutionParameters,
    ) -> Result<(mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>)> {
        let (ctx, set) = self.prepare(&params.execution).await?;
        Ok(runner::plan(ctx, set, params.detach))
    }

    /// Apply the selected executions, ordered by their dependency graph
    /// unless `no_graph` is set.
    pub async fn apply(
        &self,
        params: ApplyExecutionParameters,
    ) -> Result<(mpsc::Receiver<String>, mpsc::Receiver<ExecutionResult>)> {
        let (ctx, set) = self.prepare(&params.execution).await?;

        if params.no_graph {
            Ok(runner::apply_flat(ctx, set))
        } else {
            let graph = ExecutionGraph::build(&set)?;
            Ok(runner::apply_graph(ctx, graph))
        }
    }

    /// Expand the execution set and spin up the session it will run in.
    async fn prepare(
        &self,
        params: &ExecutionParameters,
    ) -> Result<(Arc<RunContext>, expand::ExecutionSet)> {
        let unbound = expand::expand(&self.config, params)?;

        let session = Arc::new(self.repo.new_session()?);
        session.run_startup_hooks(&self.config.hooks.startup).await?;

        let set = expand::bind_all(unbound, session.path());
        let ctx = Arc::new(RunContext {
            session,
            project_root: self.root.clone(),
            terraform_binary: self.config.terraform.path.clone(),
        });

        Ok((ctx, set))
    }
}

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    let config_path = config::find_config_file(&cwd, args.config.as_deref().map(Path::new))?;
    let project = Project::from_config_file(&config_path)?;

    match args.command {
        Command::Plan {
            detach,
            ref selection,
        } => {
            let execution = cli::execution_parameters(selection)?;
            let (status, results) = project
                .plan(PlanExecutionParameters { execution, detach })
                .await?;
            Ok(display::render(status, results).await)
        }
        Command::Apply {
            no_graph,
            ref selection,
        } => {
            let execution = cli::execution_parameters(selection)?;
            let (status, results) = project
                .apply(ApplyExecutionParameters {
                    execution,
                    no_graph,
                })
                .await?;
            Ok(display::render(status, results).await)
        }
    }
}
