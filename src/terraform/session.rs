// src/terraform/session.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RemoteState;
use crate::errors::{AstroError, Result};
use crate::expand::BoundExecution;
use crate::terraform::process::{self, ProcessOutput};
use crate::terraform::result::TerraformOutput;

/// Name of the rendered backend descriptor inside a working tree.
const BACKEND_FILE: &str = "astro_backend.tf.json";

/// Name of the session-local state file written by `detach`.
const LOCAL_STATE_FILE: &str = "terraform.tfstate";

/// Driver for one execution's terraform invocations.
pub struct TerraformSession {
    execution_id: String,
    binary: String,
    work_dir: PathBuf,
    vars: Vec<(String, String)>,
    env: HashMap<String, String>,
    token: CancellationToken,
}

impl TerraformSession {
    /// Prepare the working tree for an execution: create the directory, link
    /// the module sources into it, write the variables file (exactly the
    /// module-declared variables, nothing else) and the backend descriptor.
    pub async fn new(
        binary: &str,
        project_root: &Path,
        execution: &BoundExecution,
        env: HashMap<String, String>,
        token: CancellationToken,
    ) -> Result<Self> {
        let work_dir = execution.work_dir().to_path_buf();
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(AstroError::io(format!(
                "creating working directory {}",
                work_dir.display()
            )))?;

        let source_dir = project_root.join(&execution.module_config().source_dir);
        link_sources(&source_dir, &work_dir).await?;

        let vars: Vec<(String, String)> = execution
            .variables()
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        write_tfvars(&work_dir, &vars).await?;

        if let Some(remote) = &execution.module_config().remote_state {
            write_backend(&work_dir, remote).await?;
        }

        debug!(execution = %execution.id(), dir = %work_dir.display(), "working tree ready");

        Ok(Self {
            execution_id: execution.id().to_string(),
            binary: binary.to_string(),
            work_dir,
            vars,
            env,
            token,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub async fn init(&self) -> Result<TerraformOutput> {
        let output = self
            .run(&["init".into(), "-input=false".into()])
            .await?;
        self.finish("init", output, false)
    }

    /// `plan -detailed-exitcode`: exit 0 means no changes, exit 2 means the
    /// plan carries changes; anything else is a failure.
    pub async fn plan(&self) -> Result<TerraformOutput> {
        let mut args = vec![
            "plan".to_string(),
            "-input=false".to_string(),
            "-detailed-exitcode".to_string(),
        ];
        args.extend(self.var_args());

        let output = self.run(&args).await?;
        if output.code == 2 && !output.interrupted {
            return Ok(TerraformOutput::new(
                "plan",
                output.stdout,
                output.stderr,
                output.runtime,
                true,
            ));
        }
        self.finish("plan", output, false)
    }

    pub async fn apply(&self) -> Result<TerraformOutput> {
        let mut args = vec![
            "apply".to_string(),
            "-input=false".to_string(),
            "-auto-approve".to_string(),
        ];
        args.extend(self.var_args());

        let output = self.run(&args).await?;
        self.finish("apply", output, false)
    }

    /// Disconnect this execution from its remote state: pull the current
    /// state into the working tree and rewrite the backend to a local one
    /// pointing at it.
    pub async fn detach(&self) -> Result<TerraformOutput> {
        let output = self
            .run(&["state".into(), "pull".into()])
            .await?;
        let output = self.finish("state pull", output, false)?;

        let state_path = self.work_dir.join(LOCAL_STATE_FILE);
        tokio::fs::write(&state_path, output.stdout())
            .await
            .map_err(AstroError::io(format!(
                "writing local state {}",
                state_path.display()
            )))?;

        let local = json!({
            "terraform": {
                "backend": {
                    "local": { "path": LOCAL_STATE_FILE }
                }
            }
        });
        tokio::fs::write(
            self.work_dir.join(BACKEND_FILE),
            serde_json::to_vec_pretty(&local).expect("backend json"),
        )
        .await
        .map_err(AstroError::io("rewriting backend to local state"))?;

        debug!(execution = %self.execution_id, "remote state disconnected");
        Ok(output)
    }

    async fn run(&self, args: &[String]) -> Result<ProcessOutput> {
        process::run(&self.binary, args, &self.work_dir, &self.env, &self.token).await
    }

    fn finish(
        &self,
        command: &str,
        output: ProcessOutput,
        has_changes: bool,
    ) -> Result<TerraformOutput> {
        if output.success() {
            Ok(TerraformOutput::new(
                command,
                output.stdout,
                output.stderr,
                output.runtime,
                has_changes,
            ))
        } else {
            Err(AstroError::Provisioner {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    fn var_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.vars.len() * 2);
        for (name, value) in &self.vars {
            args.push("-var".to_string());
            args.push(format!("{name}={value}"));
        }
        args
    }
}

async fn link_sources(source_dir: &Path, work_dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(source_dir)
        .await
        .map_err(AstroError::io(format!(
            "reading module sources {}",
            source_dir.display()
        )))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(AstroError::io("listing module sources"))?
    {
        let target = work_dir.join(entry.file_name());
        if tokio::fs::symlink_metadata(&target).await.is_ok() {
            continue;
        }

        #[cfg(unix)]
        tokio::fs::symlink(entry.path(), &target)
            .await
            .map_err(AstroError::io(format!(
                "linking {} into working tree",
                entry.path().display()
            )))?;

        #[cfg(not(unix))]
        {
            // No symlinks: copy plain files, leave directories behind.
            let path = entry.path();
            if path.is_file() {
                tokio::fs::copy(&path, &target)
                    .await
                    .map_err(AstroError::io(format!(
                        "copying {} into working tree",
                        path.display()
                    )))?;
            }
        }
    }

    Ok(())
}

async fn write_tfvars(work_dir: &Path, vars: &[(String, String)]) -> Result<()> {
    let mut contents = String::new();
    for (name, value) in vars {
        contents.push_str(&format!("{name} = {value:?}\n"));
    }

    let path = work_dir.join("terraform.tfvars");
    tokio::fs::write(&path, contents)
        .await
        .map_err(AstroError::io(format!(
            "writing variables file {}",
            path.display()
        )))
}

async fn write_backend(work_dir: &Path, remote: &RemoteState) -> Result<()> {
    let mut backend = serde_json::Map::new();
    backend.insert(
        remote.backend.clone(),
        serde_json::to_value(&remote.config).expect("backend config json"),
    );
    let descriptor = json!({
        "terraform": {
            "backend": backend
        }
    });

    let path = work_dir.join(BACKEND_FILE);
    tokio::fs::write(
        &path,
        serde_json::to_vec_pretty(&descriptor).expect("backend json"),
    )
    .await
    .map_err(AstroError::io(format!(
        "writing backend descriptor {}",
        path.display()
    )))
}
