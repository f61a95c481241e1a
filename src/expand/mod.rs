// src/expand/mod.rs

//! Execution-set generation.
//!
//! Turning a project configuration plus user variables into concrete
//! executions happens in three steps:
//!
//! - [`resolver`] computes, per module, the list of candidate values for each
//!   declared variable.
//! - [`cartesian`] enumerates every combination of those candidates.
//! - [`set`] holds the execution types; combinations are projected onto the
//!   module's identity variables, deduplicated, and finally bound to a
//!   working directory inside a session.

pub mod cartesian;
pub mod resolver;
pub mod set;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::ProjectConfig;
use crate::errors::Result;
use crate::ExecutionParameters;

pub use cartesian::cartesian;
pub use set::{BoundExecution, ExecutionSet, UnboundExecution, VariableAssignment};

/// Expand a project into the set of executions selected by `params`.
///
/// Modules excluded by `params.module_names` are skipped entirely, as are
/// modules that do not declare a variable the user marked as a restrictive
/// filter. Within a module, combinations that project onto the same identity
/// are collapsed to the first one emitted.
pub fn expand(
    project: &ProjectConfig,
    params: &ExecutionParameters,
) -> Result<Vec<UnboundExecution>> {
    let mut out = Vec::new();

    for module in &project.modules {
        if !params.module_names.is_empty()
            && !params.module_names.iter().any(|n| n == &module.name)
        {
            debug!(module = %module.name, "module not selected; skipping");
            continue;
        }

        // A restrictive filter narrows the run to modules that declare the
        // filtered variable.
        if params
            .user_vars
            .filters
            .iter()
            .any(|(name, on)| *on && !module.declares(name))
        {
            debug!(module = %module.name, "module misses a filtered variable; skipping");
            continue;
        }

        let module = Arc::new(module.clone());
        let candidates = resolver::resolve(&module, &params.user_vars)?;
        let combos = cartesian(&candidates);

        debug!(
            module = %module.name,
            combinations = combos.len(),
            "expanded variable combinations"
        );

        let mut seen_ids: HashSet<String> = HashSet::new();
        for combo in combos {
            // Defensive: the resolver only emits legal values, but a
            // combination that escapes the whitelist must never run.
            let legal = module
                .variables
                .iter()
                .zip(&combo)
                .all(|(decl, value)| decl.allows(value));
            if !legal {
                continue;
            }

            let vars = VariableAssignment::new(
                module
                    .variables
                    .iter()
                    .map(|decl| decl.name.clone())
                    .zip(combo)
                    .collect(),
            );

            let execution = UnboundExecution::new(Arc::clone(&module), vars);
            if seen_ids.insert(execution.id().to_string()) {
                out.push(execution);
            }
        }
    }

    Ok(out)
}

/// Bind every execution to a working directory under `session_root`.
pub fn bind_all(unbound: Vec<UnboundExecution>, session_root: &Path) -> ExecutionSet {
    ExecutionSet::new(
        unbound
            .into_iter()
            .map(|e| e.bind(session_root))
            .collect(),
    )
}
