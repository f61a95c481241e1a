// src/expand/set.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ModuleConfig;

/// A fully-specified mapping from variable name to value, in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAssignment {
    pairs: Vec<(String, String)>,
}

impl VariableAssignment {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// An intent to run the provisioner once: a module plus one variable
/// assignment. Not yet tied to a session.
#[derive(Debug, Clone)]
pub struct UnboundExecution {
    module: Arc<ModuleConfig>,
    vars: VariableAssignment,
    id: String,
}

impl UnboundExecution {
    pub fn new(module: Arc<ModuleConfig>, vars: VariableAssignment) -> Self {
        let id = execution_id(&module, &vars);
        Self { module, vars, id }
    }

    /// Deterministic identifier: the module name followed by the values of
    /// the identity variables, joined by `-` in declaration order.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn module_config(&self) -> &Arc<ModuleConfig> {
        &self.module
    }

    pub fn variables(&self) -> &VariableAssignment {
        &self.vars
    }

    /// Tie this execution to a working directory under `session_root`.
    pub fn bind(self, session_root: &Path) -> BoundExecution {
        let work_dir = session_root.join(&self.id);
        BoundExecution {
            module: self.module,
            vars: self.vars,
            id: self.id,
            work_dir,
        }
    }
}

fn execution_id(module: &ModuleConfig, vars: &VariableAssignment) -> String {
    let mut parts = vec![module.name.clone()];
    for decl in module.identity_variables() {
        if let Some(value) = vars.get(&decl.name) {
            parts.push(value.to_string());
        }
    }
    parts.join("-")
}

/// An execution bound to a concrete identifier and working directory.
#[derive(Debug, Clone)]
pub struct BoundExecution {
    module: Arc<ModuleConfig>,
    vars: VariableAssignment,
    id: String,
    work_dir: PathBuf,
}

impl BoundExecution {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn module_config(&self) -> &Arc<ModuleConfig> {
        &self.module
    }

    pub fn variables(&self) -> &VariableAssignment {
        &self.vars
    }

    /// Values of this execution's identity variables, keyed by name. Used to
    /// match dependency executions across modules.
    pub fn identity(&self) -> HashMap<&str, &str> {
        self.module
            .identity_variables()
            .filter_map(|decl| self.vars.get(&decl.name).map(|v| (decl.name.as_str(), v)))
            .collect()
    }
}

/// A set of bound executions plus an index by module name, as needed for
/// dependency graph construction.
#[derive(Debug, Clone)]
pub struct ExecutionSet {
    executions: Vec<BoundExecution>,
    by_module: HashMap<String, Vec<usize>>,
}

impl ExecutionSet {
    pub fn new(executions: Vec<BoundExecution>) -> Self {
        let mut by_module: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, e) in executions.iter().enumerate() {
            by_module
                .entry(e.module_config().name.clone())
                .or_default()
                .push(i);
        }
        Self {
            executions,
            by_module,
        }
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundExecution> {
        self.executions.iter()
    }

    pub fn get(&self, index: usize) -> &BoundExecution {
        &self.executions[index]
    }

    /// Indices of all executions expanded from the named module.
    pub fn of_module(&self, name: &str) -> &[usize] {
        self.by_module.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_executions(self) -> Vec<BoundExecution> {
        self.executions
    }
}
