// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ProjectConfig;
use crate::errors::{AstroError, Result};

/// Run semantic validation against a loaded project configuration.
///
/// This checks:
/// - there is at least one module
/// - module names are unique
/// - every `dependencies` entry refers to an existing module (and not itself)
/// - variable names are unique within their module
/// - declared defaults satisfy the `values` whitelist
/// - the module dependency relation has no cycles
pub fn validate_config(cfg: &ProjectConfig) -> Result<()> {
    ensure_has_modules(cfg)?;
    validate_module_names(cfg)?;
    validate_dependencies(cfg)?;
    validate_variables(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_modules(cfg: &ProjectConfig) -> Result<()> {
    if cfg.modules.is_empty() {
        return Err(AstroError::Validation(
            "project must declare at least one module".to_string(),
        ));
    }
    Ok(())
}

fn validate_module_names(cfg: &ProjectConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for module in &cfg.modules {
        if !seen.insert(module.name.as_str()) {
            return Err(AstroError::Validation(format!(
                "duplicate module name {:?}",
                module.name
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &ProjectConfig) -> Result<()> {
    for module in &cfg.modules {
        for dep in &module.dependencies {
            if cfg.module(dep).is_none() {
                return Err(AstroError::Validation(format!(
                    "module {:?} depends on unknown module {:?}",
                    module.name, dep
                )));
            }
            if dep == &module.name {
                return Err(AstroError::Validation(format!(
                    "module {:?} cannot depend on itself",
                    module.name
                )));
            }
        }
    }
    Ok(())
}

fn validate_variables(cfg: &ProjectConfig) -> Result<()> {
    for module in &cfg.modules {
        let mut seen = HashSet::new();
        for var in &module.variables {
            if !seen.insert(var.name.as_str()) {
                return Err(AstroError::Validation(format!(
                    "module {:?} declares variable {:?} more than once",
                    module.name, var.name
                )));
            }

            if let Some(default) = &var.default {
                if !var.allows(default) {
                    return Err(AstroError::Validation(format!(
                        "default {:?} for variable {:?} of module {:?} is not in its allowed values",
                        default, var.name, module.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &ProjectConfig) -> Result<()> {
    // Edge direction: dependency -> dependent. A topological sort fails iff
    // there is a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for module in &cfg.modules {
        graph.add_node(module.name.as_str());
    }

    for module in &cfg.modules {
        for dep in &module.dependencies {
            graph.add_edge(dep.as_str(), module.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AstroError::CyclicGraph(cycle.node_id().to_string())),
    }
}
