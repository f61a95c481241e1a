// src/expand/resolver.rs

use crate::config::ModuleConfig;
use crate::errors::{AstroError, Result};
use crate::UserVariables;

/// Compute the candidate value lists for every variable a module declares,
/// in declaration order.
///
/// Precedence per variable:
/// 1. A user-supplied value pins the variable to that single value; it must
///    satisfy the whitelist when one exists.
/// 2. Otherwise a non-empty `values` whitelist fans out into one candidate
///    per entry.
/// 3. Otherwise the declared default.
/// 4. Otherwise the variable has no value and resolution fails.
///
/// User values for variables the module does not declare are ignored; they
/// are never passed to the provisioner for this module.
pub fn resolve(module: &ModuleConfig, user: &UserVariables) -> Result<Vec<Vec<String>>> {
    let mut candidates = Vec::with_capacity(module.variables.len());

    for decl in &module.variables {
        let list = match user.values.get(&decl.name) {
            Some(value) => {
                if !decl.allows(value) {
                    return Err(AstroError::UnknownValue {
                        module: module.name.clone(),
                        variable: decl.name.clone(),
                        value: value.clone(),
                    });
                }
                vec![value.clone()]
            }
            None if !decl.values.is_empty() => decl.values.clone(),
            None => match &decl.default {
                Some(default) => vec![default.clone()],
                None => {
                    return Err(AstroError::MissingValue {
                        module: module.name.clone(),
                        variable: decl.name.clone(),
                    })
                }
            },
        };

        candidates.push(list);
    }

    Ok(candidates)
}
