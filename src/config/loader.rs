// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ProjectConfig;
use crate::config::validate::validate_config;
use crate::errors::{AstroError, Result};

/// Default project file name, looked up in the invocation directory.
pub const DEFAULT_CONFIG_NAME: &str = "astro.yaml";

/// Load a project file from a given path and return the raw `ProjectConfig`.
///
/// This only performs YAML deserialization; it does **not** perform semantic
/// validation (dependency correctness, etc.). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| AstroError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config: ProjectConfig =
        serde_yaml::from_str(&contents).map_err(|source| AstroError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(config)
}

/// Load a project file from path and run semantic validation.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Resolve the project file to use.
///
/// With an explicit path, that path must exist. Otherwise `astro.yaml` is
/// looked up in `dir`.
pub fn find_config_file(dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    let candidate = match explicit {
        Some(p) => p.to_path_buf(),
        None => dir.join(DEFAULT_CONFIG_NAME),
    };

    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(AstroError::ConfigNotFound)
    }
}
