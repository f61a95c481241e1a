// src/config/mod.rs

//! Project configuration loading and validation.
//!
//! Responsibilities:
//! - Define the YAML-backed data model (`model.rs`).
//! - Load a project file from disk (`loader.rs`).
//! - Validate semantic invariants like dependency correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{find_config_file, load_and_validate, load_from_path, DEFAULT_CONFIG_NAME};
pub use model::{
    ModuleConfig, ModuleHooks, ProjectConfig, ProjectHooks, RemoteState, TerraformDefaults,
    VariableDecl,
};
pub use validate::validate_config;
