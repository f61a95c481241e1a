// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level project configuration as read from a YAML file.
///
/// This is a direct mapping of the config format:
///
/// ```yaml
/// terraform:
///   path: /usr/local/bin/terraform
///   version: ">= 0.11"
/// hooks:
///   startup:
///     - ./scripts/prepare.sh
/// modules:
///   - name: app
///     sourceDir: terraform/app
///     dependencies: [database]
///     variables:
///       - name: aws_region
///         filter: true
///       - name: environment
///         values: [dev, staging, prod]
///         filter: true
/// ```
///
/// All sections except `modules` are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Provisioner defaults from `terraform:`.
    #[serde(default)]
    pub terraform: TerraformDefaults,

    /// Project-level hooks from `hooks:`.
    #[serde(default)]
    pub hooks: ProjectHooks,

    /// Module declarations, in file order.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl ProjectConfig {
    /// Look up a module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// `terraform:` section: where to find the binary and which versions are
/// acceptable. The version constraint is carried verbatim; matching against
/// an installed binary is the concern of an external tool.
#[derive(Debug, Clone, Deserialize)]
pub struct TerraformDefaults {
    #[serde(default = "default_terraform_path")]
    pub path: String,

    #[serde(default)]
    pub version: Option<String>,
}

fn default_terraform_path() -> String {
    "terraform".to_string()
}

impl Default for TerraformDefaults {
    fn default() -> Self {
        Self {
            path: default_terraform_path(),
            version: None,
        }
    }
}

/// `hooks:` section at the project level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectHooks {
    /// Shell commands run once per session, before any execution starts.
    /// Variables they export are visible to later hooks and to terraform.
    #[serde(default)]
    pub startup: Vec<String>,
}

/// One `modules:` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Unique module name within the project.
    pub name: String,

    /// Path to the module's source tree, relative to the project root.
    #[serde(rename = "sourceDir")]
    pub source_dir: PathBuf,

    /// Declared variables, in declaration order. Order matters: it drives
    /// both Cartesian expansion and the execution id.
    #[serde(default)]
    pub variables: Vec<VariableDecl>,

    /// Names of modules whose executions must complete before this module's.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub hooks: ModuleHooks,

    /// Optional backend descriptor, rendered verbatim for the provisioner.
    #[serde(rename = "remoteState", default)]
    pub remote_state: Option<RemoteState>,
}

impl ModuleConfig {
    /// The declared variable with the given name, if any.
    pub fn variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Whether this module declares a variable with the given name.
    pub fn declares(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Identity-contributing variables, in declaration order. Their values
    /// form the execution id together with the module name.
    pub fn identity_variables(&self) -> impl Iterator<Item = &VariableDecl> {
        self.variables.iter().filter(|v| v.filter)
    }
}

/// Per-module hooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleHooks {
    /// Shell commands run in the execution's working directory before
    /// `terraform init`. Each may export environment variables consumed by
    /// later steps.
    #[serde(rename = "preModuleRun", default)]
    pub pre_module_run: Vec<String>,
}

/// One declared module variable.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableDecl {
    pub name: String,

    /// Value used when the user supplies none and no `values` whitelist
    /// exists.
    #[serde(default)]
    pub default: Option<String>,

    /// Whitelist of allowed values. A non-empty whitelist with no user value
    /// fans the module out into one execution per entry.
    #[serde(default)]
    pub values: Vec<String>,

    /// Marks this variable as identity-contributing: its value becomes part
    /// of the execution id.
    #[serde(default)]
    pub filter: bool,
}

impl VariableDecl {
    /// Whether `value` is allowed by this declaration's whitelist.
    /// Everything is allowed when no whitelist exists.
    pub fn allows(&self, value: &str) -> bool {
        self.values.is_empty() || self.values.iter().any(|v| v == value)
    }
}

/// Backend descriptor passed to the provisioner as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteState {
    pub backend: String,

    #[serde(default)]
    pub config: BTreeMap<String, String>,
}
