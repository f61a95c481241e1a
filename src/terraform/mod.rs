// src/terraform/mod.rs

//! Provisioner wrapper.
//!
//! One [`TerraformSession`] owns a single execution's working tree: it links
//! the module sources into place, writes the variables file and backend
//! descriptor, and drives `terraform init`/`plan`/`apply`/`detach` as child
//! processes under the session's cancellation token.

pub mod process;
pub mod result;
pub mod session;

pub use result::TerraformOutput;
pub use session::TerraformSession;
