// src/session/mod.rs

//! Session management and the concurrent runner.
//!
//! A session is the runtime envelope for one `plan`/`apply` call: a
//! timestamped directory under the project's session repository, an OS signal
//! subscription, and a cancellation token shared with every worker.
//!
//! - [`repo`] owns the on-disk layout and session creation.
//! - [`signal`] turns SIGINT/SIGTERM into token cancellation.
//! - [`runner`] drives the executions, flat or graph-ordered, multiplexing
//!   status and results onto two channels.

pub mod repo;
pub mod runner;
pub mod signal;

pub use repo::{generate_session_id, Session, SessionRepo, SESSION_REPO_DIR};
pub use runner::{ExecutionResult, WORKER_POOL_WIDTH};
