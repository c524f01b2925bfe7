//! # ollm-hooks
//!
//! Lifecycle event dispatch to external processes under a hash-pinned
//! approval model with resource limits.
//!
//! At each of the nine lifecycle events the [`runner::HookRunner`] looks up
//! registered hooks, checks the [`trust::TrustStore`], spawns each approved
//! hook as a child process with a JSON document on stdin, parses one JSON
//! document from stdout, and enforces a timeout and a combined output cap.
//! Hook failures are never fatal: every anomaly is folded into a synthetic
//! `{continue: true, error: ...}` output and dispatch moves on. The only
//! signal that short-circuits the caller is an explicit `continue: false`.

#![deny(unsafe_code)]

pub mod context;
pub mod discovery;
pub mod errors;
pub mod registry;
pub mod runner;
pub mod trust;
pub mod types;
pub mod validate;

pub use context::HookContext;
pub use errors::{HookError, Result};
pub use registry::HookRegistry;
pub use runner::{ApprovalCallback, HookRunner, HookRunnerConfig};
pub use trust::{HookApproval, TrustStore};
pub use types::{AggregatedOutcome, Hook, HookEvent, HookExecution, HookOutput, HookSource};
