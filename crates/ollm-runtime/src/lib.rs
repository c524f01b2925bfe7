//! # ollm-runtime
//!
//! The context manager and the tiered compression engine.
//!
//! [`context::ContextManager`] owns the live conversation and is its only
//! mutating API: appends, streaming accumulation, snapshot/restore, mode
//! changes, and the budget decisions that drive compression and automatic
//! snapshots. [`compression::CompressionEngine`] reduces the token
//! footprint by summarising older non-preserved messages into checkpoints
//! under the per-tier policies, never touching preserved content.
//!
//! Ownership follows a single owner-graph: the manager holds the engine,
//! the snapshot store, and the prompt inputs; observers (UI, session
//! recorder) see state changes only through the event bus.

#![deny(unsafe_code)]

pub mod compression;
pub mod context;
pub mod errors;
pub mod vram;

pub use compression::{CompressionEngine, CompressionEngineConfig, CompressionOutcome};
pub use context::{ContextConfig, ContextManager, SessionDeps};
pub use errors::{ContextError, Result};
pub use vram::VramMonitor;
