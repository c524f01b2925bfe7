//! # ollm-snapshots
//!
//! Crash-safe persistence of recoverable conversation states.
//!
//! A [`ContextSnapshot`] is an immutable value: once written it is never
//! mutated in place. The store keeps one JSON file per snapshot, a
//! per-session ordered metadata index, and a root id→session map for O(1)
//! lookup. Either index can be lost or torn: the next open reconciles by
//! scanning session directories, so a crash between the snapshot write and
//! the index updates orphans nothing.

#![deny(unsafe_code)]

pub mod errors;
pub mod store;
pub mod types;

pub use errors::{Result, SnapshotError};
pub use store::SnapshotStore;
pub use types::{ContextSnapshot, SnapshotMetadata};
