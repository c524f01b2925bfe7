//! Tiered conversation compression.

mod engine;
mod summary;

pub use engine::{CompressionEngine, CompressionEngineConfig, CompressionOutcome};
pub use summary::StructuredSummary;
