//! Runtime error taxonomy.

use ollm_core::ids::SnapshotId;
use ollm_llm::ProviderError;

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by the context manager.
///
/// Compression- and hook-level anomalies are absorbed (logged, synthetic
/// outputs); what escapes here is what the caller genuinely has to react
/// to.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The model id is not in the profile registry.
    #[error("unknown model: {0}")]
    ModelUnknown(String),

    /// The user input contains no tokens.
    #[error("empty user input")]
    EmptyInput,

    /// A stream operation arrived without an open stream.
    #[error("no assistant stream is open")]
    StreamNotOpen,

    /// An append arrived while an assistant stream is open.
    #[error("an assistant stream is in progress")]
    StreamInProgress,

    /// The conversation still exceeds the cap after compression.
    #[error("context over cap after compression: {total_tokens} of {cap_tokens} tokens")]
    OverCap {
        /// Current total.
        total_tokens: u32,
        /// The effective cap.
        cap_tokens: u32,
    },

    /// A requested snapshot id does not exist.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// A snapshot exists but cannot be restored.
    #[error("snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    /// Snapshot storage failed; the conversation is unchanged.
    #[error("snapshot failed: {0}")]
    SnapshotFailed(#[from] ollm_snapshots::SnapshotError),

    /// The compression engine broke an internal invariant. Fatal to the
    /// session.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// The provider transport failed.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),
}
