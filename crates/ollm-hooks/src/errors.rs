//! Hook subsystem errors.
//!
//! Most runner anomalies are folded into synthetic [`crate::HookOutput`]s
//! rather than surfaced as errors; this enum covers the paths that stay
//! host-side (trust store persistence, command validation).

use std::path::PathBuf;

/// Result alias for hook operations.
pub type Result<T> = std::result::Result<T, HookError>;

/// Errors raised by the hook subsystem.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The command failed validation and will never be spawned.
    #[error("invalid hook command: {reason}")]
    InvalidCommand {
        /// Why it was rejected.
        reason: String,
    },

    /// Trust store file I/O failed.
    #[error("trust store i/o on {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Trust store serialisation failed.
    #[error("trust store serialisation: {0}")]
    Serialise(#[from] serde_json::Error),

    /// The hook's pinned content could not be hashed.
    #[error("cannot hash hook source {path}: {source}")]
    Hash {
        /// Script path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
