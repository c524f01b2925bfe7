//! Snapshot store errors.

use std::path::PathBuf;

use ollm_core::ids::SnapshotId;

/// Result alias for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Errors raised by the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// No snapshot exists under the id.
    #[error("snapshot not found: {0}")]
    NotFound(SnapshotId),

    /// A snapshot file exists but does not parse.
    #[error("snapshot file {path} is corrupt: {source}")]
    Corrupt {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The filesystem reported no space.
    #[error("storage full writing {path}")]
    StorageFull {
        /// File path.
        path: PathBuf,
    },

    /// Any other I/O failure, after retries.
    #[error("snapshot i/o on {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be serialised.
    #[error("failed to serialise snapshot: {0}")]
    Serialise(#[from] serde_json::Error),
}

impl SnapshotError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        // ENOSPC gets its own kind so callers can tell the user to free space.
        if source.raw_os_error() == Some(28) {
            Self::StorageFull { path }
        } else {
            Self::Io { path, source }
        }
    }
}
