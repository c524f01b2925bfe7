//! Model profile errors.

use std::path::PathBuf;

/// Result alias for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Errors raised by the profile registry.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The requested model id is not in the registry.
    #[error("unknown model: {0}")]
    ModelUnknown(String),

    /// The profiles file could not be read or written.
    #[error("profile file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The profiles file is not valid.
    #[error("failed to parse profile file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}
