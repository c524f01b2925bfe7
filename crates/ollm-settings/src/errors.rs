//! Settings errors.

use std::path::PathBuf;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while loading or merging settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The merged document does not deserialize into [`crate::Settings`].
    #[error("settings document has an invalid shape: {0}")]
    InvalidShape(#[from] serde_json::Error),

    /// The home directory could not be resolved.
    #[error("cannot resolve home directory (HOME is unset)")]
    NoHome,
}
