//! # ollm-settings
//!
//! Layered configuration for the OLLM agent runtime.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`Settings::default()`]
//! 2. **User file**: `~/.ollm/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `OLLM_*` overrides (highest priority)
//!
//! The global singleton is reloadable: when the UI writes new values to
//! disk, [`reload_settings_from_path`] swaps the cached value so all
//! subsequent [`get_settings`] calls return fresh data. Readers hold an
//! `Arc` snapshot, so a concurrent reload never tears a read.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, state_root};
pub use types::*;

use std::path::Path;
use std::sync::{Arc, RwLock};

/// Global settings singleton.
///
/// `RwLock<Option<Arc<Settings>>>` rather than `OnceLock` so the cached
/// value can be swapped after a settings reload. Reads are a shared lock
/// plus an `Arc::clone`.
static SETTINGS: RwLock<Option<Arc<Settings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// First call loads from `~/.ollm/settings.json` with env overrides;
/// later calls return the cached value. Load failures fall back to
/// compiled defaults with a warning.
pub fn get_settings() -> Arc<Settings> {
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    // Another thread may have initialised between the locks.
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Initialise the global settings with a specific value.
///
/// Replaces any previously cached settings. Used by tests and by startup
/// paths that already resolved the settings file.
pub fn init_settings(settings: Settings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}

/// Reload settings from a specific file path and swap the global cache.
pub fn reload_settings_from_path(path: &Path) {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            Settings::default()
        }
    });
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(new);
    tracing::info!(?path, "settings reloaded from disk");
}

/// Reset the global settings cache (test-only).
#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate the global SETTINGS static hold this lock to avoid
    /// racing with each other (tests run on parallel threads).
    static SETTINGS_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn init_settings_sets_custom_value() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        let mut custom = Settings::default();
        custom.snapshots.max_count = 99;
        init_settings(custom);
        assert_eq!(get_settings().snapshots.max_count, 99);
        reset_settings();
    }

    #[test]
    fn init_settings_replaces_previous() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        let mut first = Settings::default();
        first.snapshots.max_count = 1;
        init_settings(first);
        assert_eq!(get_settings().snapshots.max_count, 1);

        let mut second = Settings::default();
        second.snapshots.max_count = 2;
        init_settings(second);
        assert_eq!(get_settings().snapshots.max_count, 2);
        reset_settings();
    }

    #[test]
    fn reload_swaps_cached_value() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        init_settings(Settings::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"snapshots": {"maxCount": 4}}"#).unwrap();
        reload_settings_from_path(&path);

        assert_eq!(get_settings().snapshots.max_count, 4);
        reset_settings();
    }

    #[test]
    fn reload_missing_file_falls_back_to_defaults_not_panic() {
        let _lock = SETTINGS_MUTEX.lock().unwrap();
        reset_settings();
        reload_settings_from_path(Path::new("/definitely/not/here.json"));
        assert_eq!(get_settings().snapshots.max_count, 10);
        reset_settings();
    }
}
