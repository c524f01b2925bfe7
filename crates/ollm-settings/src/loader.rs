//! Settings loading and merging.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::Settings;

/// Resolve the state root directory (`~/.ollm`, or `OLLM_STATE_ROOT`).
pub fn state_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("OLLM_STATE_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var("HOME").map_err(|_| SettingsError::NoHome)?;
    Ok(PathBuf::from(home).join(".ollm"))
}

/// Path of the user settings file.
pub fn settings_path() -> Result<PathBuf> {
    Ok(state_root()?.join("settings.json"))
}

/// Recursively merge `overlay` over `base`.
///
/// Objects merge key-wise; any other value in `overlay` replaces the base
/// value outright (arrays included).
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides applied.
///
/// A missing file is not an error: defaults are used.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path()?)
}

/// Load settings from a specific file path.
///
/// Layering: compiled defaults ← file (deep-merged) ← `OLLM_*` env vars.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        let file: Value = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        deep_merge(defaults, file)
    } else {
        defaults
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Apply `OLLM_*` environment variable overrides (highest priority layer).
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(url) = std::env::var("OLLM_OLLAMA_URL") {
        settings.provider.ollama.url = url;
    }
    if let Ok(host) = std::env::var("OLLM_OLLAMA_HOST") {
        settings.provider.ollama.host = host;
    }
    if let Ok(port) = std::env::var("OLLM_OLLAMA_PORT") {
        match port.parse() {
            Ok(port) => settings.provider.ollama.port = port,
            Err(_) => tracing::warn!(port, "ignoring non-numeric OLLM_OLLAMA_PORT"),
        }
    }
    if let Ok(v) = std::env::var("OLLM_OLLAMA_AUTO_START") {
        settings.provider.ollama.auto_start = is_truthy(&v);
    }
    if let Ok(v) = std::env::var("OLLM_TRUST_WORKSPACE") {
        settings.hooks.trust_workspace = is_truthy(&v);
    }
    if let Ok(ms) = std::env::var("OLLM_HOOK_TIMEOUT_MS") {
        match ms.parse() {
            Ok(ms) => settings.hooks.timeout_ms = ms,
            Err(_) => tracing::warn!(ms, "ignoring non-numeric OLLM_HOOK_TIMEOUT_MS"),
        }
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "yes" | "on")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
