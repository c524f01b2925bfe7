//! Settings document types.
//!
//! Field names mirror the on-disk `settings.json` (camelCase). Every struct
//! carries serde defaults so a partial user file deep-merges cleanly over
//! the compiled defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root settings document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Document version.
    pub version: String,
    /// Provider transport configuration.
    pub provider: ProviderSettings,
    /// Global tool enable/disable map, keyed by tool id.
    pub tools: BTreeMap<String, bool>,
    /// Per-mode tool overrides, keyed by mode name then tool id.
    pub tools_by_mode: BTreeMap<String, BTreeMap<String, bool>>,
    /// Context budget knobs.
    pub context: ContextSettings,
    /// Hook execution knobs.
    pub hooks: HookSettings,
    /// Snapshot retention knobs.
    pub snapshots: SnapshotSettings,
    /// Event bus knobs.
    pub events: EventSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1".into(),
            provider: ProviderSettings::default(),
            tools: BTreeMap::new(),
            tools_by_mode: BTreeMap::new(),
            context: ContextSettings::default(),
            hooks: HookSettings::default(),
            snapshots: SnapshotSettings::default(),
            events: EventSettings::default(),
        }
    }
}

/// Provider transport configuration.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// The local inference daemon.
    pub ollama: OllamaSettings,
}

/// Connection details for the local inference daemon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OllamaSettings {
    /// Start the daemon if it is not already running.
    pub auto_start: bool,
    /// Host name.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Full base URL; takes precedence over host/port when set.
    pub url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            auto_start: true,
            host: "127.0.0.1".into(),
            port: 11_434,
            url: "http://127.0.0.1:11434".into(),
        }
    }
}

/// Context budget knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Usage ratio at which automatic compression fires.
    pub compression_threshold: f64,
    /// Usage ratio for the `auto_85pct` snapshot.
    pub snapshot_soft_threshold: f64,
    /// Usage ratio for the `auto_95pct` snapshot and overflow warning.
    pub snapshot_hard_threshold: f64,
    /// Minimum seconds between automatic compressions.
    pub compression_cooldown_secs: u64,
    /// Provider call timeout in seconds.
    pub provider_timeout_secs: u64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            compression_threshold: 0.80,
            snapshot_soft_threshold: 0.85,
            snapshot_hard_threshold: 0.95,
            compression_cooldown_secs: 60,
            provider_timeout_secs: 120,
        }
    }
}

/// Hook execution knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookSettings {
    /// Trust workspace-sourced hooks without per-hook approval.
    pub trust_workspace: bool,
    /// Per-hook timeout in milliseconds.
    pub timeout_ms: u64,
    /// Combined stdout+stderr cap in bytes.
    pub output_cap_bytes: usize,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            trust_workspace: false,
            timeout_ms: 30_000,
            output_cap_bytes: 1_048_576,
        }
    }
}

/// Snapshot retention knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSettings {
    /// Most-recent snapshots kept per session.
    pub max_count: usize,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self { max_count: 10 }
    }
}

/// Event bus knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventSettings {
    /// Bounded history ring size.
    pub history_size: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            history_size: 1_024,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_knobs() {
        let s = Settings::default();
        assert!((s.context.compression_threshold - 0.80).abs() < f64::EPSILON);
        assert!((s.context.snapshot_soft_threshold - 0.85).abs() < f64::EPSILON);
        assert!((s.context.snapshot_hard_threshold - 0.95).abs() < f64::EPSILON);
        assert_eq!(s.context.compression_cooldown_secs, 60);
        assert_eq!(s.context.provider_timeout_secs, 120);
        assert_eq!(s.hooks.timeout_ms, 30_000);
        assert_eq!(s.hooks.output_cap_bytes, 1_048_576);
        assert!(!s.hooks.trust_workspace);
        assert_eq!(s.snapshots.max_count, 10);
        assert_eq!(s.events.history_size, 1_024);
        assert_eq!(s.provider.ollama.port, 11_434);
        assert!(s.provider.ollama.auto_start);
    }

    #[test]
    fn camel_case_wire_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json["toolsByMode"].is_object());
        assert!(json["context"]["compressionThreshold"].is_number());
        assert!(json["hooks"]["trustWorkspace"].is_boolean());
        assert!(json["provider"]["ollama"]["autoStart"].is_boolean());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let s: Settings =
            serde_json::from_value(serde_json::json!({"hooks": {"trustWorkspace": true}}))
                .unwrap();
        assert!(s.hooks.trust_workspace);
        assert_eq!(s.hooks.timeout_ms, 30_000);
        assert_eq!(s.snapshots.max_count, 10);
    }
}
