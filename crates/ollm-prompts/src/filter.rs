//! Mode-based tool filtering.
//!
//! Given the user's global tool enable map and per-mode overrides, decide
//! which registered tool ids a mode may see. Write-class tools are removed
//! wholesale when the model's write capability is unknown or disabled.

use std::collections::BTreeMap;

use ollm_core::conversation::Mode;

/// Default tool surface for assistant mode.
const ASSISTANT_DEFAULTS: &[&str] = &["read_file", "web_search", "web_fetch"];

/// Default tool surface for planning mode: read-only plus web.
const PLANNING_DEFAULTS: &[&str] = &[
    "read_file",
    "list_dir",
    "grep_search",
    "web_search",
    "web_fetch",
];

/// Tools removed when the model cannot be trusted to mutate the host.
const WRITE_CLASS: &[&str] = &["shell", "write_file", "edit_file", "delete_file"];

/// Compute the tool ids visible to `mode`.
///
/// `registered` is every id in the tool registry. A tool is globally
/// enabled unless the global map says `false`. Per-mode overrides apply
/// after the mode's default surface; `user` mode starts from nothing but
/// its overrides.
#[must_use]
pub fn allowed_tool_ids(
    mode: Mode,
    registered: &[String],
    global: &BTreeMap<String, bool>,
    by_mode: &BTreeMap<String, BTreeMap<String, bool>>,
    write_capable: bool,
) -> Vec<String> {
    let globally_enabled = |id: &str| global.get(id).copied().unwrap_or(true);

    let mut allowed: Vec<String> = match mode {
        Mode::Developer | Mode::Debugger => registered
            .iter()
            .filter(|id| globally_enabled(id))
            .cloned()
            .collect(),
        Mode::Assistant => intersect_defaults(registered, ASSISTANT_DEFAULTS, &globally_enabled),
        Mode::Planning => intersect_defaults(registered, PLANNING_DEFAULTS, &globally_enabled),
        Mode::User => Vec::new(),
    };

    if let Some(overrides) = by_mode.get(mode.as_str()) {
        for (id, &enabled) in overrides {
            if enabled {
                if !allowed.contains(id) && registered.contains(id) && globally_enabled(id) {
                    allowed.push(id.clone());
                }
            } else {
                allowed.retain(|a| a != id);
            }
        }
    }

    if !write_capable {
        allowed.retain(|id| !WRITE_CLASS.contains(&id.as_str()));
    }

    allowed.sort();
    allowed
}

fn intersect_defaults(
    registered: &[String],
    defaults: &[&str],
    globally_enabled: &impl Fn(&str) -> bool,
) -> Vec<String> {
    registered
        .iter()
        .filter(|id| defaults.contains(&id.as_str()) && globally_enabled(id))
        .cloned()
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
