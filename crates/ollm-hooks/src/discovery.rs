//! Hook manifest discovery.
//!
//! User and workspace hooks are declared in `*.hook.json` manifests under
//! `~/.ollm/hooks` and `<workspace>/.ollm/hooks`. Discovery order (manifest
//! path sort) fixes registration order, which in turn fixes dispatch order
//! within a source.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

use ollm_core::ids::HookId;

use crate::types::{Hook, HookEvent, HookSource};

/// One `*.hook.json` document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HookManifest {
    name: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    events: Vec<HookEvent>,
    #[serde(default)]
    source_path: Option<PathBuf>,
    #[serde(default)]
    extension_name: Option<String>,
}

/// Scan a directory for hook manifests.
///
/// Invalid manifests are skipped with a warning; a missing directory yields
/// no hooks. Results are ordered by manifest path.
#[must_use]
pub fn discover_dir(dir: &Path, source: HookSource) -> Vec<Hook> {
    let mut manifest_paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(2)
        .into_iter()
        .flatten()
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(".hook.json"))
        })
        .collect();
    manifest_paths.sort();

    let mut hooks = Vec::new();
    for path in manifest_paths {
        match load_manifest(&path, source) {
            Ok(hook) => hooks.push(hook),
            Err(reason) => {
                warn!(path = %path.display(), reason, "skipping invalid hook manifest");
            }
        }
    }
    hooks
}

fn load_manifest(path: &Path, source: HookSource) -> Result<Hook, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let manifest: HookManifest = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    if manifest.events.is_empty() {
        return Err("manifest declares no events".into());
    }

    // Pin the script the command actually runs: an explicit sourcePath, or
    // the first argument when it resolves to a file next to the manifest.
    let source_path = manifest.source_path.or_else(|| {
        manifest.args.first().and_then(|arg| {
            let candidate = if Path::new(arg).is_absolute() {
                PathBuf::from(arg)
            } else {
                path.parent()?.join(arg)
            };
            candidate.is_file().then_some(candidate)
        })
    });

    Ok(Hook {
        id: HookId::generate(),
        name: manifest.name,
        command: manifest.command,
        args: manifest.args,
        events: manifest.events,
        source,
        source_path,
        extension_name: manifest.extension_name,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_dir_yields_nothing() {
        let hooks = discover_dir(Path::new("/no/such/dir"), HookSource::User);
        assert!(hooks.is_empty());
    }

    #[test]
    fn discovers_manifests_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-second", "a-first"] {
            std::fs::write(
                dir.path().join(format!("{name}.hook.json")),
                json!({
                    "name": name,
                    "command": "sh",
                    "args": ["run.sh"],
                    "events": ["before_tool"],
                })
                .to_string(),
            )
            .unwrap();
        }

        let hooks = discover_dir(dir.path(), HookSource::Workspace);
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].name, "a-first");
        assert_eq!(hooks[1].name, "b-second");
        assert!(hooks.iter().all(|h| h.source == HookSource::Workspace));
    }

    #[test]
    fn invalid_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.hook.json"), "{not json").unwrap();
        std::fs::write(
            dir.path().join("good.hook.json"),
            json!({"name": "ok", "command": "sh", "events": ["after_tool"]}).to_string(),
        )
        .unwrap();

        let hooks = discover_dir(dir.path(), HookSource::User);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].name, "ok");
    }

    #[test]
    fn manifest_without_events_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("idle.hook.json"),
            json!({"name": "idle", "command": "sh", "events": []}).to_string(),
        )
        .unwrap();
        assert!(discover_dir(dir.path(), HookSource::User).is_empty());
    }

    #[test]
    fn script_arg_next_to_manifest_becomes_source_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.sh"), "echo hi").unwrap();
        std::fs::write(
            dir.path().join("h.hook.json"),
            json!({
                "name": "h",
                "command": "sh",
                "args": ["run.sh"],
                "events": ["before_tool"],
            })
            .to_string(),
        )
        .unwrap();

        let hooks = discover_dir(dir.path(), HookSource::User);
        assert_eq!(
            hooks[0].source_path.as_deref(),
            Some(dir.path().join("run.sh").as_path())
        );
    }

    #[test]
    fn explicit_source_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let pinned = dir.path().join("pinned.sh");
        std::fs::write(&pinned, "x").unwrap();
        std::fs::write(
            dir.path().join("h.hook.json"),
            json!({
                "name": "h",
                "command": "bash",
                "args": ["other.sh"],
                "events": ["before_tool"],
                "sourcePath": pinned,
            })
            .to_string(),
        )
        .unwrap();

        let hooks = discover_dir(dir.path(), HookSource::User);
        assert_eq!(hooks[0].source_path.as_deref(), Some(pinned.as_path()));
    }
}
