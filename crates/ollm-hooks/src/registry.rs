//! The hook registry.

use std::path::Path;

use tracing::info;

use crate::discovery::discover_dir;
use crate::types::{Hook, HookEvent, HookSource};

/// All registered hooks for the process lifetime.
///
/// Hooks are registered at startup from three sources (builtin, user dir,
/// workspace dir), never modified during a session, and unregistered only
/// on shutdown.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
}

impl HookRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one hook (builtin hooks and tests).
    pub fn register(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    /// Discover and register user and workspace hooks.
    pub fn discover(&mut self, user_hooks_dir: &Path, workspace_hooks_dir: Option<&Path>) {
        let user = discover_dir(user_hooks_dir, HookSource::User);
        info!(count = user.len(), dir = %user_hooks_dir.display(), "registered user hooks");
        self.hooks.extend(user);

        if let Some(dir) = workspace_hooks_dir {
            let workspace = discover_dir(dir, HookSource::Workspace);
            info!(count = workspace.len(), dir = %dir.display(), "registered workspace hooks");
            self.hooks.extend(workspace);
        }
    }

    /// Hooks for one event, in dispatch order: source priority
    /// (builtin > user > workspace > downloaded > extension), ties by
    /// registration order.
    #[must_use]
    pub fn hooks_for(&self, event: HookEvent) -> Vec<&Hook> {
        let mut selected: Vec<&Hook> = self.hooks.iter().filter(|h| h.handles(event)).collect();
        // Stable sort keeps registration order within a source.
        selected.sort_by_key(|h| h.source.priority());
        selected
    }

    /// Total registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// All hooks in registration order.
    #[must_use]
    pub fn all(&self) -> &[Hook] {
        &self.hooks
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ollm_core::ids::HookId;

    fn hook(name: &str, source: HookSource, events: Vec<HookEvent>) -> Hook {
        Hook {
            id: HookId::generate(),
            name: name.into(),
            command: "sh".into(),
            args: vec![],
            events,
            source,
            source_path: None,
            extension_name: None,
        }
    }

    #[test]
    fn hooks_for_filters_by_event() {
        let mut registry = HookRegistry::new();
        registry.register(hook("a", HookSource::User, vec![HookEvent::BeforeTool]));
        registry.register(hook("b", HookSource::User, vec![HookEvent::AfterTool]));

        let selected = registry.hooks_for(HookEvent::BeforeTool);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "a");
    }

    #[test]
    fn dispatch_order_is_source_priority_then_registration() {
        let mut registry = HookRegistry::new();
        registry.register(hook(
            "ext",
            HookSource::Extension,
            vec![HookEvent::BeforeTool],
        ));
        registry.register(hook(
            "user-1",
            HookSource::User,
            vec![HookEvent::BeforeTool],
        ));
        registry.register(hook(
            "builtin",
            HookSource::Builtin,
            vec![HookEvent::BeforeTool],
        ));
        registry.register(hook(
            "user-2",
            HookSource::User,
            vec![HookEvent::BeforeTool],
        ));

        let names: Vec<&str> = registry
            .hooks_for(HookEvent::BeforeTool)
            .iter()
            .map(|h| h.name.as_str())
            .collect();
        assert_eq!(names, vec!["builtin", "user-1", "user-2", "ext"]);
    }

    #[test]
    fn discover_registers_both_dirs() {
        let user_dir = tempfile::tempdir().unwrap();
        let ws_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            user_dir.path().join("u.hook.json"),
            r#"{"name": "u", "command": "sh", "events": ["session_start"]}"#,
        )
        .unwrap();
        std::fs::write(
            ws_dir.path().join("w.hook.json"),
            r#"{"name": "w", "command": "sh", "events": ["session_start"]}"#,
        )
        .unwrap();

        let mut registry = HookRegistry::new();
        registry.discover(user_dir.path(), Some(ws_dir.path()));
        assert_eq!(registry.len(), 2);

        let selected = registry.hooks_for(HookEvent::SessionStart);
        assert_eq!(selected[0].source, HookSource::User);
        assert_eq!(selected[1].source, HookSource::Workspace);
    }
}
