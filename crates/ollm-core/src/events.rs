//! Bus event payloads.
//!
//! Every publisher in the workspace emits [`BusEvent`] values; subscribers
//! match on [`BusEvent::name`] patterns. The UI and the session recorder are
//! pure subscribers, so each payload carries everything an observer needs
//! without a back-pointer into runtime state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::{Mode, Strategy, Tier};
use crate::ids::{SessionId, SnapshotId};
use crate::messages::Message;

/// What caused a snapshot to be taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotTrigger {
    /// Automatic snapshot at the 85% usage threshold.
    #[serde(rename = "auto_85pct")]
    Auto85Pct,
    /// Automatic snapshot at the 95% usage threshold.
    #[serde(rename = "auto_95pct")]
    Auto95Pct,
    /// Caller-requested snapshot.
    #[serde(rename = "manual")]
    Manual,
    /// Snapshot taken before replacing the conversation.
    #[serde(rename = "pre_rollover")]
    PreRollover,
}

/// Events published on the in-process bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A session was opened.
    SessionStart {
        /// Session.
        session_id: SessionId,
        /// Resolved model.
        model_id: String,
        /// Fixed tier.
        tier: Tier,
        /// Initial mode.
        mode: Mode,
    },
    /// A session ended.
    SessionEnd {
        /// Session.
        session_id: SessionId,
    },
    /// A message reached the conversation. Carries the complete
    /// pre-compression message; the session recorder relies on this being
    /// emitted exactly once per message and never rewritten.
    MessageAppended {
        /// Session.
        session_id: SessionId,
        /// The full message as appended.
        message: Message,
    },
    /// A compression pass completed and changed the conversation.
    CompressionTriggered {
        /// Session.
        session_id: SessionId,
        /// Conversation tokens before.
        from_tokens: u32,
        /// Conversation tokens after.
        to_tokens: u32,
        /// Strategy that ran.
        strategy: Strategy,
    },
    /// A snapshot was persisted.
    SnapshotCreated {
        /// Session.
        session_id: SessionId,
        /// New snapshot.
        snapshot_id: SnapshotId,
        /// Why it was taken.
        trigger: SnapshotTrigger,
    },
    /// A snapshot replaced the live conversation.
    SnapshotRestored {
        /// Session.
        session_id: SessionId,
        /// Restored snapshot.
        snapshot_id: SnapshotId,
    },
    /// The operational mode changed.
    ModeChanged {
        /// Session.
        session_id: SessionId,
        /// New mode.
        mode: Mode,
    },
    /// Usage crossed the 95% threshold after compression.
    PreOverflowWarning {
        /// Session.
        session_id: SessionId,
        /// Usage ratio at emission.
        usage: f64,
    },
    /// One hook finished (or was skipped) during event dispatch.
    HookExecuted {
        /// Registered hook id.
        hook_id: String,
        /// Hook display name.
        hook_name: String,
        /// Lifecycle event dispatched.
        event: String,
        /// Wall-clock duration in milliseconds (zero when skipped).
        duration_ms: u64,
        /// Whether the hook allowed the operation to continue.
        #[serde(rename = "continue")]
        continue_: bool,
        /// Diagnostic recorded on the output, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Data the hook returned for merging into event context.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Available VRAM fell below the active profile's estimate. The context
    /// size does not change; this is informational only.
    LowMemoryWarning {
        /// Session.
        session_id: SessionId,
        /// GB reported available.
        available_gb: f64,
        /// GB the active context profile expects.
        estimated_gb: f64,
    },
}

impl BusEvent {
    /// Stable event name used for subscription patterns.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => names::SESSION_START,
            Self::SessionEnd { .. } => names::SESSION_END,
            Self::MessageAppended { .. } => names::MESSAGE_APPENDED,
            Self::CompressionTriggered { .. } => names::COMPRESSION_TRIGGERED,
            Self::SnapshotCreated { .. } => names::SNAPSHOT_CREATED,
            Self::SnapshotRestored { .. } => names::SNAPSHOT_RESTORED,
            Self::ModeChanged { .. } => names::MODE_CHANGED,
            Self::PreOverflowWarning { .. } => names::PRE_OVERFLOW_WARNING,
            Self::HookExecuted { .. } => names::HOOK_EXECUTED,
            Self::LowMemoryWarning { .. } => names::LOW_MEMORY_WARNING,
        }
    }
}

/// Event name constants for subscribers.
pub mod names {
    /// `session_start`
    pub const SESSION_START: &str = "session_start";
    /// `session_end`
    pub const SESSION_END: &str = "session_end";
    /// `message_appended`
    pub const MESSAGE_APPENDED: &str = "message_appended";
    /// `compression_triggered`
    pub const COMPRESSION_TRIGGERED: &str = "compression_triggered";
    /// `snapshot_created`
    pub const SNAPSHOT_CREATED: &str = "snapshot_created";
    /// `snapshot_restored`
    pub const SNAPSHOT_RESTORED: &str = "snapshot_restored";
    /// `mode_changed`
    pub const MODE_CHANGED: &str = "mode_changed";
    /// `pre_overflow_warning`
    pub const PRE_OVERFLOW_WARNING: &str = "pre_overflow_warning";
    /// `hook_executed`
    pub const HOOK_EXECUTED: &str = "hook_executed";
    /// `low_memory_warning`
    pub const LOW_MEMORY_WARNING: &str = "low_memory_warning";
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        let ev = BusEvent::SessionEnd {
            session_id: SessionId::from_string("sess-1"),
        };
        assert_eq!(ev.name(), "session_end");
    }

    #[test]
    fn trigger_wire_names() {
        assert_eq!(
            serde_json::to_string(&SnapshotTrigger::Auto85Pct).unwrap(),
            "\"auto_85pct\""
        );
        assert_eq!(
            serde_json::to_string(&SnapshotTrigger::PreRollover).unwrap(),
            "\"pre_rollover\""
        );
    }

    #[test]
    fn tagged_serialisation() {
        let ev = BusEvent::PreOverflowWarning {
            session_id: SessionId::from_string("sess-1"),
            usage: 0.96,
        };
        let v: Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "pre_overflow_warning");
        assert_eq!(v["usage"], 0.96);
    }

    #[test]
    fn hook_executed_continue_rename() {
        let ev = BusEvent::HookExecuted {
            hook_id: "hook-1".into(),
            hook_name: "fmt".into(),
            event: "before_tool".into(),
            duration_ms: 12,
            continue_: false,
            error: None,
            data: None,
        };
        let v: Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["continue"], false);
        assert!(v.get("error").is_none());
    }
}
