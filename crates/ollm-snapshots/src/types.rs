//! Snapshot document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ollm_core::conversation::Conversation;
use ollm_core::events::SnapshotTrigger;
use ollm_core::ids::{SessionId, SnapshotId};

/// An immutable, on-disk serialisation of a complete conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    /// Globally unique id.
    pub id: SnapshotId,
    /// Owning session.
    pub session_id: SessionId,
    /// The complete conversation state.
    pub conversation: Conversation,
    /// What caused the snapshot.
    pub trigger: SnapshotTrigger,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Capture a conversation.
    #[must_use]
    pub fn capture(conversation: &Conversation, trigger: SnapshotTrigger) -> Self {
        Self {
            id: SnapshotId::generate(),
            session_id: conversation.session_id.clone(),
            conversation: conversation.clone(),
            trigger,
            created_at: Utc::now(),
        }
    }

    /// Metadata entry for the per-session index.
    #[must_use]
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            id: self.id.clone(),
            trigger: self.trigger,
            created_at: self.created_at,
            token_total: self.conversation.total_tokens(0),
            message_count: self.conversation.message_count(),
        }
    }
}

/// One entry of `snapshots-index.json`. Enough to answer `list` without
/// opening snapshot files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Snapshot id.
    pub id: SnapshotId,
    /// What caused it.
    pub trigger: SnapshotTrigger,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Conversation tokens at capture (messages + checkpoints).
    pub token_total: u32,
    /// Message count at capture.
    pub message_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
