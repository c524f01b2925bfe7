//! Compression checkpoints.
//!
//! A [`Checkpoint`] replaces a contiguous span of non-preserved messages with
//! a compressor-authored summary plus structured preservation fields. The
//! [`CheckpointStore`] keeps checkpoints totally ordered by creation time
//! with non-overlapping ranges, and answers the age/merge policy questions
//! the compression engine asks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CheckpointId;
use crate::messages::{Message, Role};

/// Maximum hierarchical checkpoint level.
pub const MAX_CHECKPOINT_LEVEL: u8 = 5;

/// Inclusive span of original message order values a checkpoint replaces.
///
/// Bounds are the `timestamp` order values of the first and last replaced
/// message, which stay stable as messages are removed around them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRange {
    /// Order value of the first replaced message.
    pub first: u64,
    /// Order value of the last replaced message.
    pub last: u64,
}

impl MessageRange {
    /// Union of two adjacent ranges (used by hierarchical merging).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }
}

/// A compressor-authored summary of a replaced message span.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Unique id.
    pub id: CheckpointId,
    /// Hierarchy level, 1 for first-generation summaries; merging two
    /// checkpoints produces `max(level) + 1`, capped at
    /// [`MAX_CHECKPOINT_LEVEL`].
    pub level: u8,
    /// Which original messages this checkpoint replaces.
    pub range: MessageRange,
    /// Free-text summary body.
    pub summary: String,
    /// Token count of the replaced span before summarisation.
    pub original_tokens: u32,
    /// Token count of the summary as it is sent to the provider.
    pub current_tokens: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last time the compressor re-read this checkpoint (merging).
    pub last_accessed_at: DateTime<Utc>,
    /// Decisions the summariser was instructed to carry forward verbatim.
    pub key_decisions: Vec<String>,
    /// Files reported as modified in the replaced span.
    pub files_modified: Vec<String>,
    /// Open follow-ups reported by the summariser.
    pub next_steps: Vec<String>,
}

impl Checkpoint {
    /// Render the checkpoint as the provider-visible summary message.
    ///
    /// Structured fields are re-embedded under fixed headings so that
    /// hierarchical merging can carry them forward verbatim.
    #[must_use]
    pub fn as_message(&self) -> Message {
        let mut body = format!("[Earlier conversation, summarised]\n{}", self.summary);
        push_section(&mut body, "Key decisions", &self.key_decisions);
        push_section(&mut body, "Files modified", &self.files_modified);
        push_section(&mut body, "Next steps", &self.next_steps);

        let mut msg = Message::text(Role::System, body);
        msg.checkpoint_id = Some(self.id.clone());
        msg.timestamp = self.range.first;
        msg.set_token_count(self.current_tokens);
        msg
    }

    /// Whether this checkpoint has aged out without being re-read.
    #[must_use]
    pub fn is_aged(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > max_age && self.last_accessed_at <= self.created_at
    }
}

fn push_section(body: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    body.push_str("\n\n");
    body.push_str(heading);
    body.push(':');
    for item in items {
        body.push_str("\n- ");
        body.push_str(item);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CheckpointStore
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered in-memory collection of checkpoints.
///
/// Order is creation order, which coincides with range order: every new
/// first-generation checkpoint covers messages strictly after the previous
/// one, and merged checkpoints inherit the position (and creation time) of
/// the older of the pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointStore {
    items: Vec<Checkpoint>,
}

impl CheckpointStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.items.iter()
    }

    /// Sum of `current_tokens` across all checkpoints.
    #[must_use]
    pub fn total_current_tokens(&self) -> u32 {
        self.items.iter().map(|c| c.current_tokens).sum()
    }

    /// Append a checkpoint at the newest position.
    pub fn push(&mut self, checkpoint: Checkpoint) {
        debug_assert!(
            self.items
                .last()
                .is_none_or(|prev| prev.range.last < checkpoint.range.first),
            "checkpoint ranges must be non-overlapping and ascending"
        );
        self.items.push(checkpoint);
    }

    /// Remove and return the two oldest checkpoints for merging.
    ///
    /// Returns `None` when fewer than two exist.
    pub fn pop_oldest_pair(&mut self) -> Option<(Checkpoint, Checkpoint)> {
        if self.items.len() < 2 {
            return None;
        }
        let older = self.items.remove(0);
        let newer = self.items.remove(0);
        Some((older, newer))
    }

    /// Insert a merged checkpoint back at the oldest position.
    pub fn insert_front(&mut self, checkpoint: Checkpoint) {
        self.items.insert(0, checkpoint);
    }

    /// Whether any checkpoint has aged out (see [`Checkpoint::is_aged`]).
    #[must_use]
    pub fn has_aged(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.items.iter().any(|c| c.is_aged(max_age, now))
    }

    /// Render all checkpoints as provider-visible messages, oldest first.
    #[must_use]
    pub fn as_messages(&self) -> Vec<Message> {
        self.items.iter().map(Checkpoint::as_message).collect()
    }

    /// Drop every checkpoint (conversation rollover).
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Ranges are non-overlapping and ascending.
    #[must_use]
    pub fn ranges_are_ordered(&self) -> bool {
        self.items
            .windows(2)
            .all(|w| w[0].range.last < w[1].range.first)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(first: u64, last: u64, tokens: u32) -> Checkpoint {
        let now = Utc::now();
        Checkpoint {
            id: CheckpointId::generate(),
            level: 1,
            range: MessageRange { first, last },
            summary: "summary".into(),
            original_tokens: tokens * 4,
            current_tokens: tokens,
            created_at: now,
            last_accessed_at: now,
            key_decisions: vec![],
            files_modified: vec![],
            next_steps: vec![],
        }
    }

    #[test]
    fn totals_sum_current_tokens() {
        let mut store = CheckpointStore::new();
        store.push(checkpoint(0, 4, 100));
        store.push(checkpoint(5, 9, 50));
        assert_eq!(store.total_current_tokens(), 150);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn pop_oldest_pair_in_order() {
        let mut store = CheckpointStore::new();
        store.push(checkpoint(0, 4, 10));
        store.push(checkpoint(5, 9, 10));
        store.push(checkpoint(10, 14, 10));
        let (older, newer) = store.pop_oldest_pair().unwrap();
        assert_eq!(older.range.first, 0);
        assert_eq!(newer.range.first, 5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn pop_oldest_pair_needs_two() {
        let mut store = CheckpointStore::new();
        assert!(store.pop_oldest_pair().is_none());
        store.push(checkpoint(0, 4, 10));
        assert!(store.pop_oldest_pair().is_none());
    }

    #[test]
    fn range_union() {
        let a = MessageRange { first: 0, last: 4 };
        let b = MessageRange { first: 5, last: 9 };
        assert_eq!(a.union(b), MessageRange { first: 0, last: 9 });
    }

    #[test]
    fn ranges_ordered_check() {
        let mut store = CheckpointStore::new();
        store.push(checkpoint(0, 4, 10));
        store.push(checkpoint(5, 9, 10));
        assert!(store.ranges_are_ordered());
    }

    #[test]
    fn aged_requires_no_access_since_creation() {
        let mut cp = checkpoint(0, 4, 10);
        cp.created_at = Utc::now() - Duration::hours(2);
        cp.last_accessed_at = cp.created_at;
        assert!(cp.is_aged(Duration::hours(1), Utc::now()));

        // Re-read since creation: no longer a candidate
        cp.last_accessed_at = Utc::now();
        assert!(!cp.is_aged(Duration::hours(1), Utc::now()));
    }

    #[test]
    fn fresh_checkpoint_is_not_aged() {
        let cp = checkpoint(0, 4, 10);
        assert!(!cp.is_aged(Duration::hours(1), Utc::now()));
    }

    #[test]
    fn as_message_carries_checkpoint_id_and_tokens() {
        let cp = checkpoint(3, 8, 42);
        let msg = cp.as_message();
        assert_eq!(msg.checkpoint_id, Some(cp.id.clone()));
        assert_eq!(msg.cached_tokens(), Some(42));
        assert_eq!(msg.timestamp, 3);
        assert!(msg.body_text().contains("summary"));
    }

    #[test]
    fn as_message_embeds_structured_fields() {
        let mut cp = checkpoint(0, 4, 10);
        cp.key_decisions = vec!["use sqlite".into()];
        cp.files_modified = vec!["src/main.rs".into()];
        cp.next_steps = vec!["add tests".into()];
        let body = cp.as_message().body_text();
        assert!(body.contains("Key decisions:\n- use sqlite"));
        assert!(body.contains("Files modified:\n- src/main.rs"));
        assert!(body.contains("Next steps:\n- add tests"));
    }
}
