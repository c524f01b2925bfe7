//! The live conversation and its classification enums.
//!
//! A [`Conversation`] exclusively owns its message and checkpoint sequences.
//! All mutation goes through the context manager; this type only provides
//! the data operations and token arithmetic the manager composes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::ids::SessionId;
use crate::messages::{Message, Role};
use crate::tokens::{CountTokens, count_message};

/// Operational persona of the agent. Governs tool filtering and the
/// system-prompt template choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Conversational default with a minimal tool surface.
    Assistant,
    /// Full tool surface for software work.
    Developer,
    /// Full tool surface, diagnosis-oriented template.
    Debugger,
    /// Read-only plus web tools.
    Planning,
    /// Entirely user-configured tool surface.
    User,
}

impl Mode {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Developer => "developer",
            Self::Debugger => "debugger",
            Self::Planning => "planning",
            Self::User => "user",
        }
    }
}

/// Conversation size class. Fixed for the life of a session; selects
/// compression budgets and prompt templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Tier 1, the smallest contexts.
    Minimal,
    /// Tier 2.
    Basic,
    /// Tier 3.
    Standard,
    /// Tier 4.
    Premium,
    /// Tier 5, the largest contexts.
    Ultra,
}

impl Tier {
    /// All tiers, ascending.
    pub const ALL: [Self; 5] = [
        Self::Minimal,
        Self::Basic,
        Self::Standard,
        Self::Premium,
        Self::Ultra,
    ];

    /// Numeric level, 1 through 5.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Minimal => 1,
            Self::Basic => 2,
            Self::Standard => 3,
            Self::Premium => 4,
            Self::Ultra => 5,
        }
    }

    /// Token budget for one compressor summary.
    #[must_use]
    pub fn summary_budget_tokens(self) -> u32 {
        match self {
            Self::Minimal => 400,
            Self::Basic => 700,
            Self::Standard => 1_000,
            Self::Premium => 1_500,
            Self::Ultra => 2_000,
        }
    }

    /// Maximum live checkpoints before hierarchical merging kicks in.
    #[must_use]
    pub fn checkpoint_cap(self) -> usize {
        match self {
            Self::Minimal => 2,
            Self::Basic => 4,
            Self::Standard => 6,
            Self::Premium => 8,
            Self::Ultra => 12,
        }
    }

    /// Default compression strategy for the tier.
    #[must_use]
    pub fn default_strategy(self) -> Strategy {
        match self {
            Self::Minimal => Strategy::Hybrid,
            _ => Strategy::Summarize,
        }
    }

    /// Age after which an unread checkpoint becomes a merge candidate.
    #[must_use]
    pub fn checkpoint_max_age(self) -> Duration {
        match self {
            Self::Minimal => Duration::hours(1),
            Self::Basic => Duration::hours(3),
            Self::Standard => Duration::hours(6),
            Self::Premium => Duration::hours(12),
            Self::Ultra => Duration::hours(24),
        }
    }
}

/// How a compression pass reduced the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Drop oldest non-preserved messages until usage is under target.
    Truncate,
    /// Summarise the compressible span into a checkpoint.
    Summarize,
    /// Summarise the oldest half, truncate any remainder over target.
    Hybrid,
}

impl Strategy {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Truncate => "truncate",
            Self::Summarize => "summarize",
            Self::Hybrid => "hybrid",
        }
    }
}

/// One entry of the conversation's compression history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionEvent {
    /// When the pass completed.
    pub at: DateTime<Utc>,
    /// Conversation tokens (messages + checkpoints) before.
    pub from_tokens: u32,
    /// Conversation tokens after.
    pub to_tokens: u32,
    /// Strategy that ran.
    pub strategy: Strategy,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

/// The live conversation state for one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Session identifier.
    pub session_id: SessionId,
    /// Ordered messages. Compressed spans have been removed; preserved
    /// messages inside compressed regions remain in place.
    messages: Vec<Message>,
    /// Checkpoints covering the compressed prefix.
    pub checkpoints: CheckpointStore,
    /// Operational mode. The only classification that may change mid-session.
    pub mode: Mode,
    /// Size class, fixed at session creation.
    pub tier: Tier,
    /// Identifier into the model profile registry.
    pub model_id: String,
    /// Hard token ceiling sent to the provider. Never changes.
    pub effective_cap_tokens: u32,
    /// Ordered compression history.
    pub compression_history: Vec<CompressionEvent>,
    /// Next message order value.
    next_seq: u64,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        model_id: impl Into<String>,
        tier: Tier,
        mode: Mode,
        effective_cap_tokens: u32,
    ) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            checkpoints: CheckpointStore::new(),
            mode,
            tier,
            model_id: model_id.into(),
            effective_cap_tokens,
            compression_history: Vec::new(),
            next_seq: 0,
        }
    }

    /// Append a message, assigning its order value.
    ///
    /// The first system message of the conversation is marked preserved.
    pub fn push(&mut self, mut message: Message) -> &Message {
        message.timestamp = self.next_seq;
        self.next_seq += 1;
        if message.role == Role::System && !self.messages.iter().any(|m| m.role == Role::System) {
            message.preserved = true;
        }
        self.messages.push(message);
        self.messages.last().expect("just pushed")
    }

    /// All messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Mutable access to the newest message (streaming accumulation).
    pub fn last_message_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    /// Replace the message sequence (compression install, snapshot restore).
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Number of messages currently held.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Fill every missing message token cache using `counter`.
    pub fn ensure_counted(&mut self, counter: &dyn CountTokens) {
        for msg in &mut self.messages {
            if msg.cached_tokens().is_none() {
                let tokens = count_message(counter, msg);
                msg.set_token_count(tokens);
            }
        }
    }

    /// Sum of cached message token counts.
    ///
    /// Callers recount via [`Self::ensure_counted`] first; uncounted
    /// messages contribute zero.
    #[must_use]
    pub fn message_tokens(&self) -> u32 {
        self.messages
            .iter()
            .filter_map(Message::cached_tokens)
            .sum()
    }

    /// Conversation total: messages + checkpoints + the given system prompt.
    #[must_use]
    pub fn total_tokens(&self, system_prompt_tokens: u32) -> u32 {
        self.message_tokens() + self.checkpoints.total_current_tokens() + system_prompt_tokens
    }

    /// Usage ratio of the total against the effective cap.
    #[must_use]
    pub fn usage(&self, system_prompt_tokens: u32) -> f64 {
        if self.effective_cap_tokens == 0 {
            return 0.0;
        }
        f64::from(self.total_tokens(system_prompt_tokens)) / f64::from(self.effective_cap_tokens)
    }

    /// Record a completed compression pass.
    pub fn record_compression(&mut self, event: CompressionEvent) {
        self.compression_history.push(event);
    }

    /// The order value the next pushed message will receive.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
