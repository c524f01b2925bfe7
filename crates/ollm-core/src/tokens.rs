//! Deterministic token counting surrogate.
//!
//! Budget enforcement needs a counter that is stable across runs and does
//! not depend on a live provider. The surrogate approximates local-model
//! tokenisers at roughly four characters per token with a whitespace-word
//! floor, which overcounts slightly for prose and keeps the budget on the
//! safe side of the cap.
//!
//! When the provider can answer `count_tokens` exactly, its figure wins at
//! the call site; everything else goes through the [`CountTokens`] trait.

use crate::messages::{Message, MessagePart};

/// Characters per token assumed by the surrogate.
pub const CHARS_PER_TOKEN: u32 = 4;

/// Fixed per-message framing overhead (role tag and separators).
pub const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// Anything that can turn text into a token count.
pub trait CountTokens: Send + Sync {
    /// Count tokens in `text`. Must be deterministic for a given input.
    fn count(&self, text: &str) -> u32;
}

/// The character-ratio surrogate counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurrogateCounter;

impl CountTokens for SurrogateCounter {
    fn count(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as u32;
        let words = text.split_whitespace().count() as u32;
        chars.div_ceil(CHARS_PER_TOKEN).max(words)
    }
}

/// Count a full message: every part plus the framing overhead.
///
/// Structured parts are counted over their JSON serialisation, matching
/// what the provider actually receives.
pub fn count_message(counter: &dyn CountTokens, message: &Message) -> u32 {
    let mut total = MESSAGE_OVERHEAD_TOKENS;
    for part in message.parts() {
        total += match part {
            MessagePart::Text { text } => counter.count(text),
            MessagePart::ToolCall {
                name, arguments, ..
            } => counter.count(name) + counter.count(&arguments.to_string()),
            MessagePart::ToolResult { content, .. } => counter.count(&content.to_string()),
        };
    }
    total
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
