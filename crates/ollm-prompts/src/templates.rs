//! Static prompt templates.
//!
//! One persona block per mode, one sizing block per tier, composed into the
//! tier+mode template that opens every system prompt. Local models follow
//! short, imperative instructions far better than prose essays, so these
//! stay terse.

use ollm_core::conversation::{Mode, Tier};

/// Universal rules, always the second section.
pub const CORE_MANDATES: &str = "\
# Rules
- Never fabricate file contents, command output, or tool results.
- Prefer small, verifiable steps; state assumptions when you must make them.
- When a tool is available for a task, use it instead of guessing.
- Stay within the user's workspace unless explicitly directed elsewhere.";

/// Extra guardrails for the two smallest tiers, where aggressive
/// compression makes stale context more likely.
pub const SANITY_CHECKS: &str = "\
# Sanity checks
- Context is tight: re-read the latest user message before answering.
- Earlier turns may be summarised; treat summaries as authoritative history.
- If a summary conflicts with a preserved message, trust the message.";

fn mode_persona(mode: Mode) -> &'static str {
    match mode {
        Mode::Assistant => {
            "You are a capable local assistant. Answer directly and keep \
             responses grounded in what you actually know or can look up."
        }
        Mode::Developer => {
            "You are a software engineering agent working in the user's \
             workspace. Read before you write, make minimal correct changes, \
             and verify your work with the available tools."
        }
        Mode::Debugger => {
            "You are a debugging agent. Reproduce first, then isolate. Form \
             one hypothesis at a time and test it with the available tools \
             before proposing a fix."
        }
        Mode::Planning => {
            "You are in planning mode. Investigate and design; do not modify \
             anything. Produce concrete, ordered plans with file references."
        }
        Mode::User => {
            "You are a local agent configured by the user. Follow the \
             project rules section below as your primary instruction source."
        }
    }
}

fn tier_sizing(tier: Tier) -> &'static str {
    match tier {
        Tier::Minimal => {
            "Context is extremely limited. Be brief. Never repeat file \
             contents back; reference paths instead."
        }
        Tier::Basic => {
            "Context is small. Keep answers compact and avoid quoting more \
             than a few lines at a time."
        }
        Tier::Standard => "Balance thoroughness with brevity.",
        Tier::Premium => {
            "Ample context is available. Include relevant detail, but do \
             not pad."
        }
        Tier::Ultra => {
            "A large context window is available. Carry long-range detail \
             across the conversation when it helps."
        }
    }
}

/// The opening tier+mode template.
#[must_use]
pub fn tier_mode_template(mode: Mode, tier: Tier) -> String {
    format!("{}\n\n{}", mode_persona(mode), tier_sizing(tier))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
