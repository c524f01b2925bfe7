//! Summarisation prompts and structured-reply parsing.
//!
//! The summariser is asked for one JSON object carrying the free-text
//! summary plus the structured preservation fields. Local models get the
//! shape wrong often enough that parsing is tolerant: a reply that is not
//! clean JSON is mined for its first object, and a reply with no object at
//! all becomes a free-text summary with empty structured fields.

use std::fmt::Write as _;

use serde::Deserialize;

use ollm_core::checkpoint::Checkpoint;
use ollm_core::messages::Message;

/// The structured document the summariser is prompted to emit.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredSummary {
    /// Free-text summary body.
    pub summary: String,
    /// Decisions to carry forward verbatim.
    pub key_decisions: Vec<String>,
    /// Files reported modified.
    pub files_modified: Vec<String>,
    /// Open follow-ups.
    pub next_steps: Vec<String>,
}

/// Build the summarisation instruction for a message span.
#[must_use]
pub fn span_instruction(budget_tokens: u32) -> String {
    format!(
        "You are compressing the older part of an agent conversation so it \
         fits a fixed context window. Summarise the transcript you are \
         given. Respond with exactly one JSON object and nothing else:\n\
         {{\"summary\": string, \"keyDecisions\": [string], \
         \"filesModified\": [string], \"nextSteps\": [string]}}\n\
         Keep the summary under {budget_tokens} tokens. Record every \
         decision, file path, and unfinished task you see; drop pleasantries."
    )
}

/// Render a message span as the transcript body for the summariser.
#[must_use]
pub fn render_transcript(messages: &[&Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        let _ = writeln!(out, "[{:?}] {}", msg.role, msg.body_text());
    }
    out
}

/// Build the merge instruction for two checkpoints.
///
/// Structured fields of both inputs are re-embedded verbatim so nothing
/// preserved at level N is lost at level N+1.
#[must_use]
pub fn merge_instruction(older: &Checkpoint, newer: &Checkpoint, budget_tokens: u32) -> String {
    let mut out = format!(
        "Two summaries of adjacent spans of one agent conversation follow, \
         oldest first. Merge them into a single summary. Respond with \
         exactly one JSON object and nothing else:\n\
         {{\"summary\": string, \"keyDecisions\": [string], \
         \"filesModified\": [string], \"nextSteps\": [string]}}\n\
         Keep the summary under {budget_tokens} tokens. Carry over every \
         key decision, modified file, and next step from both inputs.\n"
    );
    for (label, cp) in [("First summary", older), ("Second summary", newer)] {
        let _ = write!(out, "\n## {label}\n{}", cp.summary);
        append_list(&mut out, "Key decisions", &cp.key_decisions);
        append_list(&mut out, "Files modified", &cp.files_modified);
        append_list(&mut out, "Next steps", &cp.next_steps);
    }
    out
}

fn append_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(out, "\n{label}: {}", items.join("; "));
}

/// Parse a summariser reply.
///
/// Tries the whole reply as JSON, then the first `{`..last `}` slice, then
/// falls back to the raw text as a free-form summary.
#[must_use]
pub fn parse_reply(reply: &str) -> StructuredSummary {
    let trimmed = reply.trim();
    if let Ok(parsed) = serde_json::from_str::<StructuredSummary>(trimmed) {
        return normalise(parsed, trimmed);
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<StructuredSummary>(&trimmed[start..=end]) {
                return normalise(parsed, trimmed);
            }
        }
    }
    StructuredSummary {
        summary: trimmed.to_owned(),
        ..StructuredSummary::default()
    }
}

/// A parsed object with an empty summary is as useless as no object.
fn normalise(parsed: StructuredSummary, raw: &str) -> StructuredSummary {
    if parsed.summary.trim().is_empty() {
        StructuredSummary {
            summary: raw.to_owned(),
            ..parsed
        }
    } else {
        parsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
