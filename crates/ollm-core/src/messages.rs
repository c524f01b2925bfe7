//! Conversation messages.
//!
//! A [`Message`] is one entry in a conversation: a role, an ordered sequence
//! of parts, a monotonic order value, and a cached token count that is
//! invalidated whenever the parts change.
//!
//! The `preserved` flag is the compressor's hard boundary: a preserved
//! message is never summarised, truncated, or dropped. All `user` messages
//! are preserved from construction; the first `system` message of a
//! conversation is preserved by [`crate::conversation::Conversation`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::CheckpointId;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Orchestrator-authored instruction text.
    System,
    /// User-authored input. Always preserved.
    User,
    /// Model-authored response text.
    Assistant,
    /// A model request to execute a tool.
    ToolCall,
    /// The host-side result of a tool execution.
    ToolResult,
}

/// One part of a message body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A structured tool invocation request.
    ToolCall {
        /// Tool call id correlating call and result.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Registered tool identifier (may be namespaced, e.g. `mcp:fetch`).
        name: String,
        /// JSON arguments.
        arguments: Value,
    },
    /// A structured tool result payload.
    ToolResult {
        /// Tool call id this result answers.
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// JSON result payload.
        content: Value,
    },
}

/// One conversation entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Ordered body parts.
    parts: Vec<MessagePart>,
    /// Monotonic order value assigned by the owning conversation.
    pub timestamp: u64,
    /// Cached token count. `None` until counted or after parts change.
    token_count: Option<u32>,
    /// Never compress or drop this message.
    pub preserved: bool,
    /// Set iff this message was authored by the compressor as a summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,
}

impl Message {
    /// Build a message with a given role and a single text part.
    ///
    /// `preserved` defaults by role: user messages are always preserved.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
            timestamp: 0,
            token_count: None,
            preserved: matches!(role, Role::User),
            checkpoint_id: None,
        }
    }

    /// A user message (preserved).
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// A system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// A tool result message carrying a JSON payload.
    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: Value) -> Self {
        Self {
            role: Role::ToolResult,
            parts: vec![MessagePart::ToolResult {
                tool_call_id: tool_call_id.into(),
                content,
            }],
            timestamp: 0,
            token_count: None,
            preserved: false,
            checkpoint_id: None,
        }
    }

    /// A tool call message as emitted by the model.
    #[must_use]
    pub fn tool_call(tool_call_id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            role: Role::ToolCall,
            parts: vec![MessagePart::ToolCall {
                tool_call_id: tool_call_id.into(),
                name: name.into(),
                arguments: args,
            }],
            timestamp: 0,
            token_count: None,
            preserved: false,
            checkpoint_id: None,
        }
    }

    /// The ordered body parts.
    #[must_use]
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    /// Append a part, invalidating the cached token count.
    pub fn push_part(&mut self, part: MessagePart) {
        self.parts.push(part);
        self.token_count = None;
    }

    /// Append text, extending a trailing text part in place when possible.
    ///
    /// Used by assistant streaming to accumulate deltas without one part
    /// per chunk. Invalidates the cached token count.
    pub fn append_text(&mut self, delta: &str) {
        if let Some(MessagePart::Text { text }) = self.parts.last_mut() {
            text.push_str(delta);
        } else {
            self.parts.push(MessagePart::Text {
                text: delta.to_owned(),
            });
        }
        self.token_count = None;
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn body_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let MessagePart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }

    /// The cached token count, if current.
    #[must_use]
    pub fn cached_tokens(&self) -> Option<u32> {
        self.token_count
    }

    /// Install a freshly computed token count.
    pub fn set_token_count(&mut self, tokens: u32) {
        self.token_count = Some(tokens);
    }

    /// Whether the message has any content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
            || self
                .parts
                .iter()
                .all(|p| matches!(p, MessagePart::Text { text } if text.trim().is_empty()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_messages_are_preserved() {
        assert!(Message::user("hi").preserved);
        assert!(!Message::assistant("hi").preserved);
        assert!(!Message::system("hi").preserved);
    }

    #[test]
    fn push_part_invalidates_cache() {
        let mut msg = Message::assistant("one");
        msg.set_token_count(10);
        assert_eq!(msg.cached_tokens(), Some(10));
        msg.push_part(MessagePart::Text {
            text: "two".into(),
        });
        assert_eq!(msg.cached_tokens(), None);
    }

    #[test]
    fn append_text_extends_last_text_part() {
        let mut msg = Message::assistant("hel");
        msg.append_text("lo");
        assert_eq!(msg.parts().len(), 1);
        assert_eq!(msg.body_text(), "hello");
    }

    #[test]
    fn append_text_invalidates_cache() {
        let mut msg = Message::assistant("a");
        msg.set_token_count(1);
        msg.append_text("b");
        assert_eq!(msg.cached_tokens(), None);
    }

    #[test]
    fn body_text_skips_structured_parts() {
        let mut msg = Message::assistant("before ");
        msg.push_part(MessagePart::ToolCall {
            tool_call_id: "tc-1".into(),
            name: "read_file".into(),
            arguments: json!({"path": "a.rs"}),
        });
        msg.push_part(MessagePart::Text {
            text: "after".into(),
        });
        assert_eq!(msg.body_text(), "before after");
    }

    #[test]
    fn empty_detection() {
        assert!(Message::user("").is_empty());
        assert!(Message::user("   \n").is_empty());
        assert!(!Message::user("x").is_empty());
        // A tool result with a payload is not empty even without text
        assert!(!Message::tool_result("tc-1", json!({"ok": true})).is_empty());
    }

    #[test]
    fn roles_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::ToolResult).unwrap(),
            "\"tool_result\""
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn round_trips_through_serde() {
        let mut msg = Message::tool_call("tc-9", "shell", json!({"cmd": "ls"}));
        msg.set_token_count(7);
        msg.timestamp = 42;
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.cached_tokens(), Some(7));
    }
}
