//! Hook input payload builders.
//!
//! Every dispatch feeds hooks `{event, data}`; these builders produce the
//! event-specific `data` documents so call sites across the runtime agree
//! on field names.

use std::path::PathBuf;

use serde_json::{Value, json};

use ollm_core::ids::SessionId;

use crate::types::HookEvent;

/// Session-scoped context shared by every payload.
#[derive(Clone, Debug)]
pub struct HookContext {
    session_id: SessionId,
    workspace_dir: PathBuf,
}

impl HookContext {
    /// Create the context for one session.
    #[must_use]
    pub fn new(session_id: SessionId, workspace_dir: PathBuf) -> Self {
        Self {
            session_id,
            workspace_dir,
        }
    }

    fn base(&self, event: HookEvent) -> Value {
        json!({
            "event": event.as_str(),
            "sessionId": self.session_id.as_str(),
            "workspaceDir": self.workspace_dir.display().to_string(),
        })
    }

    /// Payload for `session_start` / `session_end`.
    #[must_use]
    pub fn session_payload(&self, event: HookEvent, model_id: &str) -> Value {
        let mut payload = self.base(event);
        payload["modelId"] = json!(model_id);
        payload
    }

    /// Payload for `before_agent` / `after_agent`.
    #[must_use]
    pub fn agent_payload(&self, event: HookEvent, user_text: &str) -> Value {
        let mut payload = self.base(event);
        payload["prompt"] = json!(user_text);
        payload
    }

    /// Payload for `before_model` / `after_model`.
    #[must_use]
    pub fn model_payload(&self, event: HookEvent, model_id: &str, context_tokens: u32) -> Value {
        let mut payload = self.base(event);
        payload["modelId"] = json!(model_id);
        payload["contextTokens"] = json!(context_tokens);
        payload
    }

    /// Payload for `before_tool_selection`.
    #[must_use]
    pub fn tool_selection_payload(&self, tool_ids: &[String]) -> Value {
        let mut payload = self.base(HookEvent::BeforeToolSelection);
        payload["tools"] = json!(tool_ids);
        payload
    }

    /// Payload for `before_tool` / `after_tool`.
    #[must_use]
    pub fn tool_payload(
        &self,
        event: HookEvent,
        tool_id: &str,
        tool_call_id: &str,
        arguments: &Value,
    ) -> Value {
        let mut payload = self.base(event);
        payload["tool"] = json!(tool_id);
        payload["toolCallId"] = json!(tool_call_id);
        payload["arguments"] = arguments.clone();
        payload
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
