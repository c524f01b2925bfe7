//! Provider trait and streaming types.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ollm_core::messages::Message;
use ollm_tools::ToolDescriptor;

/// Errors surfaced by provider calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The daemon is unreachable or refused the request.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline.
    #[error("provider call timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The stream broke mid-response.
    #[error("provider stream error: {0}")]
    Stream(String),
}

/// A model request to run a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    /// Correlates the eventual result message.
    pub tool_call_id: String,
    /// Registered tool identifier.
    pub name: String,
    /// JSON arguments.
    pub arguments: Value,
}

/// One element of a streaming chat response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Incremental assistant text.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// A fully constructed tool call.
    ToolCall {
        /// The call.
        call: ToolCallRequest,
    },
    /// Stream completed.
    End {
        /// Provider-reported prompt token count, when available. This is
        /// ground truth for the budgeting layer when present.
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_tokens: Option<u32>,
    },
}

/// One chat request, already shaped by `build_provider_view`.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Model to serve the request.
    pub model_id: String,
    /// Ordered messages: system prompt, checkpoint summaries, live messages.
    pub messages: Vec<Message>,
    /// The effective cap, sent as the provider's context-window parameter.
    pub num_ctx: u32,
    /// Tool descriptors; empty when the model lacks tool calling.
    pub tools: Vec<ToolDescriptor>,
}

/// Boxed chunk stream returned by [`ModelProvider::chat_stream`].
pub type ChatStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

/// The provider capability set the core consumes.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Start a streaming chat completion.
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream, ProviderError>;

    /// Exact token count for `text` under `model_id`, if the provider can
    /// answer. `None` routes the caller to the surrogate counter.
    async fn count_tokens(&self, text: &str, model_id: &str) -> Option<u32>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
