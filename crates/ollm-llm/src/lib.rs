//! # ollm-llm
//!
//! The model-provider contract.
//!
//! The transport to the local inference daemon lives outside the core; the
//! runtime consumes any implementation of [`ModelProvider`]: a streaming
//! chat call that yields [`StreamChunk`]s, and an optional exact token
//! counter the budgeting layer prefers over the surrogate when present.

#![deny(unsafe_code)]

mod provider;

pub use provider::{
    ChatRequest, ChatStream, ModelProvider, ProviderError, StreamChunk, ToolCallRequest,
};
