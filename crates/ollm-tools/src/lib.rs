//! # ollm-tools
//!
//! The tool registration and invocation contract.
//!
//! Tool *implementations* (file I/O, shell, web search) live outside the
//! core; this crate defines the capability set they register against:
//! a JSON-schema'd [`ToolDescriptor`] plus an async [`Tool::execute`].
//! Identifiers are namespaced strings; `mcp:*` tools register and dispatch
//! identically to local ones, so the registry stays opaque to where a tool
//! actually runs.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ollm_core::ids::SessionId;

/// Errors surfaced by tool dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under the identifier.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments did not match the tool's schema.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArgs {
        /// Tool identifier.
        tool: String,
        /// What was wrong.
        reason: String,
    },

    /// The tool ran and failed.
    #[error("tool {tool} failed: {reason}")]
    Failed {
        /// Tool identifier.
        tool: String,
        /// Failure detail.
        reason: String,
    },
}

/// Provider-visible description of a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique, possibly namespaced identifier (`read_file`, `mcp:fetch`).
    pub id: String,
    /// One-line description shown to the model.
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// Host-side context handed to every execution.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// Workspace directory tools resolve relative paths against.
    pub workspace_dir: PathBuf,
}

/// A registered tool: describe + execute.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The descriptor sent to the provider.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run the tool.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Flat identifier-keyed tool map.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor id. Re-registering an id
    /// replaces the previous implementation.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let _ = self.tools.insert(tool.descriptor().id.clone(), tool);
    }

    /// Look up a tool.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(id)
    }

    /// Execute by identifier.
    pub async fn execute(
        &self,
        id: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(id)
            .ok_or_else(|| ToolError::UnknownTool(id.to_owned()))?;
        tool.execute(args, ctx).await
    }

    /// All descriptors, ordered by id.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor().clone()).collect()
    }

    /// All registered ids, ordered.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new(id: &str) -> Self {
            Self {
                descriptor: ToolDescriptor {
                    id: id.to_owned(),
                    description: "echoes its arguments".into(),
                    parameters: json!({"type": "object"}),
                },
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Ok(json!({"echo": args}))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: SessionId::from_string("sess-t"),
            workspace_dir: PathBuf::from("/tmp"),
        }
    }

    #[tokio::test]
    async fn register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo")));
        let out = registry
            .execute("echo", json!({"x": 1}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["echo"]["x"], 1);
    }

    #[tokio::test]
    async fn unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", json!({}), &ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[test]
    fn mcp_namespaced_ids_are_ordinary_entries() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("mcp:fetch")));
        registry.register(Arc::new(EchoTool::new("read_file")));
        assert_eq!(registry.ids(), vec!["mcp:fetch", "read_file"]);
        assert!(registry.get("mcp:fetch").is_some());
    }

    #[test]
    fn descriptors_are_ordered_by_id() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("b")));
        registry.register(Arc::new(EchoTool::new("a")));
        let ids: Vec<String> = registry.descriptors().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
