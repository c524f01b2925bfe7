//! Hook types and the stdin/stdout wire protocol.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ollm_core::ids::HookId;

/// The nine lifecycle events hooks can attach to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// A session was opened.
    SessionStart,
    /// A session is ending.
    SessionEnd,
    /// Before the agent turn starts.
    BeforeAgent,
    /// After the agent turn completes.
    AfterAgent,
    /// Before a provider call.
    BeforeModel,
    /// After a provider call.
    AfterModel,
    /// Before the model is offered tool descriptors.
    BeforeToolSelection,
    /// Before a tool executes. `continue: false` skips the tool.
    BeforeTool,
    /// After a tool executed.
    AfterTool,
}

impl HookEvent {
    /// All events, in protocol order.
    pub const ALL: [Self; 9] = [
        Self::SessionStart,
        Self::SessionEnd,
        Self::BeforeAgent,
        Self::AfterAgent,
        Self::BeforeModel,
        Self::AfterModel,
        Self::BeforeToolSelection,
        Self::BeforeTool,
        Self::AfterTool,
    ];

    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::BeforeAgent => "before_agent",
            Self::AfterAgent => "after_agent",
            Self::BeforeModel => "before_model",
            Self::AfterModel => "after_model",
            Self::BeforeToolSelection => "before_tool_selection",
            Self::BeforeTool => "before_tool",
            Self::AfterTool => "after_tool",
        }
    }
}

/// Where a hook came from. Determines trust and dispatch priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookSource {
    /// Compiled into the runtime. Always trusted.
    Builtin,
    /// From `~/.ollm/hooks`. Always trusted.
    User,
    /// From `<workspace>/.ollm/hooks`. Trusted only with `trust_workspace`.
    Workspace,
    /// Fetched from elsewhere. Requires approval.
    Downloaded,
    /// Shipped by an extension. Requires approval.
    Extension,
}

impl HookSource {
    /// Dispatch priority; lower runs earlier.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Builtin => 0,
            Self::User => 1,
            Self::Workspace => 2,
            Self::Downloaded => 3,
            Self::Extension => 4,
        }
    }

    /// Whether this source is trusted without an approval record.
    #[must_use]
    pub fn implicitly_trusted(self) -> bool {
        matches!(self, Self::Builtin | Self::User)
    }
}

/// A registered lifecycle hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Registry id.
    pub id: HookId,
    /// Display name.
    pub name: String,
    /// Executable to spawn. Absolute path or a whitelisted interpreter.
    pub command: String,
    /// Arguments, passed verbatim (no shell interpretation).
    pub args: Vec<String>,
    /// Events this hook attaches to.
    pub events: Vec<HookEvent>,
    /// Provenance.
    pub source: HookSource,
    /// Script file whose content is hash-pinned by approvals, when the
    /// command references one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// Attribution for extension hooks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_name: Option<String>,
}

impl Hook {
    /// Whether the hook is registered for `event`.
    #[must_use]
    pub fn handles(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }
}

/// The JSON document written to a hook's stdin.
#[derive(Clone, Debug, Serialize)]
pub struct HookInput<'a> {
    /// Event wire name.
    pub event: &'a str,
    /// Event-specific context (with earlier hooks' `data` merged in).
    pub data: &'a Value,
}

/// The JSON document a hook must produce on stdout.
///
/// `continue` is the only required field. Anything unparseable becomes a
/// synthetic output via [`HookOutput::synthetic_error`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Whether the in-progress operation may proceed.
    #[serde(rename = "continue")]
    pub continue_: bool,
    /// Optional text to inject as a system message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Optional key/value pairs merged into the event context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Optional diagnostic. Non-fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookOutput {
    /// The output synthesised when a hook cannot run or answers garbage.
    #[must_use]
    pub fn synthetic_error(reason: impl Into<String>) -> Self {
        Self {
            continue_: true,
            system_message: None,
            data: None,
            error: Some(reason.into()),
        }
    }
}

/// Record of one hook run (or skip) during dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookExecution {
    /// Registry id.
    pub hook_id: HookId,
    /// Display name.
    pub hook_name: String,
    /// Event dispatched.
    pub event: HookEvent,
    /// Wall-clock duration in milliseconds; zero when skipped.
    pub duration_ms: u64,
    /// The (possibly synthetic) output.
    pub output: HookOutput,
}

/// Aggregated result of dispatching one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedOutcome {
    /// A hook returned `continue: false`; the caller must short-circuit.
    pub aborted: bool,
    /// System messages in execution order.
    pub system_messages: Vec<String>,
    /// Hook data merged left-to-right (later keys overwrite earlier).
    pub data: Map<String, Value>,
    /// Per-hook records in execution order, skips included.
    pub executions: Vec<HookExecution>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
