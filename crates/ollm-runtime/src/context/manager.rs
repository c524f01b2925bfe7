//! Central context manager.
//!
//! [`ContextManager`] owns the live conversation and is its only mutating
//! API. After every token-changing append it re-evaluates the budget:
//! compression at the trigger threshold (with a cooldown that the 95%
//! threshold bypasses), automatic snapshots at the soft and hard
//! thresholds, and an overflow warning at the hard threshold. Streaming
//! appends never compress; the decision runs once at end-of-stream.
//!
//! All mutation happens through `&mut self` on the session's task, so an
//! in-flight compression and a competing append cannot interleave by
//! construction; the compression future is awaited inside the append that
//! triggered it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::gauge;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use ollm_core::conversation::{Conversation, Mode, Tier};
use ollm_core::events::{BusEvent, SnapshotTrigger};
use ollm_core::ids::{SessionId, SnapshotId};
use ollm_core::messages::Message;
use ollm_core::tokens::{CountTokens, SurrogateCounter, count_message};
use ollm_events::EventBus;
use ollm_hooks::AggregatedOutcome;
use ollm_llm::{ChatRequest, ModelProvider};
use ollm_models::{ModelProfile, ModelRegistry};
use ollm_prompts::builder::{BuiltPrompt, PromptInputs, build, load_project_rules};
use ollm_prompts::filter::allowed_tool_ids;
use ollm_prompts::skills::Skill;
use ollm_settings::Settings;
use ollm_snapshots::{ContextSnapshot, SnapshotError, SnapshotStore};
use ollm_tools::ToolDescriptor;

use crate::compression::{CompressionEngine, CompressionEngineConfig, CompressionOutcome};
use crate::errors::{ContextError, Result};

/// Budget thresholds and session-level knobs.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Usage ratio at which automatic compression fires.
    pub compression_threshold: f64,
    /// Usage ratio for the `auto_85pct` snapshot.
    pub snapshot_soft_threshold: f64,
    /// Usage ratio for the `auto_95pct` snapshot and overflow warning.
    /// Also bypasses the compression cooldown.
    pub snapshot_hard_threshold: f64,
    /// Minimum spacing between automatic compressions.
    pub compression_cooldown: Duration,
    /// Provider timeout for summarisation calls.
    pub provider_timeout: Duration,
    /// Workspace the session operates in (project rules, tool context).
    pub workspace_dir: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 0.80,
            snapshot_soft_threshold: 0.85,
            snapshot_hard_threshold: 0.95,
            compression_cooldown: Duration::from_secs(60),
            provider_timeout: Duration::from_secs(120),
            workspace_dir: PathBuf::from("."),
        }
    }
}

impl ContextConfig {
    /// Derive the config from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &Settings, workspace_dir: PathBuf) -> Self {
        Self {
            compression_threshold: settings.context.compression_threshold,
            snapshot_soft_threshold: settings.context.snapshot_soft_threshold,
            snapshot_hard_threshold: settings.context.snapshot_hard_threshold,
            compression_cooldown: Duration::from_secs(settings.context.compression_cooldown_secs),
            provider_timeout: Duration::from_secs(settings.context.provider_timeout_secs),
            workspace_dir,
        }
    }
}

/// Owned collaborator handles for a session (single owner-graph: the
/// manager owns these; observers subscribe to the bus).
pub struct SessionDeps {
    /// Provider handle (summarisation; the UI layer streams through it too).
    pub provider: Arc<dyn ModelProvider>,
    /// Snapshot persistence.
    pub snapshots: Arc<SnapshotStore>,
    /// Event bus.
    pub bus: Arc<EventBus>,
}

/// Prompt-relevant state outside the conversation itself.
struct PromptState {
    registered_tools: Vec<ToolDescriptor>,
    global_tools: std::collections::BTreeMap<String, bool>,
    tools_by_mode: std::collections::BTreeMap<String, std::collections::BTreeMap<String, bool>>,
    skills: Vec<Skill>,
    focused_files: Vec<String>,
    project_rules: Option<String>,
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager").finish_non_exhaustive()
    }
}

/// Owns the live conversation; the only mutating API.
pub struct ContextManager {
    conversation: Conversation,
    profile: ModelProfile,
    engine: CompressionEngine,
    snapshots: Arc<SnapshotStore>,
    bus: Arc<EventBus>,
    counter: Arc<dyn CountTokens>,
    config: ContextConfig,
    prompt_state: PromptState,
    system_prompt: BuiltPrompt,
    last_compression_at: Option<Instant>,
    /// Assistant message being accumulated, when a stream is open.
    streaming: Option<Message>,
    /// Provider-reported prompt token count (ground truth when present).
    /// Cleared by every mutation, which makes the estimate current again.
    reported_prompt_tokens: Option<u32>,
}

/// Hard ceiling for one tool result, regardless of remaining context.
const TOOL_RESULT_MAX_BYTES: usize = 100_000;
/// Floor so a nearly-full context still admits a usable result.
const TOOL_RESULT_MIN_TOKENS: u32 = 256;

impl ContextManager {
    /// Open a session against a model from the registry.
    ///
    /// The effective cap is taken from the model's context profile for
    /// `tier` and never changes afterwards.
    pub fn open_session(
        registry: &ModelRegistry,
        model_id: &str,
        tier: Tier,
        mode: Mode,
        session_id: Option<SessionId>,
        settings: &Settings,
        deps: SessionDeps,
        config: ContextConfig,
    ) -> Result<Self> {
        let profile = registry
            .get(model_id)
            .map_err(|_| ContextError::ModelUnknown(model_id.to_owned()))?
            .clone();
        let cap = profile.effective_cap(tier);
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let conversation = Conversation::new(session_id.clone(), model_id, tier, mode, cap);

        let counter: Arc<dyn CountTokens> = Arc::new(SurrogateCounter);
        let engine = CompressionEngine::new(
            Arc::clone(&deps.provider),
            Arc::clone(&counter),
            CompressionEngineConfig {
                target_usage: config.compression_threshold,
                provider_timeout: config.provider_timeout,
                ..CompressionEngineConfig::default()
            },
        );

        let prompt_state = PromptState {
            registered_tools: Vec::new(),
            global_tools: settings.tools.clone(),
            tools_by_mode: settings.tools_by_mode.clone(),
            skills: Vec::new(),
            focused_files: Vec::new(),
            project_rules: load_project_rules(&config.workspace_dir),
        };

        let mut manager = Self {
            conversation,
            profile,
            engine,
            snapshots: deps.snapshots,
            bus: deps.bus,
            counter,
            config,
            prompt_state,
            system_prompt: BuiltPrompt {
                text: String::new(),
                token_count: 0,
            },
            last_compression_at: None,
            streaming: None,
            reported_prompt_tokens: None,
        };
        manager.rebuild_system_prompt();

        info!(
            session = %manager.conversation.session_id,
            model = model_id,
            cap = cap,
            "session opened"
        );
        manager.bus.emit(&BusEvent::SessionStart {
            session_id: manager.conversation.session_id.clone(),
            model_id: model_id.to_owned(),
            tier,
            mode,
        });
        Ok(manager)
    }

    // ── Appends ─────────────────────────────────────────────────────────

    /// Append a user message. Preserved for its whole lifetime.
    #[instrument(skip(self, text), fields(session = %self.conversation.session_id))]
    pub async fn append_user(&mut self, text: &str) -> Result<()> {
        if self.streaming.is_some() {
            return Err(ContextError::StreamInProgress);
        }
        if self.counter.count(text.trim()) == 0 {
            return Err(ContextError::EmptyInput);
        }
        let mut message = Message::user(text);
        let tokens = count_message(self.counter.as_ref(), &message);
        message.set_token_count(tokens);
        self.reported_prompt_tokens = None;
        let appended = self.conversation.push(message).clone();
        self.emit_appended(appended);
        self.after_append().await
    }

    /// Accumulate one assistant stream chunk. Opens the stream on first
    /// chunk. Never compresses and never fails fatally.
    pub fn append_assistant_stream_chunk(&mut self, delta: &str) {
        let message = self
            .streaming
            .get_or_insert_with(|| Message::assistant(String::new()));
        message.append_text(delta);
    }

    /// Finalise the open assistant stream.
    ///
    /// Recounts tokens, appends the message, and runs the compression
    /// decision exactly once. Errors with [`ContextError::OverCap`] when
    /// the conversation still exceeds the cap after compression.
    #[instrument(skip(self), fields(session = %self.conversation.session_id))]
    pub async fn end_assistant_stream(&mut self) -> Result<()> {
        let mut message = self.streaming.take().ok_or(ContextError::StreamNotOpen)?;
        let tokens = count_message(self.counter.as_ref(), &message);
        message.set_token_count(tokens);
        self.reported_prompt_tokens = None;
        let appended = self.conversation.push(message).clone();
        self.emit_appended(appended);
        self.after_append().await?;

        let total = self.total_tokens();
        let cap = self.conversation.effective_cap_tokens;
        if total > cap {
            return Err(ContextError::OverCap {
                total_tokens: total,
                cap_tokens: cap,
            });
        }
        Ok(())
    }

    /// Cancel an in-flight stream: finalise with whatever text arrived.
    ///
    /// A no-op when no stream is open.
    pub async fn cancel_stream(&mut self) -> Result<()> {
        if self.streaming.is_none() {
            return Ok(());
        }
        self.end_assistant_stream().await
    }

    /// Append a tool result (never preserved).
    ///
    /// Oversized string payloads are clipped to the remaining-context
    /// budget before they ever reach the conversation.
    pub async fn append_tool_result(&mut self, tool_call_id: &str, payload: Value) -> Result<()> {
        let payload = match payload {
            Value::String(text) => Value::String(self.clip_tool_result(&text)),
            other => other,
        };
        let mut message = Message::tool_result(tool_call_id, payload);
        let tokens = count_message(self.counter.as_ref(), &message);
        message.set_token_count(tokens);
        self.reported_prompt_tokens = None;
        let appended = self.conversation.push(message).clone();
        self.emit_appended(appended);
        self.after_append().await
    }

    /// Clip tool output to what the remaining context can afford.
    #[must_use]
    pub fn clip_tool_result(&self, content: &str) -> String {
        ollm_core::text::clip_with_notice(content, self.max_tool_result_bytes())
    }

    /// Byte budget for one tool result.
    ///
    /// Reserves a quarter of the cap for the model's response plus a 10%
    /// safety margin on what remains, floored so a nearly-full context
    /// still admits a usable result.
    #[must_use]
    pub fn max_tool_result_bytes(&self) -> usize {
        let cap = self.conversation.effective_cap_tokens;
        let remaining = cap.saturating_sub(self.total_tokens());
        let response_reserve = cap / 4;
        let safety_margin = remaining / 10;
        let available = remaining
            .saturating_sub(response_reserve)
            .saturating_sub(safety_margin)
            .max(TOOL_RESULT_MIN_TOKENS);
        ((available as usize) * (ollm_core::tokens::CHARS_PER_TOKEN as usize))
            .min(TOOL_RESULT_MAX_BYTES)
    }

    /// Apply an aggregated hook outcome: inject system messages, return
    /// whether the in-progress operation may proceed.
    pub async fn apply_hook_outcome(&mut self, outcome: &AggregatedOutcome) -> Result<bool> {
        for text in &outcome.system_messages {
            let mut message = Message::system(text);
            let tokens = count_message(self.counter.as_ref(), &message);
            message.set_token_count(tokens);
            let appended = self.conversation.push(message).clone();
            self.emit_appended(appended);
        }
        if !outcome.system_messages.is_empty() {
            self.after_append().await?;
        }
        Ok(!outcome.aborted)
    }

    // ── Budget decisions ────────────────────────────────────────────────

    /// The budget decision, run after every token-changing append.
    async fn after_append(&mut self) -> Result<()> {
        self.conversation.ensure_counted(self.counter.as_ref());
        let usage = self.usage();
        gauge!("context_usage_ratio").set(usage);
        if usage < self.config.compression_threshold {
            return Ok(());
        }

        let hard = usage >= self.config.snapshot_hard_threshold;
        let cooled = self
            .last_compression_at
            .is_none_or(|at| at.elapsed() >= self.config.compression_cooldown);

        // Cooldown is bypassed at the hard threshold: a burst of large
        // tool results must compress rather than overflow.
        if cooled || hard {
            match self
                .engine
                .compress(&mut self.conversation, self.system_prompt.token_count)
                .await?
            {
                CompressionOutcome::Compressed { event, .. } => {
                    self.last_compression_at = Some(Instant::now());
                    self.reported_prompt_tokens = None;
                    self.bus.emit(&BusEvent::CompressionTriggered {
                        session_id: self.conversation.session_id.clone(),
                        from_tokens: event.from_tokens,
                        to_tokens: event.to_tokens,
                        strategy: event.strategy,
                    });
                }
                CompressionOutcome::NoChange { reason } => {
                    debug!(reason, "compression made no change");
                }
            }
        } else {
            debug!(usage, "compression wanted but in cooldown");
        }

        if usage >= self.config.snapshot_soft_threshold {
            let trigger = if hard {
                SnapshotTrigger::Auto95Pct
            } else {
                SnapshotTrigger::Auto85Pct
            };
            // Automatic snapshot failures warn; they never fail the append.
            if let Err(e) = self.snapshot_now(trigger) {
                warn!(error = %e, "automatic snapshot failed");
            }
            if hard {
                self.bus.emit(&BusEvent::PreOverflowWarning {
                    session_id: self.conversation.session_id.clone(),
                    usage,
                });
            }
        }
        Ok(())
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    /// Take a snapshot now. Returns the new snapshot id.
    pub fn manual_snapshot(&mut self) -> Result<SnapshotId> {
        self.snapshot_now(SnapshotTrigger::Manual)
            .map_err(ContextError::SnapshotFailed)
    }

    fn snapshot_now(&mut self, trigger: SnapshotTrigger) -> std::result::Result<SnapshotId, SnapshotError> {
        self.conversation.ensure_counted(self.counter.as_ref());
        let snapshot = ContextSnapshot::capture(&self.conversation, trigger);
        let id = self.snapshots.save(&snapshot)?;
        self.bus.emit(&BusEvent::SnapshotCreated {
            session_id: self.conversation.session_id.clone(),
            snapshot_id: id.clone(),
            trigger,
        });
        Ok(id)
    }

    /// Archive the conversation and start the session fresh.
    ///
    /// Takes a `pre_rollover` snapshot of the full state first, then drops
    /// every message and checkpoint. The session id, tier, mode, and cap
    /// carry over; message order values keep counting from where they were.
    pub fn rollover(&mut self) -> Result<SnapshotId> {
        let id = self
            .snapshot_now(SnapshotTrigger::PreRollover)
            .map_err(ContextError::SnapshotFailed)?;
        self.streaming = None;
        self.conversation.set_messages(Vec::new());
        self.conversation.checkpoints.clear();
        self.conversation.compression_history.clear();
        self.reported_prompt_tokens = None;
        self.last_compression_at = None;
        info!(snapshot = %id, "conversation rolled over");
        Ok(id)
    }

    /// Replace the live conversation with a stored snapshot.
    pub fn restore_snapshot(&mut self, id: &SnapshotId) -> Result<()> {
        let snapshot = self.snapshots.load(id).map_err(|e| match e {
            SnapshotError::NotFound(id) => ContextError::SnapshotNotFound(id),
            SnapshotError::Corrupt { path, source } => {
                ContextError::SnapshotCorrupt(format!("{}: {source}", path.display()))
            }
            other => ContextError::SnapshotFailed(other),
        })?;

        self.streaming = None;
        self.reported_prompt_tokens = None;
        self.conversation = snapshot.conversation;
        self.rebuild_system_prompt();
        self.bus.emit(&BusEvent::SnapshotRestored {
            session_id: self.conversation.session_id.clone(),
            snapshot_id: id.clone(),
        });
        info!(snapshot = %id, "conversation restored from snapshot");
        Ok(())
    }

    // ── Mode and prompt inputs ──────────────────────────────────────────

    /// Switch operational mode and rebuild the system prompt.
    pub fn set_mode(&mut self, mode: Mode) {
        self.conversation.mode = mode;
        self.rebuild_system_prompt();
        self.bus.emit(&BusEvent::ModeChanged {
            session_id: self.conversation.session_id.clone(),
            mode,
        });
    }

    /// Replace the registered tool descriptors.
    pub fn set_registered_tools(&mut self, tools: Vec<ToolDescriptor>) {
        self.prompt_state.registered_tools = tools;
        self.rebuild_system_prompt();
    }

    /// Replace the active skills.
    pub fn set_skills(&mut self, skills: Vec<Skill>) {
        self.prompt_state.skills = skills;
        self.rebuild_system_prompt();
    }

    /// Replace the focused-files list pinned by the UI.
    pub fn set_focused_files(&mut self, files: Vec<String>) {
        self.prompt_state.focused_files = files;
        self.rebuild_system_prompt();
    }

    fn rebuild_system_prompt(&mut self) {
        let tools = self.filtered_tools();
        let inputs = PromptInputs {
            mode: self.conversation.mode,
            tier: self.conversation.tier,
            tools: &tools,
            supports_tool_calling: self.profile.supports_tool_calling,
            skills: &self.prompt_state.skills,
            focused_files: &self.prompt_state.focused_files,
            project_rules: self.prompt_state.project_rules.as_deref(),
        };
        self.system_prompt = build(&inputs);
        debug!(
            tokens = self.system_prompt.token_count,
            "system prompt rebuilt"
        );
    }

    /// Tool descriptors visible to the current mode.
    #[must_use]
    pub fn filtered_tools(&self) -> Vec<ToolDescriptor> {
        let ids: Vec<String> = self
            .prompt_state
            .registered_tools
            .iter()
            .map(|d| d.id.clone())
            .collect();
        let allowed = allowed_tool_ids(
            self.conversation.mode,
            &ids,
            &self.prompt_state.global_tools,
            &self.prompt_state.tools_by_mode,
            self.profile.supports_tool_calling,
        );
        self.prompt_state
            .registered_tools
            .iter()
            .filter(|d| allowed.contains(&d.id))
            .cloned()
            .collect()
    }

    // ── Provider view ───────────────────────────────────────────────────

    /// The ordered message sequence sent to the provider: system prompt,
    /// checkpoint summaries, then the live messages.
    pub fn build_provider_view(&mut self) -> Vec<Message> {
        self.conversation.ensure_counted(self.counter.as_ref());
        let mut view = Vec::with_capacity(
            1 + self.conversation.checkpoints.len() + self.conversation.message_count(),
        );
        let mut system = Message::system(self.system_prompt.text.clone());
        system.set_token_count(self.system_prompt.token_count);
        system.preserved = true;
        view.push(system);
        view.extend(self.conversation.checkpoints.as_messages());
        view.extend(self.conversation.messages().iter().cloned());

        debug_assert!(
            view.iter().filter_map(Message::cached_tokens).sum::<u32>()
                <= self.conversation.effective_cap_tokens
                || self.usage() > 1.0,
            "provider view exceeds the effective cap"
        );
        view
    }

    /// A ready chat request for the current state.
    pub fn chat_request(&mut self) -> ChatRequest {
        let tools = if self.profile.supports_tool_calling {
            self.filtered_tools()
        } else {
            Vec::new()
        };
        ChatRequest {
            model_id: self.conversation.model_id.clone(),
            messages: self.build_provider_view(),
            num_ctx: self.conversation.effective_cap_tokens,
            tools,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Record the provider-reported prompt token count from the last
    /// completed request. Ground truth for usage until the next mutation.
    pub fn note_reported_prompt_tokens(&mut self, tokens: u32) {
        self.reported_prompt_tokens = Some(tokens);
    }

    /// Current usage ratio (messages + checkpoints + system prompt over cap).
    #[must_use]
    pub fn usage(&self) -> f64 {
        let cap = self.conversation.effective_cap_tokens;
        if cap == 0 {
            return 0.0;
        }
        f64::from(self.total_tokens()) / f64::from(cap)
    }

    /// Current token total including the system prompt.
    ///
    /// Prefers the provider-reported count when one is current; the
    /// surrogate component sum otherwise.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.reported_prompt_tokens
            .unwrap_or_else(|| self.conversation.total_tokens(self.system_prompt.token_count))
    }

    /// The live conversation (read-only).
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The session id.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.conversation.session_id
    }

    /// The cached system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &BuiltPrompt {
        &self.system_prompt
    }

    /// Whether an assistant stream is open.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// End the session: emits `session_end`. The conversation drops with
    /// the manager.
    pub fn end_session(&self) {
        self.bus.emit(&BusEvent::SessionEnd {
            session_id: self.conversation.session_id.clone(),
        });
    }

    fn emit_appended(&self, message: Message) {
        // The session recorder depends on receiving the complete message
        // exactly once, before any compression can touch it.
        self.bus.emit(&BusEvent::MessageAppended {
            session_id: self.conversation.session_id.clone(),
            message,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
