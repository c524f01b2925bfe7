//! The hook runner.
//!
//! Spawns each hook as a child process with shell interpretation disabled,
//! feeds it one JSON document on stdin, and reads one JSON document from
//! stdout under a timeout and a combined stdout+stderr byte cap. Every
//! anomaly (untrusted, invalid command, spawn failure, timeout, overflow,
//! garbage output, cancellation) synthesises a non-fatal
//! `{continue: true, error: ...}` output; only an explicit
//! `continue: false` aborts the event.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use metrics::counter;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use ollm_core::events::BusEvent;
use ollm_events::EventBus;
use ollm_settings::HookSettings;

use crate::registry::HookRegistry;
use crate::trust::TrustStore;
use crate::types::{AggregatedOutcome, Hook, HookEvent, HookExecution, HookInput, HookOutput};
use crate::validate::validate_command;

/// Grace period between SIGTERM and SIGKILL.
const SIGTERM_GRACE: Duration = Duration::from_secs(1);

/// Runner resource limits.
#[derive(Clone, Debug)]
pub struct HookRunnerConfig {
    /// Per-hook wall-clock timeout.
    pub timeout: Duration,
    /// Combined stdout+stderr cap in bytes.
    pub output_cap_bytes: usize,
    /// Trust workspace-sourced hooks without approval.
    pub trust_workspace: bool,
}

impl Default for HookRunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            output_cap_bytes: 1_048_576,
            trust_workspace: false,
        }
    }
}

impl From<&HookSettings> for HookRunnerConfig {
    fn from(settings: &HookSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            output_cap_bytes: settings.output_cap_bytes,
            trust_workspace: settings.trust_workspace,
        }
    }
}

/// Caller-supplied approval prompt: `(hook, current_hash) -> approved`.
pub type ApprovalCallback = Arc<dyn Fn(&Hook, &str) -> bool + Send + Sync>;

/// Dispatches lifecycle events to registered hooks.
pub struct HookRunner {
    registry: HookRegistry,
    trust: Arc<TrustStore>,
    config: HookRunnerConfig,
    bus: Option<Arc<EventBus>>,
    approval: Option<ApprovalCallback>,
}

impl HookRunner {
    /// Create a runner over a registry and trust store.
    #[must_use]
    pub fn new(registry: HookRegistry, trust: Arc<TrustStore>, config: HookRunnerConfig) -> Self {
        Self {
            registry,
            trust,
            config,
            bus: None,
            approval: None,
        }
    }

    /// Attach an event bus for `hook_executed` emissions.
    #[must_use]
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Attach the interactive approval callback.
    #[must_use]
    pub fn with_approval_callback(mut self, callback: ApprovalCallback) -> Self {
        self.approval = Some(callback);
        self
    }

    /// The registry backing this runner.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Dispatch one lifecycle event to all its hooks.
    pub async fn dispatch(&self, event: HookEvent, data: Value) -> AggregatedOutcome {
        self.dispatch_with_cancel(event, data, &CancellationToken::new())
            .await
    }

    /// Dispatch with caller-controlled cancellation.
    ///
    /// Hooks run sequentially. A hook returning `continue: false` stops
    /// further dispatch and marks the outcome aborted. Each hook sees the
    /// event data with earlier hooks' `data` objects merged in
    /// (left-to-right, later keys overwrite).
    #[instrument(skip(self, data), fields(event = event.as_str()))]
    pub async fn dispatch_with_cancel(
        &self,
        event: HookEvent,
        data: Value,
        cancel: &CancellationToken,
    ) -> AggregatedOutcome {
        let mut outcome = AggregatedOutcome::default();
        let mut context = data;

        for hook in self.registry.hooks_for(event) {
            let started = Instant::now();
            let output = self.run_one(hook, event, &context, cancel).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            counter!("hook_executions_total").increment(1);

            if let Some(bus) = &self.bus {
                bus.emit(&BusEvent::HookExecuted {
                    hook_id: hook.id.to_string(),
                    hook_name: hook.name.clone(),
                    event: event.as_str().to_owned(),
                    duration_ms,
                    continue_: output.continue_,
                    error: output.error.clone(),
                    data: output.data.clone().map(Value::Object),
                });
            }

            if let Some(msg) = &output.system_message {
                outcome.system_messages.push(msg.clone());
            }
            if let Some(new_data) = &output.data {
                if let Value::Object(ctx) = &mut context {
                    for (k, v) in new_data {
                        let _ = ctx.insert(k.clone(), v.clone());
                    }
                }
                for (k, v) in new_data {
                    let _ = outcome.data.insert(k.clone(), v.clone());
                }
            }

            let aborted = !output.continue_;
            outcome.executions.push(HookExecution {
                hook_id: hook.id.clone(),
                hook_name: hook.name.clone(),
                event,
                duration_ms,
                output,
            });

            if aborted {
                debug!(hook = %hook.name, "hook aborted event dispatch");
                outcome.aborted = true;
                break;
            }
            if cancel.is_cancelled() {
                break;
            }
        }

        outcome
    }

    /// Run a single hook, folding every failure into a synthetic output.
    async fn run_one(
        &self,
        hook: &Hook,
        event: HookEvent,
        data: &Value,
        cancel: &CancellationToken,
    ) -> HookOutput {
        if let Err(e) = validate_command(&hook.command) {
            return HookOutput::synthetic_error(e.to_string());
        }

        if !self.trust.is_trusted(hook, self.config.trust_workspace)
            && !self.request_approval(hook)
        {
            return HookOutput::synthetic_error(format!("hook '{}' not approved", hook.name));
        }

        let input = match serde_json::to_vec(&HookInput {
            event: event.as_str(),
            data,
        }) {
            Ok(bytes) => bytes,
            Err(e) => return HookOutput::synthetic_error(format!("input serialisation: {e}")),
        };

        self.spawn_and_collect(hook, &input, cancel).await
    }

    /// Prompt for approval and persist the grant.
    fn request_approval(&self, hook: &Hook) -> bool {
        let Some(callback) = &self.approval else {
            return false;
        };
        let Ok(hash) = TrustStore::current_hash(hook) else {
            return false;
        };
        if !callback(hook, &hash) {
            return false;
        }
        match self.trust.approve(hook, "user") {
            Ok(_) => true,
            Err(e) => {
                warn!(hook = %hook.name, error = %e, "failed to persist approval");
                false
            }
        }
    }

    async fn spawn_and_collect(
        &self,
        hook: &Hook,
        input: &[u8],
        cancel: &CancellationToken,
    ) -> HookOutput {
        let mut command = Command::new(&hook.command);
        let _ = command
            .args(&hook.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return HookOutput::synthetic_error(format!(
                    "failed to spawn '{}': {e}",
                    hook.command
                ));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            // EPIPE here just means the hook ignores stdin.
            let _ = stdin.write_all(input).await;
            let _ = stdin.shutdown().await;
            drop(stdin);
        }

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        let total = Arc::new(AtomicUsize::new(0));
        let overflow = CancellationToken::new();
        let out_task = tokio::spawn(read_capped(
            stdout,
            Arc::clone(&total),
            self.config.output_cap_bytes,
            overflow.clone(),
        ));
        let err_task = tokio::spawn(read_capped(
            stderr,
            Arc::clone(&total),
            self.config.output_cap_bytes,
            overflow.clone(),
        ));

        enum Ending {
            Finished,
            TimedOut,
            Cancelled,
            Overflowed,
        }

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);
        let ending = tokio::select! {
            _ = &mut deadline => Ending::TimedOut,
            _ = cancel.cancelled() => Ending::Cancelled,
            _ = overflow.cancelled() => Ending::Overflowed,
            _ = child.wait() => Ending::Finished,
        };

        match ending {
            Ending::Finished => {
                let stdout_bytes = out_task.await.unwrap_or_default();
                let _ = err_task.await;
                if overflow.is_cancelled() {
                    return HookOutput::synthetic_error(format!(
                        "output exceeded {} bytes",
                        self.config.output_cap_bytes
                    ));
                }
                parse_output(&stdout_bytes)
            }
            Ending::TimedOut => {
                graceful_kill(&mut child).await;
                out_task.abort();
                err_task.abort();
                HookOutput::synthetic_error(format!(
                    "timed out after {}ms",
                    self.config.timeout.as_millis()
                ))
            }
            Ending::Cancelled => {
                // Partial output is discarded.
                graceful_kill(&mut child).await;
                out_task.abort();
                err_task.abort();
                HookOutput::synthetic_error("cancelled")
            }
            Ending::Overflowed => {
                graceful_kill(&mut child).await;
                out_task.abort();
                err_task.abort();
                HookOutput::synthetic_error(format!(
                    "output exceeded {} bytes",
                    self.config.output_cap_bytes
                ))
            }
        }
    }
}

/// Read a stream in chunks, charging a shared byte budget. Cancels
/// `overflow` and stops the moment the combined total passes `cap`.
async fn read_capped(
    mut stream: impl AsyncRead + Unpin + Send + 'static,
    total: Arc<AtomicUsize>,
    cap: usize,
    overflow: CancellationToken,
) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8_192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return buf,
            Ok(n) => {
                if total.fetch_add(n, Ordering::SeqCst) + n > cap {
                    overflow.cancel();
                    return buf;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

/// Parse exactly one JSON output object; anything else is synthetic.
fn parse_output(stdout: &[u8]) -> HookOutput {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return HookOutput::synthetic_error("no output");
    }
    match serde_json::from_str::<HookOutput>(trimmed) {
        Ok(output) => output,
        Err(e) => HookOutput::synthetic_error(format!("invalid output: {e}")),
    }
}

/// SIGTERM, a one second grace, then SIGKILL.
async fn graceful_kill(child: &mut Child) {
    if send_sigterm(child)
        && tokio::time::timeout(SIGTERM_GRACE, child.wait())
            .await
            .is_ok()
    {
        return;
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let Some(pid) = rustix::process::Pid::from_raw(pid as i32) else {
        return false;
    };
    rustix::process::kill_process(pid, rustix::process::Signal::TERM).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HookSource;
    use ollm_core::ids::HookId;
    use serde_json::json;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn script_hook(name: &str, source: HookSource, script: &Path, events: Vec<HookEvent>) -> Hook {
        Hook {
            id: HookId::generate(),
            name: name.into(),
            command: "sh".into(),
            args: vec![script.display().to_string()],
            events,
            source,
            source_path: Some(script.to_owned()),
            extension_name: None,
        }
    }

    fn runner_with(
        hooks: Vec<Hook>,
        trust_root: &Path,
        config: HookRunnerConfig,
    ) -> HookRunner {
        let mut registry = HookRegistry::new();
        for hook in hooks {
            registry.register(hook);
        }
        HookRunner::new(registry, Arc::new(TrustStore::load(trust_root)), config)
    }

    #[test]
    fn config_follows_settings() {
        let settings = ollm_settings::HookSettings {
            trust_workspace: true,
            timeout_ms: 5_000,
            output_cap_bytes: 2_048,
        };
        let config = HookRunnerConfig::from(&settings);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.output_cap_bytes, 2_048);
        assert!(config.trust_workspace);
    }

    #[tokio::test]
    async fn well_behaved_hook_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "ok.sh",
            r#"printf '{"continue": true, "systemMessage": "hello from hook"}'"#,
        );
        let hook = script_hook("ok", HookSource::User, &script, vec![HookEvent::BeforeTool]);
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let outcome = runner
            .dispatch(HookEvent::BeforeTool, json!({"tool": "shell"}))
            .await;
        assert!(!outcome.aborted);
        assert_eq!(outcome.system_messages, vec!["hello from hook"]);
        assert_eq!(outcome.executions.len(), 1);
        assert!(outcome.executions[0].output.error.is_none());
    }

    #[tokio::test]
    async fn hook_receives_event_document_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "stdin.sh",
            r#"input=$(cat)
case "$input" in
  *before_tool*) printf '{"continue": true, "data": {"sawEvent": true}}' ;;
  *) printf '{"continue": true, "data": {"sawEvent": false}}' ;;
esac"#,
        );
        let hook = script_hook("stdin", HookSource::User, &script, vec![HookEvent::BeforeTool]);
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        assert_eq!(outcome.data["sawEvent"], true);
    }

    #[tokio::test]
    async fn abort_stops_dispatch_and_skips_later_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("second-ran");
        let first = write_script(
            dir.path(),
            "first.sh",
            r#"printf '{"continue": false, "systemMessage": "stop"}'"#,
        );
        let second = write_script(
            dir.path(),
            "second.sh",
            &format!("touch {}\nprintf '{{\"continue\": true}}'", marker.display()),
        );

        let runner = runner_with(
            vec![
                script_hook("first", HookSource::User, &first, vec![HookEvent::BeforeTool]),
                script_hook("second", HookSource::User, &second, vec![HookEvent::BeforeTool]),
            ],
            dir.path(),
            HookRunnerConfig::default(),
        );

        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        assert!(outcome.aborted);
        assert_eq!(outcome.system_messages, vec!["stop"]);
        assert_eq!(outcome.executions.len(), 1);
        assert!(!marker.exists(), "second hook must not run after abort");
    }

    #[tokio::test]
    async fn unapproved_workspace_hook_is_skipped_and_dispatch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let untrusted = write_script(
            dir.path(),
            "untrusted.sh",
            r#"printf '{"continue": true, "systemMessage": "should never appear"}'"#,
        );
        let trusted = write_script(
            dir.path(),
            "trusted.sh",
            r#"printf '{"continue": true, "systemMessage": "ran"}'"#,
        );

        let runner = runner_with(
            vec![
                script_hook(
                    "untrusted",
                    HookSource::Workspace,
                    &untrusted,
                    vec![HookEvent::BeforeTool],
                ),
                script_hook("trusted", HookSource::User, &trusted, vec![HookEvent::BeforeTool]),
            ],
            dir.path(),
            // trust_workspace off: the workspace hook needs an approval it lacks
            HookRunnerConfig::default(),
        );

        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        assert!(!outcome.aborted);
        let untrusted_exec = outcome
            .executions
            .iter()
            .find(|e| e.hook_name == "untrusted")
            .unwrap();
        assert!(
            untrusted_exec
                .output
                .error
                .as_deref()
                .unwrap()
                .contains("not approved")
        );
        assert_eq!(outcome.system_messages, vec!["ran"]);
    }

    #[tokio::test]
    async fn approval_hash_drift_blocks_execution() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "h.sh",
            r#"printf '{"continue": true, "systemMessage": "A ran"}'"#,
        );
        let hook = script_hook(
            "drifting",
            HookSource::Workspace,
            &script,
            vec![HookEvent::BeforeTool],
        );

        let trust = Arc::new(TrustStore::load(dir.path()));
        let _ = trust.approve(&hook, "tester").unwrap();

        let mut registry = HookRegistry::new();
        registry.register(hook);
        let runner = HookRunner::new(registry, Arc::clone(&trust), HookRunnerConfig::default());

        // Approved content executes.
        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        assert_eq!(outcome.system_messages, vec!["A ran"]);

        // Overwrite with same-length content: hash drifts, hook is skipped.
        std::fs::write(
            &script,
            r#"printf '{"continue": true, "systemMessage": "B ran"}'"#,
        )
        .unwrap();
        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        assert!(outcome.system_messages.is_empty());
        assert!(
            outcome.executions[0]
                .output
                .error
                .as_deref()
                .unwrap()
                .contains("not approved")
        );
    }

    #[tokio::test]
    async fn approval_callback_grants_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dl.sh",
            r#"printf '{"continue": true, "systemMessage": "downloaded ran"}'"#,
        );
        let hook = script_hook(
            "downloaded",
            HookSource::Downloaded,
            &script,
            vec![HookEvent::AfterTool],
        );

        let trust = Arc::new(TrustStore::load(dir.path()));
        let mut registry = HookRegistry::new();
        registry.register(hook);
        let runner = HookRunner::new(registry, Arc::clone(&trust), HookRunnerConfig::default())
            .with_approval_callback(Arc::new(|_, hash| hash.starts_with("sha256:")));

        let outcome = runner.dispatch(HookEvent::AfterTool, json!({})).await;
        assert_eq!(outcome.system_messages, vec!["downloaded ran"]);
        assert_eq!(trust.approval_count(), 1);
    }

    #[tokio::test]
    async fn timeout_synthesises_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "slow.sh", "sleep 5\nprintf '{\"continue\": true}'");
        let hook = script_hook("slow", HookSource::User, &script, vec![HookEvent::AfterModel]);
        let runner = runner_with(
            vec![hook],
            dir.path(),
            HookRunnerConfig {
                timeout: Duration::from_millis(200),
                ..HookRunnerConfig::default()
            },
        );

        let outcome = runner.dispatch(HookEvent::AfterModel, json!({})).await;
        let output = &outcome.executions[0].output;
        assert!(output.continue_);
        assert!(output.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn output_cap_kills_and_synthesises_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "noisy.sh", "head -c 100000 /dev/zero");
        let hook = script_hook("noisy", HookSource::User, &script, vec![HookEvent::AfterTool]);
        let runner = runner_with(
            vec![hook],
            dir.path(),
            HookRunnerConfig {
                output_cap_bytes: 1_000,
                ..HookRunnerConfig::default()
            },
        );

        let outcome = runner.dispatch(HookEvent::AfterTool, json!({})).await;
        let output = &outcome.executions[0].output;
        assert!(output.continue_);
        assert!(output.error.as_deref().unwrap().contains("exceeded"));
    }

    #[tokio::test]
    async fn garbage_output_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "garbage.sh", "echo this is not json");
        let hook = script_hook("garbage", HookSource::User, &script, vec![HookEvent::AfterTool]);
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let outcome = runner.dispatch(HookEvent::AfterTool, json!({})).await;
        let output = &outcome.executions[0].output;
        assert!(output.continue_);
        assert!(output.error.as_deref().unwrap().contains("invalid output"));
    }

    #[tokio::test]
    async fn silent_hook_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "silent.sh", "true");
        let hook = script_hook("silent", HookSource::User, &script, vec![HookEvent::AfterTool]);
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let outcome = runner.dispatch(HookEvent::AfterTool, json!({})).await;
        assert_eq!(
            outcome.executions[0].output.error.as_deref(),
            Some("no output")
        );
    }

    #[tokio::test]
    async fn data_merges_left_to_right_and_feeds_later_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_script(
            dir.path(),
            "a-first.sh",
            r#"printf '{"continue": true, "data": {"shared": "first", "a": 1}}'"#,
        );
        let second = write_script(
            dir.path(),
            "b-second.sh",
            r#"input=$(cat)
case "$input" in
  *'"shared":"first"'*) printf '{"continue": true, "data": {"shared": "second", "sawFirst": true}}' ;;
  *) printf '{"continue": true, "data": {"shared": "second", "sawFirst": false}}' ;;
esac"#,
        );

        let runner = runner_with(
            vec![
                script_hook("a", HookSource::User, &first, vec![HookEvent::BeforeAgent]),
                script_hook("b", HookSource::User, &second, vec![HookEvent::BeforeAgent]),
            ],
            dir.path(),
            HookRunnerConfig::default(),
        );

        let outcome = runner.dispatch(HookEvent::BeforeAgent, json!({})).await;
        assert_eq!(outcome.data["shared"], "second");
        assert_eq!(outcome.data["a"], 1);
        assert_eq!(outcome.data["sawFirst"], true);
    }

    #[tokio::test]
    async fn invalid_command_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let hook = Hook {
            id: HookId::generate(),
            name: "evil".into(),
            command: "sh; rm -rf /".into(),
            args: vec![],
            events: vec![HookEvent::BeforeTool],
            source: HookSource::User,
            source_path: None,
            extension_name: None,
        };
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let outcome = runner.dispatch(HookEvent::BeforeTool, json!({})).await;
        let output = &outcome.executions[0].output;
        assert!(output.continue_);
        assert!(output.error.as_deref().unwrap().contains("forbidden character"));
    }

    #[tokio::test]
    async fn hook_executed_events_reach_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "ok.sh", r#"printf '{"continue": true}'"#);
        let hook = script_hook("ok", HookSource::User, &script, vec![HookEvent::SessionStart]);

        let bus = Arc::new(EventBus::default());
        let mut registry = HookRegistry::new();
        registry.register(hook);
        let runner = HookRunner::new(
            registry,
            Arc::new(TrustStore::load(dir.path())),
            HookRunnerConfig::default(),
        )
        .with_bus(Arc::clone(&bus));

        let _ = runner.dispatch(HookEvent::SessionStart, json!({})).await;
        let history = bus.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "hook_executed");
    }

    #[tokio::test]
    async fn cancellation_discards_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "slow.sh",
            "printf 'partial'\nsleep 5\nprintf '{\"continue\": false}'",
        );
        let hook = script_hook("slow", HookSource::User, &script, vec![HookEvent::BeforeModel]);
        let runner = runner_with(vec![hook], dir.path(), HookRunnerConfig::default());

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let cancel_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let outcome = runner
            .dispatch_with_cancel(HookEvent::BeforeModel, json!({}), &cancel)
            .await;
        cancel_task.await.unwrap();

        let output = &outcome.executions[0].output;
        assert!(output.continue_);
        assert_eq!(output.error.as_deref(), Some("cancelled"));
        assert!(!outcome.aborted);
    }
}
