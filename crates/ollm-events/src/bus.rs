//! The event bus.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

use ollm_core::events::BusEvent;

/// Default bounded history size.
pub const DEFAULT_HISTORY_SIZE: usize = 1_024;

/// Capacity of the internal broadcast channel backing [`EventBus::wait_for`].
const WAITER_CHANNEL_CAPACITY: usize = 256;

/// What a subscriber handler returns. `Err` is caught and recorded; it never
/// aborts dispatch.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Handler = Box<dyn Fn(&BusEvent) -> HandlerResult + Send + Sync>;

/// Opaque handle for unsubscribing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One record of a past emission.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    /// Event name.
    pub name: String,
    /// When it was emitted.
    pub at: DateTime<Utc>,
    /// Errors returned by handlers during this emission, in dispatch order.
    pub handler_errors: Vec<String>,
}

struct Subscription {
    id: SubscriptionId,
    pattern: String,
    priority: i32,
    seq: u64,
    handler: Handler,
}

struct Inner {
    subscriptions: Vec<Arc<Subscription>>,
    history: VecDeque<HistoryEntry>,
    history_cap: usize,
    next_seq: u64,
}

/// Priority-ordered in-process pub/sub with a bounded history ring.
pub struct EventBus {
    inner: Mutex<Inner>,
    waiters: broadcast::Sender<Arc<BusEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl EventBus {
    /// Create a bus with the given history capacity.
    #[must_use]
    pub fn new(history_cap: usize) -> Self {
        let (waiters, _) = broadcast::channel(WAITER_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                subscriptions: Vec::new(),
                history: VecDeque::with_capacity(history_cap.min(64)),
                history_cap,
                next_seq: 0,
            }),
            waiters,
        }
    }

    /// Register a handler for events matching `pattern`.
    ///
    /// `pattern` is an exact event name, `*` for every event, or a prefix
    /// ending in `*` (e.g. `snapshot_*`). Higher `priority` runs earlier
    /// within one emission; ties run in registration order.
    pub fn subscribe(
        &self,
        pattern: impl Into<String>,
        priority: i32,
        handler: impl Fn(&BusEvent) -> HandlerResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let id = SubscriptionId(seq);
        inner.subscriptions.push(Arc::new(Subscription {
            id,
            pattern: pattern.into(),
            priority,
            seq,
            handler: Box::new(handler),
        }));
        // Keep dispatch order materialised: priority desc, then seq asc.
        inner
            .subscriptions
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|s| s.id != id);
        inner.subscriptions.len() != before
    }

    /// Emit an event to all matching subscribers.
    ///
    /// Handlers run synchronously on the caller. A handler error is logged
    /// and recorded in history; dispatch continues with the next handler.
    pub fn emit(&self, event: &BusEvent) {
        let name = event.name();
        let mut errors = Vec::new();
        // Snapshot the dispatch list so handlers may subscribe or emit
        // re-entrantly without deadlocking on the bus lock.
        let subs: Vec<Arc<Subscription>> = self.inner.lock().subscriptions.clone();
        for sub in &subs {
            if !pattern_matches(&sub.pattern, name) {
                continue;
            }
            if let Err(e) = (sub.handler)(event) {
                warn!(event = name, error = %e, "event handler failed");
                errors.push(e.to_string());
            }
        }
        let mut inner = self.inner.lock();
        if inner.history.len() == inner.history_cap {
            let _ = inner.history.pop_front();
        }
        inner.history.push_back(HistoryEntry {
            name: name.to_owned(),
            at: Utc::now(),
            handler_errors: errors,
        });
        drop(inner);
        // Waiters are best-effort; a lagging receiver only affects itself.
        let _ = self.waiters.send(Arc::new(event.clone()));
    }

    /// The recorded history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.iter().cloned().collect()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    /// Wait for the next event matching `pattern`, up to `timeout`.
    ///
    /// Test helper; also usable by observers that poll rather than
    /// subscribe. Only events emitted after the call are observed.
    pub async fn wait_for(
        &self,
        pattern: &str,
        timeout: std::time::Duration,
    ) -> Option<Arc<BusEvent>> {
        let mut rx = self.waiters.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(tokio::time::Instant::now())?;
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(ev)) if pattern_matches(pattern, ev.name()) => return Some(ev),
                Ok(Ok(_)) => {}
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
            }
        }
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    pattern == name
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
