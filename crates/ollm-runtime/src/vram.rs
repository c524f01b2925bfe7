//! VRAM pressure monitoring.
//!
//! A session's context size is fixed at open and never resized. When
//! available VRAM drops below what the active context profile expects,
//! the monitor emits a warning on the bus and nothing else.

use std::sync::Arc;

use tracing::warn;

use ollm_core::conversation::Tier;
use ollm_core::events::BusEvent;
use ollm_core::ids::SessionId;
use ollm_events::EventBus;
use ollm_models::ModelProfile;

/// Warns when available VRAM falls below the active profile estimate.
pub struct VramMonitor {
    bus: Arc<EventBus>,
    session_id: SessionId,
    estimated_gb: f64,
}

impl VramMonitor {
    /// Create a monitor for one session's active context profile.
    #[must_use]
    pub fn new(bus: Arc<EventBus>, session_id: SessionId, profile: &ModelProfile, tier: Tier) -> Self {
        Self {
            bus,
            session_id,
            estimated_gb: profile.profile_for_tier(tier).vram_estimate_gb,
        }
    }

    /// The GB estimate being compared against.
    #[must_use]
    pub fn estimated_gb(&self) -> f64 {
        self.estimated_gb
    }

    /// Report a fresh VRAM reading. Emits `low_memory_warning` and returns
    /// true when the reading is below the estimate. The context size is
    /// never changed.
    pub fn report(&self, available_gb: f64) -> bool {
        if available_gb >= self.estimated_gb {
            return false;
        }
        warn!(
            available_gb,
            estimated_gb = self.estimated_gb,
            "available VRAM below active context profile estimate"
        );
        self.bus.emit(&BusEvent::LowMemoryWarning {
            session_id: self.session_id.clone(),
            available_gb,
            estimated_gb: self.estimated_gb,
        });
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ollm_models::ModelRegistry;

    fn monitor(bus: Arc<EventBus>) -> VramMonitor {
        let registry = ModelRegistry::compile(&["llama3.2:3b".to_owned()]);
        let profile = registry.get("llama3.2:3b").unwrap();
        VramMonitor::new(bus, SessionId::from_string("sess-v"), profile, Tier::Basic)
    }

    #[test]
    fn plenty_of_vram_is_silent() {
        let bus = Arc::new(EventBus::default());
        let m = monitor(Arc::clone(&bus));
        assert!(!m.report(m.estimated_gb() + 1.0));
        assert!(bus.history().is_empty());
    }

    #[test]
    fn low_vram_warns_on_bus() {
        let bus = Arc::new(EventBus::default());
        let m = monitor(Arc::clone(&bus));
        assert!(m.report(m.estimated_gb() - 1.0));
        let history = bus.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "low_memory_warning");
    }
}
