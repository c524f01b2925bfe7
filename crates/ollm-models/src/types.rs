//! Profile types.

use serde::{Deserialize, Serialize};

use ollm_core::conversation::Tier;

/// One selectable context size for a model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextProfile {
    /// User-facing context size in tokens.
    pub size: u32,
    /// The 85%-rounded value sent to the provider as `num_ctx`. This is the
    /// session's effective cap.
    pub ollama_context_size: u32,
    /// Estimated VRAM needed to serve this context size, in GB.
    pub vram_estimate_gb: f64,
}

/// Static description of one installed model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    /// Model identifier as installed (e.g. `llama3.2:3b`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Advertised maximum context window.
    pub max_context_window: u32,
    /// Recommended default user-facing context size.
    pub default_context: u32,
    /// Per-tier context profiles, ascending; index 0 serves tier 1.
    pub context_profiles: Vec<ContextProfile>,
    /// Whether the model reliably emits structured tool calls.
    pub supports_tool_calling: bool,
}

impl ModelProfile {
    /// The context profile serving a tier.
    ///
    /// Profiles are ascending by size; a model with fewer profiles than
    /// tiers serves high tiers from its largest profile.
    #[must_use]
    pub fn profile_for_tier(&self, tier: Tier) -> &ContextProfile {
        let idx = usize::from(tier.level() - 1).min(self.context_profiles.len() - 1);
        &self.context_profiles[idx]
    }

    /// The effective token cap for a session at `tier`.
    #[must_use]
    pub fn effective_cap(&self, tier: Tier) -> u32 {
        self.profile_for_tier(tier).ollama_context_size
    }
}

/// The 85%-of-window rounding used for every `ollama_context_size`.
#[must_use]
pub fn effective_context_size(user_facing_size: u32) -> u32 {
    (f64::from(user_facing_size) * 0.85).round() as u32
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
