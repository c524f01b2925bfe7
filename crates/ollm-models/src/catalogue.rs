//! The master model catalogue.
//!
//! A curated table of local models this runtime knows how to budget for.
//! Sizes are user-facing context sizes per tier; the compile step derives
//! the provider-facing 85% values. VRAM estimates are for Q4 quantised
//! weights plus KV cache at the given context size.

use crate::types::{ContextProfile, ModelProfile, effective_context_size};

struct CatalogueEntry {
    id: &'static str,
    name: &'static str,
    max_context_window: u32,
    default_context: u32,
    /// User-facing context size per tier (ascending).
    tier_sizes: [u32; 5],
    /// VRAM estimate in GB per tier size.
    vram_gb: [f64; 5],
    supports_tool_calling: bool,
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        id: "llama3.2:1b",
        name: "Llama 3.2 1B",
        max_context_window: 131_072,
        default_context: 4_096,
        tier_sizes: [2_048, 4_096, 8_192, 16_384, 32_768],
        vram_gb: [1.3, 1.6, 2.1, 3.2, 5.4],
        supports_tool_calling: true,
    },
    CatalogueEntry {
        id: "llama3.2:3b",
        name: "Llama 3.2 3B",
        max_context_window: 131_072,
        default_context: 8_192,
        tier_sizes: [4_096, 8_192, 16_384, 32_768, 65_536],
        vram_gb: [2.6, 3.2, 4.4, 6.8, 11.6],
        supports_tool_calling: true,
    },
    CatalogueEntry {
        id: "llama3.1:8b",
        name: "Llama 3.1 8B",
        max_context_window: 131_072,
        default_context: 8_192,
        tier_sizes: [4_096, 8_192, 16_384, 32_768, 131_072],
        vram_gb: [5.6, 6.4, 8.0, 11.2, 36.0],
        supports_tool_calling: true,
    },
    CatalogueEntry {
        id: "qwen2.5-coder:7b",
        name: "Qwen 2.5 Coder 7B",
        max_context_window: 131_072,
        default_context: 16_384,
        tier_sizes: [4_096, 8_192, 16_384, 32_768, 65_536],
        vram_gb: [5.2, 6.0, 7.6, 10.8, 17.2],
        supports_tool_calling: true,
    },
    CatalogueEntry {
        id: "qwen2.5-coder:14b",
        name: "Qwen 2.5 Coder 14B",
        max_context_window: 131_072,
        default_context: 16_384,
        tier_sizes: [4_096, 8_192, 16_384, 32_768, 65_536],
        vram_gb: [9.6, 10.4, 12.0, 15.2, 21.6],
        supports_tool_calling: true,
    },
    CatalogueEntry {
        id: "mistral:7b",
        name: "Mistral 7B",
        max_context_window: 32_768,
        default_context: 8_192,
        tier_sizes: [4_096, 8_192, 8_192, 16_384, 32_768],
        vram_gb: [5.0, 5.8, 5.8, 7.4, 10.6],
        supports_tool_calling: false,
    },
    CatalogueEntry {
        id: "phi3:mini",
        name: "Phi-3 Mini",
        max_context_window: 128_000,
        default_context: 4_096,
        tier_sizes: [2_048, 4_096, 8_192, 16_384, 32_768],
        vram_gb: [2.4, 2.7, 3.3, 4.5, 6.9],
        supports_tool_calling: false,
    },
];

fn build_profile(entry: &CatalogueEntry) -> ModelProfile {
    ModelProfile {
        id: entry.id.to_owned(),
        name: entry.name.to_owned(),
        max_context_window: entry.max_context_window,
        default_context: entry.default_context,
        context_profiles: entry
            .tier_sizes
            .iter()
            .zip(entry.vram_gb.iter())
            .map(|(&size, &vram)| {
                let size = size.min(entry.max_context_window);
                ContextProfile {
                    size,
                    ollama_context_size: effective_context_size(size),
                    vram_estimate_gb: vram,
                }
            })
            .collect(),
        supports_tool_calling: entry.supports_tool_calling,
    }
}

/// Build the full master catalogue as profiles.
#[must_use]
pub fn master_catalogue() -> Vec<ModelProfile> {
    CATALOGUE.iter().map(build_profile).collect()
}

/// Look up one catalogue entry by installed model id.
#[must_use]
pub fn catalogue_profile(model_id: &str) -> Option<ModelProfile> {
    CATALOGUE
        .iter()
        .find(|e| e.id == model_id)
        .map(build_profile)
}

/// Conservative profile for an installed model the catalogue does not know.
///
/// Small window, small tiers, tool calling off. Enough to open a session;
/// the caller logs the fallback.
#[must_use]
pub fn unknown_model_profile(model_id: &str) -> ModelProfile {
    let tier_sizes = [2_048u32, 4_096, 4_096, 8_192, 8_192];
    ModelProfile {
        id: model_id.to_owned(),
        name: format!("{model_id} (uncatalogued)"),
        max_context_window: 8_192,
        default_context: 4_096,
        context_profiles: tier_sizes
            .iter()
            .map(|&size| ContextProfile {
                size,
                ollama_context_size: effective_context_size(size),
                vram_estimate_gb: 6.0,
            })
            .collect(),
        supports_tool_calling: false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
