//! # ollm-models
//!
//! Static description of installed models and their context-size economics.
//!
//! At startup the master catalogue is compiled against the set of installed
//! models into a [`ModelRegistry`], persisted as `LLM_profiles.json` under
//! the state root. Each profile carries per-tier [`ContextProfile`]s whose
//! `ollama_context_size` is the 85%-rounded value actually sent to the
//! provider (the *effective cap*). Installed models missing from the
//! catalogue get a conservative unknown-model profile and a warning; they
//! never fail session open.
//!
//! The registry is read-only after startup.

#![deny(unsafe_code)]

pub mod catalogue;
pub mod errors;
pub mod registry;
pub mod types;

pub use catalogue::{master_catalogue, unknown_model_profile};
pub use errors::{ProfileError, Result};
pub use registry::ModelRegistry;
pub use types::{ContextProfile, ModelProfile, effective_context_size};
