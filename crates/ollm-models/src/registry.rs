//! The compiled profile registry.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalogue::{catalogue_profile, unknown_model_profile};
use crate::errors::{ProfileError, Result};
use crate::types::ModelProfile;

/// On-disk shape of `LLM_profiles.json`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfilesFile {
    version: u32,
    models: Vec<ModelProfile>,
}

/// Read-only registry of profiles for the installed models.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    profiles: HashMap<String, ModelProfile>,
}

impl ModelRegistry {
    /// Compile the registry from the master catalogue against the set of
    /// installed models.
    ///
    /// Installed models missing from the catalogue get the unknown-model
    /// template and a warning; they never prevent startup.
    #[must_use]
    pub fn compile(installed: &[String]) -> Self {
        let mut profiles = HashMap::with_capacity(installed.len());
        for model_id in installed {
            let profile = match catalogue_profile(model_id) {
                Some(p) => p,
                None => {
                    warn!(
                        model_id,
                        "model not in master catalogue, using unknown-model profile"
                    );
                    unknown_model_profile(model_id)
                }
            };
            let _ = profiles.insert(model_id.clone(), profile);
        }
        info!(count = profiles.len(), "model profile registry compiled");
        Self { profiles }
    }

    /// Look up a profile by model id.
    pub fn get(&self, model_id: &str) -> Result<&ModelProfile> {
        self.profiles
            .get(model_id)
            .ok_or_else(|| ProfileError::ModelUnknown(model_id.to_owned()))
    }

    /// Whether the registry knows the model id.
    #[must_use]
    pub fn contains(&self, model_id: &str) -> bool {
        self.profiles.contains_key(model_id)
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Persist the compiled registry as `LLM_profiles.json`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut models: Vec<ModelProfile> = self.profiles.values().cloned().collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        let file = ProfilesFile { version: 1, models };
        let body = serde_json::to_string_pretty(&file).map_err(|source| ProfileError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ProfileError::Io {
                path: path.to_owned(),
                source,
            })?;
        }
        std::fs::write(path, body).map_err(|source| ProfileError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Load a previously compiled registry.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_owned(),
            source,
        })?;
        let file: ProfilesFile =
            serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
                path: path.to_owned(),
                source,
            })?;
        let profiles = file
            .models
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Ok(Self { profiles })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ollm_core::conversation::Tier;

    #[test]
    fn compile_known_models() {
        let registry =
            ModelRegistry::compile(&["llama3.2:3b".to_owned(), "mistral:7b".to_owned()]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("llama3.2:3b"));
        assert!(registry.get("llama3.2:3b").is_ok());
    }

    #[test]
    fn compile_unknown_model_falls_back() {
        let registry = ModelRegistry::compile(&["my-model:13b".to_owned()]);
        let profile = registry.get("my-model:13b").unwrap();
        assert!(!profile.context_profiles.is_empty());
        assert!(profile.context_profiles[0].ollama_context_size > 0);
        // Session open math still works against the fallback
        assert!(profile.effective_cap(Tier::Minimal) > 0);
    }

    #[test]
    fn missing_model_is_model_unknown() {
        let registry = ModelRegistry::compile(&[]);
        assert!(matches!(
            registry.get("nope"),
            Err(ProfileError::ModelUnknown(_))
        ));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LLM_profiles.json");
        let registry =
            ModelRegistry::compile(&["llama3.1:8b".to_owned(), "phi3:mini".to_owned()]);
        registry.save(&path).unwrap();

        let loaded = ModelRegistry::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get("llama3.1:8b").unwrap(),
            registry.get("llama3.1:8b").unwrap()
        );
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ModelRegistry::load(Path::new("/nope/LLM_profiles.json")).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
    }
}
