//! The hash-pinned trust store.
//!
//! Approvals are keyed by the hook's script path (when it has one) or a
//! synthetic key over command + args + source + extension. The stored hash
//! is `sha256:<hex>` of the script file content (or of the synthetic key
//! material for path-less hooks). An approval is valid only while the hash
//! still matches, so editing an approved script silently un-approves it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::{HookError, Result};
use crate::types::{Hook, HookSource};

/// One stored approval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookApproval {
    /// Script path or synthetic key.
    pub source: String,
    /// `sha256:<hex>` over the pinned content.
    pub hash: String,
    /// When the approval was granted.
    pub approved_at: DateTime<Utc>,
    /// Who granted it.
    pub approved_by: String,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrustFile {
    version: u32,
    approvals: Vec<HookApproval>,
}

/// Process-wide, single-writer approval store backed by
/// `<state-root>/trusted-hooks.json`.
pub struct TrustStore {
    path: PathBuf,
    approvals: RwLock<HashMap<String, HookApproval>>,
}

impl TrustStore {
    /// Load the store from `<state_root>/trusted-hooks.json`.
    ///
    /// A missing file means no approvals; a corrupt file is treated the
    /// same with a warning (approvals can be re-granted).
    #[must_use]
    pub fn load(state_root: &Path) -> Self {
        let path = state_root.join("trusted-hooks.json");
        let approvals = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<TrustFile>(&raw) {
                Ok(file) => file
                    .approvals
                    .into_iter()
                    .map(|a| (a.source.clone(), a))
                    .collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "trust store corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            approvals: RwLock::new(approvals),
        }
    }

    /// The approval key for a hook: its script path, or a synthetic key.
    #[must_use]
    pub fn trust_key(hook: &Hook) -> String {
        match &hook.source_path {
            Some(path) => path.display().to_string(),
            None => synthetic_key(hook),
        }
    }

    /// Hash the hook's pinned content as it exists right now.
    ///
    /// File-backed hooks hash the script bytes; path-less hooks hash the
    /// synthetic key material.
    pub fn current_hash(hook: &Hook) -> Result<String> {
        match &hook.source_path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|source| HookError::Hash {
                    path: path.clone(),
                    source,
                })?;
                Ok(sha256_hex(&bytes))
            }
            None => Ok(sha256_hex(synthetic_key(hook).as_bytes())),
        }
    }

    /// Whether a hook may run.
    ///
    /// Builtin/user sources are always trusted; workspace sources follow
    /// the `trust_workspace` setting; everything else needs an approval
    /// whose hash still matches the current content.
    #[must_use]
    pub fn is_trusted(&self, hook: &Hook, trust_workspace: bool) -> bool {
        if hook.source.implicitly_trusted() {
            return true;
        }
        if hook.source == HookSource::Workspace && trust_workspace {
            return true;
        }
        let Ok(current) = Self::current_hash(hook) else {
            return false;
        };
        let key = Self::trust_key(hook);
        let approvals = self.approvals.read();
        match approvals.get(&key) {
            Some(approval) if approval.hash == current => true,
            Some(_) => {
                debug!(key, "approval hash drifted, treating as un-approved");
                false
            }
            None => false,
        }
    }

    /// Record an approval for the hook's current content and persist.
    pub fn approve(&self, hook: &Hook, approved_by: &str) -> Result<HookApproval> {
        let approval = HookApproval {
            source: Self::trust_key(hook),
            hash: Self::current_hash(hook)?,
            approved_at: Utc::now(),
            approved_by: approved_by.to_owned(),
        };
        {
            let mut approvals = self.approvals.write();
            let _ = approvals.insert(approval.source.clone(), approval.clone());
        }
        self.persist()?;
        Ok(approval)
    }

    /// Remove an approval by key. Returns whether one existed.
    pub fn revoke(&self, key: &str) -> Result<bool> {
        let existed = self.approvals.write().remove(key).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    /// Number of stored approvals.
    #[must_use]
    pub fn approval_count(&self) -> usize {
        self.approvals.read().len()
    }

    fn persist(&self) -> Result<()> {
        let mut approvals: Vec<HookApproval> = self.approvals.read().values().cloned().collect();
        approvals.sort_by(|a, b| a.source.cmp(&b.source));
        let file = TrustFile {
            version: 1,
            approvals,
        };
        let body = serde_json::to_vec_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| HookError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        std::fs::write(&self.path, body).map_err(|source| HookError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn synthetic_key(hook: &Hook) -> String {
    format!(
        "{}|{}|{:?}|{}",
        hook.command,
        hook.args.join("\u{1f}"),
        hook.source,
        hook.extension_name.as_deref().unwrap_or("")
    )
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(7 + digest.len() * 2);
    out.push_str("sha256:");
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
