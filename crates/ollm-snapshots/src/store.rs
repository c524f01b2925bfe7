//! The snapshot store.
//!
//! On-disk layout:
//!
//! ```text
//! <state-root>/context-snapshots/
//!   snapshot-map.json                  # id -> session_id cache
//!   <session_id>/
//!     snapshots-index.json             # ordered metadata, newest first
//!     snapshot-<snapshot_id>.json      # one file per snapshot
//! ```
//!
//! Writes go directly to the final path: the map + index double-record is
//! the transactional anchor, and any file orphaned by a crash between the
//! data write and the index writes is re-adopted by the reconciliation scan
//! on the next open. The per-session index is authoritative; the root map
//! is a rebuildable cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use ollm_core::ids::{SessionId, SnapshotId};

use crate::errors::{Result, SnapshotError};
use crate::types::{ContextSnapshot, SnapshotMetadata};

/// File-operation retry attempts.
const RETRY_ATTEMPTS: u32 = 5;
/// Backoff between retries. Tolerates transient latency on networked
/// home directories.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

const MAP_FILE: &str = "snapshot-map.json";
const INDEX_FILE: &str = "snapshots-index.json";

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapFile {
    version: u32,
    map: BTreeMap<String, String>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexFile {
    version: u32,
    /// Newest first.
    snapshots: Vec<SnapshotMetadata>,
}

/// Persistent store of [`ContextSnapshot`] records.
pub struct SnapshotStore {
    root: PathBuf,
    max_count: usize,
    /// id -> session cache for O(1) lookup.
    map: DashMap<SnapshotId, SessionId>,
}

impl SnapshotStore {
    /// Open (and reconcile) the store rooted at
    /// `<state_root>/context-snapshots`.
    pub fn open(state_root: &Path, max_count: usize) -> Result<Self> {
        let root = state_root.join("context-snapshots");
        with_retries(&root, || std::fs::create_dir_all(&root))?;
        let store = Self {
            root,
            max_count,
            map: DashMap::new(),
        };
        store.reconcile()?;
        Ok(store)
    }

    /// Persist a snapshot. Returns its id.
    pub fn save(&self, snapshot: &ContextSnapshot) -> Result<SnapshotId> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        let session_dir = self.session_dir(&snapshot.session_id);
        with_retries(&session_dir, || std::fs::create_dir_all(&session_dir))?;

        // 1. Data file, written directly to its final path.
        let path = self.snapshot_path(&snapshot.session_id, &snapshot.id);
        with_retries(&path, || std::fs::write(&path, &body))?;

        // 2. In-memory map, then the two on-disk records. A crash from here
        //    on leaves an orphan the next open re-adopts.
        let _ = self
            .map
            .insert(snapshot.id.clone(), snapshot.session_id.clone());

        let mut index = self.read_index(&snapshot.session_id);
        index.snapshots.insert(0, snapshot.metadata());

        // Rolling cleanup: trim the index first, delete files after the
        // records agree.
        let evicted: Vec<SnapshotMetadata> = if index.snapshots.len() > self.max_count {
            index.snapshots.split_off(self.max_count)
        } else {
            Vec::new()
        };
        for meta in &evicted {
            let _ = self.map.remove(&meta.id);
        }

        self.write_index(&snapshot.session_id, &index)?;
        self.write_map()?;

        for meta in &evicted {
            let old = self.snapshot_path(&snapshot.session_id, &meta.id);
            if let Err(e) = std::fs::remove_file(&old) {
                warn!(path = %old.display(), error = %e, "failed to delete evicted snapshot");
            }
        }

        counter!("snapshots_written_total").increment(1);
        debug!(id = %snapshot.id, session = %snapshot.session_id, "snapshot written");
        Ok(snapshot.id.clone())
    }

    /// Load a snapshot by id.
    pub fn load(&self, id: &SnapshotId) -> Result<ContextSnapshot> {
        let session_id = match self.map.get(id) {
            Some(entry) => entry.value().clone(),
            None => self
                .scan_for_snapshot(id)
                .ok_or_else(|| SnapshotError::NotFound(id.clone()))?,
        };
        let path = self.snapshot_path(&session_id, id);
        if !path.exists() {
            return Err(SnapshotError::NotFound(id.clone()));
        }
        let raw = with_retries(&path, || std::fs::read_to_string(&path))?;
        serde_json::from_str(&raw).map_err(|source| SnapshotError::Corrupt { path, source })
    }

    /// List snapshot metadata for a session, newest first.
    #[must_use]
    pub fn list(&self, session_id: &SessionId) -> Vec<SnapshotMetadata> {
        self.read_index(session_id).snapshots
    }

    /// Delete a snapshot.
    pub fn delete(&self, id: &SnapshotId) -> Result<()> {
        let session_id = match self.map.get(id) {
            Some(entry) => entry.value().clone(),
            None => self
                .scan_for_snapshot(id)
                .ok_or_else(|| SnapshotError::NotFound(id.clone()))?,
        };

        let mut index = self.read_index(&session_id);
        index.snapshots.retain(|m| m.id != *id);
        self.write_index(&session_id, &index)?;

        let _ = self.map.remove(id);
        self.write_map()?;

        let path = self.snapshot_path(&session_id, id);
        if path.exists() {
            with_retries(&path, || std::fs::remove_file(&path))?;
        }
        Ok(())
    }

    /// Number of snapshots known to the in-memory map.
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.map.len()
    }

    // ── Layout ──────────────────────────────────────────────────────────

    fn session_dir(&self, session_id: &SessionId) -> PathBuf {
        self.root.join(session_id.as_str())
    }

    fn snapshot_path(&self, session_id: &SessionId, id: &SnapshotId) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("snapshot-{id}.json"))
    }

    fn map_path(&self) -> PathBuf {
        self.root.join(MAP_FILE)
    }

    fn index_path(&self, session_id: &SessionId) -> PathBuf {
        self.session_dir(session_id).join(INDEX_FILE)
    }

    // ── Index and map records ───────────────────────────────────────────

    /// Read a session index, rebuilding from a directory scan when the file
    /// is missing or fails to parse.
    fn read_index(&self, session_id: &SessionId) -> IndexFile {
        let path = self.index_path(session_id);
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(index) => index,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "index corrupt, rebuilding from scan");
                    self.rebuild_index(session_id)
                }
            },
            Err(_) => self.rebuild_index(session_id),
        }
    }

    fn write_index(&self, session_id: &SessionId, index: &IndexFile) -> Result<()> {
        let path = self.index_path(session_id);
        let body = serde_json::to_vec_pretty(index)?;
        with_retries(&path, || std::fs::write(&path, &body))
    }

    fn write_map(&self) -> Result<()> {
        let file = MapFile {
            version: 1,
            map: self
                .map
                .iter()
                .map(|e| (e.key().to_string(), e.value().to_string()))
                .collect(),
        };
        let path = self.map_path();
        let body = serde_json::to_vec_pretty(&file)?;
        with_retries(&path, || std::fs::write(&path, &body))
    }

    /// Rebuild one session's index by reading its snapshot files.
    fn rebuild_index(&self, session_id: &SessionId) -> IndexFile {
        let dir = self.session_dir(session_id);
        let mut snapshots = Vec::new();
        for entry in WalkDir::new(&dir).max_depth(1).into_iter().flatten() {
            let name = entry.file_name().to_string_lossy();
            if !name.starts_with("snapshot-") || !name.ends_with(".json") {
                continue;
            }
            match std::fs::read_to_string(entry.path())
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<ContextSnapshot>(&raw).map_err(|e| e.to_string())
                }) {
                Ok(snapshot) => snapshots.push(snapshot.metadata()),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping unreadable snapshot during rebuild");
                }
            }
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        IndexFile {
            version: 1,
            snapshots,
        }
    }

    /// Locate a snapshot id by scanning every session directory.
    fn scan_for_snapshot(&self, id: &SnapshotId) -> Option<SessionId> {
        let needle = format!("snapshot-{id}.json");
        for entry in std::fs::read_dir(&self.root).ok()?.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if entry.path().join(&needle).exists() {
                let session_id = SessionId::from_string(entry.file_name().to_string_lossy());
                let _ = self.map.insert(id.clone(), session_id.clone());
                return Some(session_id);
            }
        }
        None
    }

    /// Reconcile the map and every session index against the files on disk.
    ///
    /// Runs at open. Adopts orphans (files written before a crash killed
    /// the index updates), drops stale entries, and rewrites both records
    /// when they drifted. The per-session scan is authoritative.
    fn reconcile(&self) -> Result<()> {
        self.map.clear();
        let mut adopted = 0usize;

        let session_dirs: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .map_err(|e| SnapshotError::from_io(self.root.clone(), e))?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();

        for dir in session_dirs {
            let session_id =
                SessionId::from_string(dir.file_name().unwrap_or_default().to_string_lossy());

            let rebuilt = self.rebuild_index(&session_id);
            let on_disk = self.read_index(&session_id);
            // Authoritative content is the file scan; keep the stored order
            // where it agrees so repeated opens are stable.
            let drifted = on_disk.snapshots.len() != rebuilt.snapshots.len()
                || !on_disk
                    .snapshots
                    .iter()
                    .all(|m| rebuilt.snapshots.iter().any(|r| r.id == m.id));
            let index = if drifted {
                adopted += rebuilt
                    .snapshots
                    .iter()
                    .filter(|r| !on_disk.snapshots.iter().any(|m| m.id == r.id))
                    .count();
                self.write_index(&session_id, &rebuilt)?;
                rebuilt
            } else {
                on_disk
            };

            for meta in &index.snapshots {
                let _ = self.map.insert(meta.id.clone(), session_id.clone());
            }
        }

        self.write_map()?;
        if adopted > 0 {
            info!(adopted, "snapshot reconciliation adopted orphaned files");
        }
        Ok(())
    }
}

/// Run a file operation with bounded retries and backoff.
fn with_retries<T>(path: &Path, mut op: impl FnMut() -> std::io::Result<T>) -> Result<T> {
    let mut last: Option<std::io::Error> = None;
    for attempt in 0..RETRY_ATTEMPTS {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt + 1 < RETRY_ATTEMPTS {
                    std::thread::sleep(RETRY_BACKOFF);
                }
                last = Some(e);
            }
        }
    }
    Err(SnapshotError::from_io(
        path.to_owned(),
        last.expect("at least one attempt ran"),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
