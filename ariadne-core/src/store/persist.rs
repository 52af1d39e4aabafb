// Snapshot persistence backends. The store writes the full node/edge
// snapshot after every mutation and reads it back once on open.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;
use crate::types::CanvasSnapshot;

/// Durable home for the canvas snapshot.
pub trait SnapshotPersistence: Send + Sync + std::fmt::Debug {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> crate::error::Result<Option<CanvasSnapshot>>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: &CanvasSnapshot) -> crate::error::Result<()>;
}

// ── JSON file ───────────────────────────────────────────────────────

/// Stores the snapshot as pretty JSON in a single file.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact. There is no
/// locking: two stores on one file each overwrite the other's snapshot.
#[derive(Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotPersistence for JsonFilePersistence {
    fn load(&self) -> crate::error::Result<Option<CanvasSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path).map_err(StoreError::Io)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let snapshot: CanvasSnapshot =
            serde_json::from_str(&text).map_err(StoreError::Serialization)?;
        debug!(
            path = %self.path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "Loaded canvas snapshot"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &CanvasSnapshot) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }
        let json = serde_json::to_string_pretty(snapshot).map_err(StoreError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(StoreError::Io)?;
        std::fs::rename(&tmp, &self.path).map_err(StoreError::Io)?;
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// Keeps the last saved snapshot in memory. Used for ephemeral stores and tests.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<CanvasSnapshot>>,
    saves: Mutex<u64>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an existing snapshot, as if a previous session had saved it.
    pub fn with_snapshot(snapshot: CanvasSnapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    pub fn last_saved(&self) -> Option<CanvasSnapshot> {
        self.saved.lock().expect("memory persistence mutex poisoned").clone()
    }

    pub fn save_count(&self) -> u64 {
        *self.saves.lock().expect("memory persistence mutex poisoned")
    }
}

impl SnapshotPersistence for MemoryPersistence {
    fn load(&self) -> crate::error::Result<Option<CanvasSnapshot>> {
        Ok(self.last_saved())
    }

    fn save(&self, snapshot: &CanvasSnapshot) -> crate::error::Result<()> {
        *self.saved.lock().expect("memory persistence mutex poisoned") = Some(snapshot.clone());
        *self.saves.lock().expect("memory persistence mutex poisoned") += 1;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
