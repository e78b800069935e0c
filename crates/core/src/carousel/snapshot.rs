//! Durable record of which content sits on which page.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::{CatalogError, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub index: usize,
    pub content_id: String,
    #[serde(default)]
    pub scan_code: Option<String>,
}

/// Whole-carousel snapshot, written in one piece so the page count and the
/// per-page records can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub version: u32,
    pub total_pages: usize,
    #[serde(default)]
    pub records: Vec<PageRecord>,
}

impl PageSnapshot {
    pub fn new(total_pages: usize, records: Vec<PageRecord>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            total_pages,
            records,
        }
    }

    /// Snapshot of a carousel holding only the home page.
    pub fn home_only() -> Self {
        Self::new(1, Vec::new())
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(CatalogError::SnapshotVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            })
        }
    }
}

pub trait SnapshotStore {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<PageSnapshot>>;

    fn save(&mut self, snapshot: &PageSnapshot) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

/// Snapshot stored as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<PageSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let snapshot: PageSnapshot = serde_json::from_str(&raw)?;
        snapshot.check_version()?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &PageSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Write a sibling first and rename over the target so readers only
        // ever see a complete snapshot.
        let staging = self.staging_path();
        fs::write(&staging, serde_json::to_string_pretty(snapshot)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store. Clones share the same slot, so a test can keep one
/// handle while the carousel owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<PageSnapshot>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PageSnapshot) -> Self {
        let store = Self::new();
        if let Ok(mut slot) = store.slot.lock() {
            *slot = Some(snapshot);
        }
        store
    }

    pub fn snapshot(&self) -> Result<Option<PageSnapshot>> {
        Ok(self.lock_slot()?.clone())
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|saves| *saves).unwrap_or(0)
    }

    fn lock_slot(&self) -> Result<MutexGuard<'_, Option<PageSnapshot>>> {
        self.slot
            .lock()
            .map_err(|_| CatalogError::msg("snapshot slot has been poisoned"))
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<PageSnapshot>> {
        let snapshot = self.snapshot()?;
        if let Some(snapshot) = &snapshot {
            snapshot.check_version()?;
        }
        Ok(snapshot)
    }

    fn save(&mut self, snapshot: &PageSnapshot) -> Result<()> {
        *self.lock_slot()? = Some(snapshot.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.lock_slot()? = None;
        Ok(())
    }
}
