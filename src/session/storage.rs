//! Injectable key/value storage backends for session persistence.
//!
//! A backend is chosen once at construction time: persistent (`FileStorage`),
//! in-process (`MemoryStorage`) or absent (`NoopStorage`, for hosts with no
//! storage at all). Multi-key writes go through [`StorageBackend::apply`], which
//! is all-or-nothing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::StorageError;

/// One mutation inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Set { key: String, value: String },
    Remove { key: String },
}

impl StorageOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        StorageOp::Set { key: key.into(), value: value.into() }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        StorageOp::Remove { key: key.into() }
    }
}

pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply every op or none of them
    fn apply(&self, batch: &[StorageOp]) -> Result<(), StorageError>;

    /// False for backends that silently drop writes
    fn is_persistent(&self) -> bool {
        true
    }
}

fn apply_to_map(map: &mut BTreeMap<String, String>, batch: &[StorageOp]) {
    for op in batch {
        match op {
            StorageOp::Set { key, value } => {
                map.insert(key.clone(), value.clone());
            }
            StorageOp::Remove { key } => {
                map.remove(key);
            }
        }
    }
}

/// Storage for hosts without a persistence layer; reads are always empty
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStorage;

impl StorageBackend for NoopStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn apply(&self, _batch: &[StorageOp]) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().map(|map| map.clone()).unwrap_or_default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(map.get(key).cloned())
    }

    fn apply(&self, batch: &[StorageOp]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        apply_to_map(&mut map, batch);
        Ok(())
    }
}

/// Single JSON document on disk, replaced wholesale on every batch
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `session.json` inside the given directory, creating the directory if needed
    pub fn in_dir(dir: &Path) -> Result<Self, StorageError> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        Ok(Self::new(dir.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn apply(&self, batch: &[StorageOp]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = match self.load() {
            Ok(map) => map,
            Err(StorageError::Serialization(e)) => {
                warn!("Discarding unreadable session file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply_to_map(&mut map, batch);
        self.store(&map)
    }
}
