//! Persistence media for the favorites slot
//!
//! A medium is a set of named string slots that outlive any single page
//! view. The engine reads one slot at page mount and rewrites it on every
//! favorites change. Concurrent writers are not coordinated: the last write
//! wins.

use crate::error::StorageError;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Trait for favorites persistence media
pub trait FavoritesStorage: Send + Sync {
    /// Reads a slot. `Ok(None)` when it was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces a slot's value
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns the name of this medium
    fn storage_name(&self) -> &'static str;
}

/// Stores each slot as `<dir>/<key>.json`
///
/// Writes go to a uniquely named temp file in the same directory that is
/// renamed over the slot, so a reader never sees a half-written value and
/// concurrent writers never share a temp file.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a file storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::Unavailable(format!("invalid slot name: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl FavoritesStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        fs::create_dir_all(&self.dir)?;

        // Atomic write: write to temp, then rename.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        tracing::debug!(bytes = value.len(), path = %path.display(), "Wrote favorites slot");
        Ok(())
    }

    fn storage_name(&self) -> &'static str {
        "file"
    }
}

/// Keeps slots in memory, shared between clones
///
/// An optional byte quota makes writes fail the way a full browser store does.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the total bytes held across all slots
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Arc::default(),
            quota: Some(quota),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.slots
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".to_string()))
    }

    /// Overwrites a slot without any checks. Useful to plant corrupt data.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl FavoritesStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.lock()?;

        if let Some(quota) = self.quota {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn storage_name(&self) -> &'static str {
        "memory"
    }
}
