//! File-Backed Storage
//!
//! Persists values to a single JSON file so a cache can outlive the process
//! that filled it. The whole map is loaded at open and rewritten after every
//! mutation; fine for modest caches, not a database.
//!
//! Single-process only: nothing here guards against two processes opening
//! the same file. The engine's lock covers its own callers, not other
//! openers of the path.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::storage::{StorageBackend, StorageError};

// == File Storage ==
/// Stores cached values in a JSON file on disk.
#[derive(Debug)]
pub struct FileStorage<V> {
    path: PathBuf,
    values: HashMap<String, V>,
}

impl<V> FileStorage<V>
where
    V: Serialize + DeserializeOwned,
{
    // == Open ==
    /// Opens (or creates) the store at `path`, loading any existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        debug!(
            "Opened file storage at {} with {} entries",
            path.display(),
            values.len()
        );

        Ok(Self { path, values })
    }

    /// Rewrites the backing file from the in-memory map.
    fn flush(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&self.values)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl<V> StorageBackend<V> for FileStorage<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    fn get(&self, key: &str) -> Result<Option<V>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.contains_key(key))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.values.clear();
        self.flush()
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.keys().cloned().collect())
    }
}
