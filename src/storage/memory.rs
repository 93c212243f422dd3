//! In-Memory Storage
//!
//! Default backend: values live in a HashMap. Never fails.

use std::collections::HashMap;

use crate::storage::{StorageBackend, StorageError};

// == Memory Storage ==
/// Stores cached values in-memory.
#[derive(Debug, Default)]
pub struct MemoryStorage<V> {
    values: HashMap<String, V>,
}

impl<V> MemoryStorage<V> {
    // == Constructor ==
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<V: Clone> StorageBackend<V> for MemoryStorage<V> {
    fn get(&self, key: &str) -> Result<Option<V>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: V) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.contains_key(key))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.values.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.values.keys().cloned().collect())
    }
}
