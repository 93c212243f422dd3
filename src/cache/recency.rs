//! Recency Index Module
//!
//! Tracks key access order for LRU eviction.

use std::collections::{BTreeMap, HashMap};

// == Recency Index ==
/// Ordered index of keys from least- to most-recently-used.
///
/// Each touch assigns the key the next value of a monotonic sequence, so the
/// smallest sequence number is always the LRU key. Ties are impossible by
/// construction, which makes eviction order deterministic regardless of
/// timestamp resolution.
#[derive(Debug, Default)]
pub struct RecencyIndex {
    /// Next sequence number to hand out
    seq: u64,
    /// Key -> its current sequence number
    by_key: HashMap<String, u64>,
    /// Sequence number -> key, ordered oldest first
    by_seq: BTreeMap<u64, String>,
}

impl RecencyIndex {
    // == Constructor ==
    /// Creates a new empty recency index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most-recently-used, inserting it if absent.
    pub fn touch(&mut self, key: &str) {
        if let Some(old_seq) = self.by_key.remove(key) {
            self.by_seq.remove(&old_seq);
        }
        let seq = self.seq;
        self.seq += 1;
        self.by_key.insert(key.to_string(), seq);
        self.by_seq.insert(seq, key.to_string());
    }

    // == Remove ==
    /// Removes a key from the index; no-op if absent.
    pub fn remove(&mut self, key: &str) {
        if let Some(seq) = self.by_key.remove(key) {
            self.by_seq.remove(&seq);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the index is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (&seq, _) = self.by_seq.iter().next()?;
        let key = self.by_seq.remove(&seq)?;
        self.by_key.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.by_seq.values().next().map(String::as_str)
    }

    // == Iterate ==
    /// Iterates keys from oldest to newest.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        self.by_seq.values().map(String::as_str)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    // == Clear ==
    /// Removes all tracked keys.
    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_seq.clear();
    }
}
