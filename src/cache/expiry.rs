//! Expiry Index Module
//!
//! Tracks per-key expiry deadlines for age-based removal.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

// == Expiry Index ==
/// Maps keys to expiry deadlines (Unix milliseconds).
///
/// A min-heap keyed by deadline lets `sweep_expired` stop as soon as the
/// earliest deadline is in the future, instead of scanning every key. The
/// heap may hold stale entries for keys that were refreshed or removed;
/// the deadline map is authoritative and stale heap entries are skipped
/// during the sweep.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    /// Key -> expiry deadline; authoritative
    deadlines: HashMap<String, u64>,
    /// (deadline, key) min-heap; may contain stale entries
    heap: BinaryHeap<Reverse<(u64, String)>>,
}

impl ExpiryIndex {
    // == Constructor ==
    /// Creates a new empty expiry index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Set Expiry ==
    /// Records or overwrites the expiry deadline for a key.
    pub fn set_expiry(&mut self, key: &str, expires_at: u64) {
        self.deadlines.insert(key.to_string(), expires_at);
        self.heap.push(Reverse((expires_at, key.to_string())));
    }

    // == Clear Key ==
    /// Stops tracking a key; no-op if untracked.
    ///
    /// Any heap entry for the key goes stale and is dropped lazily on a
    /// later sweep.
    pub fn clear_key(&mut self, key: &str) {
        self.deadlines.remove(key);
    }

    // == Expires At ==
    /// Returns the deadline for a key, if it has one.
    pub fn expires_at(&self, key: &str) -> Option<u64> {
        self.deadlines.get(key).copied()
    }

    // == Is Expired ==
    /// Checks whether a key's deadline has passed.
    ///
    /// Boundary condition: a key is expired when `now >= deadline`, so an
    /// entry becomes unavailable the instant its max age has fully elapsed.
    /// Untracked keys never expire.
    pub fn is_expired(&self, key: &str, now: u64) -> bool {
        match self.deadlines.get(key) {
            Some(&expires_at) => now >= expires_at,
            None => false,
        }
    }

    // == Sweep Expired ==
    /// Removes and returns all keys whose deadline has passed.
    ///
    /// Only pops the heap while the earliest deadline is due, so the cost is
    /// proportional to the number of expired (plus stale) entries rather than
    /// the total number of keys. The caller is responsible for removing the
    /// returned keys from storage and the recency index.
    pub fn sweep_expired(&mut self, now: u64) -> Vec<String> {
        let mut expired = Vec::new();

        while let Some(Reverse((deadline, key))) = self.heap.peek().cloned() {
            if deadline > now {
                break;
            }
            self.heap.pop();

            // Stale heap entry: key was removed or refreshed with a newer
            // deadline since this entry was pushed.
            match self.deadlines.get(&key) {
                Some(&current) if current <= now => {
                    self.deadlines.remove(&key);
                    expired.push(key);
                }
                _ => {}
            }
        }

        expired
    }

    // == Length ==
    /// Returns the number of keys with a deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    // == Clear ==
    /// Removes all tracked deadlines.
    pub fn clear(&mut self) {
        self.deadlines.clear();
        self.heap.clear();
    }
}
