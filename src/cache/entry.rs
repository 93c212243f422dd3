//! Entry Metadata Module
//!
//! Per-key bookkeeping owned by the engine. Values themselves live in the
//! storage backend; only size and access timestamps are kept here.

use std::time::{SystemTime, UNIX_EPOCH};

// == Entry Metadata ==
/// Engine-side metadata for a single cached entry.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// Estimated size of the stored value, in estimator units (bytes by default)
    pub size: u64,
    /// Timestamp the entry was created or last refreshed (Unix milliseconds)
    pub created_at: u64,
    /// Timestamp the entry was last read or written (Unix milliseconds)
    pub last_used: u64,
}

impl EntryMeta {
    // == Constructor ==
    /// Creates metadata for a freshly stored value.
    pub fn new(size: u64) -> Self {
        let now = current_timestamp_ms();
        Self {
            size,
            created_at: now,
            last_used: now,
        }
    }

    // == Touch ==
    /// Updates the last-used timestamp to now.
    pub fn touch(&mut self) {
        self.last_used = current_timestamp_ms();
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Computes the expiry deadline `ttl` after `now`, in Unix milliseconds.
///
/// Saturates at `u64::MAX` instead of overflowing, so an "effectively
/// never" TTL like `Duration::from_secs(u64::MAX)` yields a deadline in
/// the far future rather than a wrapped-around past one.
pub fn deadline_ms(now: u64, ttl: std::time::Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now.saturating_add(ttl_ms)
}
