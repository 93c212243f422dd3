//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::storage::StorageError;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key was present but its max age has elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// A single value's estimated size exceeds the configured max_size
    #[error("Value for key '{key}' is too large: {size} bytes exceeds max_size of {max_size}")]
    ValueTooLarge {
        key: String,
        size: u64,
        max_size: u64,
    },

    /// The size estimator could not produce a size for a value
    #[error("Size estimation failed for key: {0}")]
    SizeEstimationFailed(String),

    /// A storage backend operation failed
    #[error("Storage backend error: {0}")]
    Storage(#[from] StorageError),
}

impl CacheError {
    /// True for the two miss variants produced by reads.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
