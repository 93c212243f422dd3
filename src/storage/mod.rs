//! Storage Backends
//!
//! The cache engine delegates value persistence to a pluggable backend and
//! keeps all recency/expiry bookkeeping on its own side. Backends only need
//! to store and retrieve values by string key; they are never consulted for
//! ordering.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

// == Storage Error Enum ==
/// Failure raised by a storage backend operation.
///
/// The engine propagates these unchanged; retry policy is the caller's
/// responsibility.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failure (disk-backed backends)
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

// == Storage Backend Trait ==
/// Capability interface consumed by the cache engine.
///
/// Implementations persist values keyed by string. The engine holds its own
/// lock around every backend call, but that lock does not extend to other
/// processes: whether a backend instance may be opened concurrently by
/// another process is a property of the backend, not of the engine.
pub trait StorageBackend<V> {
    /// Returns the value for `key`, or None if absent.
    fn get(&self, key: &str) -> Result<Option<V>, StorageError>;

    /// Stores `value` under `key`, replacing any prior value.
    fn set(&mut self, key: &str, value: V) -> Result<(), StorageError>;

    /// Removes `key` if present; no-op otherwise.
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;

    /// Checks whether `key` is present.
    fn contains(&self, key: &str) -> Result<bool, StorageError>;

    /// Removes all stored values.
    fn clear(&mut self) -> Result<(), StorageError>;

    /// Lists all stored keys, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
