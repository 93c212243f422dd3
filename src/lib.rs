//! lru_store - A size-bounded LRU cache with TTL expiry
//!
//! Provides a thread-safe key-value cache that evicts least-recently-used
//! entries under size pressure and expires entries by age, with value
//! storage delegated to a pluggable backend (in-memory or file-backed).

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;
pub mod tasks;

pub use cache::{CacheEngine, CacheStats};
pub use config::Config;
pub use error::{CacheError, Result};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageError};
pub use tasks::{spawn_sweeper, SweeperHandle};
