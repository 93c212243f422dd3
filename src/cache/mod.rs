//! Cache Module
//!
//! Size-bounded LRU caching with TTL expiry over a pluggable storage backend.

mod engine;
mod entry;
mod expiry;
mod recency;
mod sizeof;
mod stats;


// Re-export public types
pub use engine::CacheEngine;
pub use entry::EntryMeta;
pub use expiry::ExpiryIndex;
pub use recency::RecencyIndex;
pub use sizeof::{default_sizeof, ByteWeight, SizeOfFn};
pub use stats::CacheStats;
