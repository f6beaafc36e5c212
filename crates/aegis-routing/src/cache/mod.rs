//! Response caching keyed by a request fingerprint.
//!
//! Lookups and inserts are safe to call from any number of concurrent
//! request handlers.

/// Request fingerprinting
pub mod key;
/// Cache storage implementation
pub mod storage;

pub use key::CacheKey;
pub use storage::{CacheEntry, CacheStats, ResponseCache};
