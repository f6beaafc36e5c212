//! Concurrent response cache with LRU eviction and TTL expiration.
//!
//! Entries live in a sharded map so lookups for unrelated keys never contend.
//! Recency is tracked with a process-wide access counter rather than a linked
//! list, which keeps every operation lock-free outside a single shard.

use super::key::CacheKey;
use crate::config::CacheConfig;
use aegis_core::{CausalAnalysis, ModelTier, PromptRequest};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// A stored response with the metadata needed to serve it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached text
    pub response: String,
    /// Tier that originally produced it
    pub tier: ModelTier,
    /// Backend identifier that originally produced it
    pub model: String,
    /// Cost of the original generation
    pub cost: f64,
    /// When this entry was created
    pub created_at: SystemTime,
    /// Times this entry has been served from the cache
    pub hit_count: u64,
    /// Analysis performed when the response was generated
    pub causal_analysis: Option<CausalAnalysis>,
}

impl CacheEntry {
    /// Creates a fresh entry.
    pub fn new(
        response: impl Into<String>,
        tier: ModelTier,
        model: impl Into<String>,
        cost: f64,
    ) -> Self {
        Self {
            response: response.into(),
            tier,
            model: model.into(),
            cost,
            created_at: SystemTime::now(),
            hit_count: 0,
            causal_analysis: None,
        }
    }

    /// Attaches the analysis of the cached response.
    #[must_use]
    pub fn with_analysis(mut self, analysis: Option<CausalAnalysis>) -> Self {
        self.causal_analysis = analysis;
        self
    }
}

/// Entry plus bookkeeping that never leaves the cache.
#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    inserted_at: Instant,
    last_access: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in the cache
    pub entries: usize,
    /// Lookups that returned an entry
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Entries removed to respect capacity
    pub evictions: u64,
    /// Entries removed because their TTL passed
    pub expirations: u64,
}

/// In-memory response cache shared by all request handlers.
pub struct ResponseCache {
    entries: DashMap<CacheKey, Slot>,
    config: CacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ResponseCache {
    /// Creates a new response cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Key under which `request` is stored.
    pub fn key_for(&self, request: &PromptRequest) -> CacheKey {
        CacheKey::fingerprint(request, self.config.temperature_bucket)
    }

    const fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_secs)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the entry for `key` if present and fresh, marking it recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        let ttl = self.ttl();
        let found = self.entries.get_mut(key).map(|mut slot| {
            if slot.inserted_at.elapsed() < ttl {
                slot.last_access = self.tick();
                slot.entry.hit_count += 1;
                Some(slot.entry.clone())
            } else {
                None
            }
        });

        match found {
            Some(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(None) => {
                if self
                    .entries
                    .remove_if(key, |_, slot| slot.inserted_at.elapsed() >= ttl)
                    .is_some()
                {
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores an entry, replacing any previous one, then evicts down to capacity.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        if !self.config.enabled {
            return;
        }

        let slot = Slot {
            entry,
            inserted_at: Instant::now(),
            last_access: self.tick(),
        };
        self.entries.insert(key, slot);
        self.enforce_capacity();
    }

    /// Evicts least-recently-used entries until the cache fits its capacity.
    ///
    /// Finding the victim scans every entry, so an insert into a full cache
    /// costs O(capacity). Inserts below capacity do not scan.
    fn enforce_capacity(&self) {
        while self.entries.len() > self.config.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|slot| slot.value().last_access)
                .map(|slot| (slot.key().clone(), slot.value().last_access));

            let Some((key, last_access)) = victim else {
                break;
            };

            // Skip if the entry was touched after it was picked
            if self
                .entries
                .remove_if(&key, |_, slot| slot.last_access == last_access)
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "evicted least recently used cache entry");
            }
        }
    }

    /// Removes every expired entry, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.ttl();
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let fresh = slot.inserted_at.elapsed() < ttl;
            if !fresh {
                removed += 1;
            }
            fresh
        });
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Clears all entries from the cache
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
