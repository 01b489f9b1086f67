//! In-memory response cache with time-to-live
//!
//! Unlike a classic TTL cache, expired entries are kept: when every mirror
//! fails the client serves them as stale data. An entry is only ever replaced
//! by a newer write to the same key.
//!
//! By default the cache is unbounded, one entry per distinct query ever made.
//! A capacity can be set, in which case inserting a new key into a full cache
//! evicts the entry stored the longest ago.

use parking_lot::RwLock;
use pmoutils::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default TTL for directory responses (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// One cached value
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still within its TTL at `now`
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Keyed cache shared by every clone of a client
pub struct ResponseCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    capacity: Option<usize>,
}

impl<T: Clone> ResponseCache<T> {
    /// Create an unbounded cache
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl,
            capacity: None,
        }
    }

    /// Bound the number of entries (`0` keeps the cache unbounded)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = (capacity > 0).then_some(capacity);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Data stored under `key`, if it is within its TTL
    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.data.clone())
    }

    /// Data stored under `key`, whatever its age
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.entries.read().get(key).map(|entry| entry.data.clone())
    }

    /// Store `data` under `key`, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, data: T) {
        let key = key.into();
        let entry = CacheEntry {
            data,
            stored_at: self.clock.now(),
            ttl: self.ttl,
        };

        let mut entries = self.entries.write();
        if let Some(capacity) = self.capacity {
            if !entries.contains_key(&key) && entries.len() >= capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(key = %oldest, "Evicting oldest cache entry");
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, entry);
    }

    /// Full entry stored under `key`
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
