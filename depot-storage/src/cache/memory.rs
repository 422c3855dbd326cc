//! In-process tier: bounded LRU plus a per-key expiry index.
//!
//! Expiry is checked on read only. An expired entry is removed from both
//! structures when it is next touched; there is no background sweep.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use depot_core::{DepotConfig, DepotError, DepotResult, DEFAULT_UPSTREAM_TIMEOUT};
use lru::LruCache;

use super::clock::{Clock, SystemClock};
use super::traits::{Cache, CacheStats, Counters, Source, Tier};
use crate::timeout::bounded;

struct Entries {
    values: LruCache<String, Vec<u8>>,
    expires_at: HashMap<String, Instant>,
}

/// LRU cache whose entries also expire `ttl` after insertion.
pub struct ExpiringLruCache {
    entries: Mutex<Entries>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ExpiringLruCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize, ttl: Duration) -> DepotResult<Self> {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> DepotResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| DepotError::config("cache_capacity", "must be greater than zero"))?;
        Ok(Self {
            entries: Mutex::new(Entries {
                values: LruCache::new(capacity),
                expires_at: HashMap::new(),
            }),
            ttl,
            clock,
            counters: Counters::default(),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `key` is held in either structure, expired or not.
    pub fn contains_raw(&self, key: &str) -> bool {
        let entries = self.lock();
        entries.values.contains(key) || entries.expires_at.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len() as u64)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Cache for ExpiringLruCache {
    fn add(&self, key: &str, value: Vec<u8>) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.lock();
        if let Some((evicted, _)) = entries.values.push(key.to_string(), value) {
            if evicted != key {
                entries.expires_at.remove(&evicted);
                self.counters.evicted();
            }
        }
        entries.expires_at.insert(key.to_string(), expires_at);
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let Entries { values, expires_at } = &mut *entries;

        let fresh = expires_at.get(key).is_some_and(|at| now < *at);
        if fresh {
            if let Some(value) = values.get(key) {
                self.counters.hit();
                return Some(value.clone());
            }
        }

        values.pop(key);
        expires_at.remove(key);
        self.counters.miss();
        None
    }
}

/// In-process tier over a [`Source`].
pub struct MemoryTier<S> {
    cache: ExpiringLruCache,
    source: S,
    fetch_timeout: Duration,
}

impl<S: Source> MemoryTier<S> {
    pub fn new(cache: ExpiringLruCache, source: S) -> Self {
        Self {
            cache,
            source,
            fetch_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn from_config(config: &DepotConfig, source: S) -> DepotResult<Self> {
        let cache = ExpiringLruCache::new(config.cache_capacity, config.cache_ttl)?;
        Ok(Self::new(cache, source).with_fetch_timeout(config.upstream_timeout))
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn cache(&self) -> &ExpiringLruCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: Source> Tier for MemoryTier<S> {
    async fn fetch(&self, key: &str) -> DepotResult<Vec<u8>> {
        if let Some(value) = self.cache.get(key) {
            tracing::debug!(key = %key, "Memory tier hit");
            return Ok(value);
        }

        tracing::debug!(key = %key, "Memory tier miss");
        let (value, _token) = bounded(
            "fetch_from_source",
            self.fetch_timeout,
            self.source.fetch_from_source(key),
        )
        .await?;
        self.cache.add(key, value.clone());
        Ok(value)
    }

    fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
