//! Cache, source and tier traits.
//!
//! A [`Source`] is whatever a tier fetches from on a miss: a content store,
//! a remote Version API, or another tier. Every tier exposes the same
//! [`Tier::fetch`] contract so tiers can be stacked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use depot_core::{ChangeToken, DepotResult};

/// Synchronous key/value cache surface.
///
/// Implementations must be safe for concurrent reads and writes against one
/// shared instance.
pub trait Cache: Send + Sync {
    /// Insert or replace `key`.
    fn add(&self, key: &str, value: Vec<u8>);

    /// Look up `key`. Expired entries are reported as misses.
    fn get(&self, key: &str) -> Option<Vec<u8>>;
}

/// Upstream a tier fetches from on a miss.
///
/// Errors returned here are propagated by every tier without substitution.
/// Any retry or backoff belongs in the implementation, never in the tier.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch the bytes for `key` together with their change token.
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)>;

    /// Current change token for `key` without fetching bytes.
    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken>;
}

#[async_trait]
impl<S: Source + ?Sized> Source for Arc<S> {
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)> {
        (**self).fetch_from_source(key).await
    }

    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken> {
        (**self).check_source(key).await
    }
}

/// One cache tier in front of a [`Source`].
///
/// A miss performs at most one upstream fetch.
#[async_trait]
pub trait Tier: Send + Sync {
    async fn fetch(&self, key: &str) -> DepotResult<Vec<u8>>;

    /// Snapshot of this tier's counters.
    fn stats(&self) -> CacheStats;
}

#[async_trait]
impl<T: Tier + ?Sized> Tier for Arc<T> {
    async fn fetch(&self, key: &str) -> DepotResult<Vec<u8>> {
        (**self).fetch(key).await
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries dropped for capacity.
    pub evictions: u64,
    /// Number of entries currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters shared by the tier implementations.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count,
        }
    }
}
