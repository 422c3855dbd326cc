//! Shared tier keyed by change token.
//!
//! Blobs are stored under their token rather than their logical key, so two
//! keys resolving to the same token share one stored blob.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use depot_core::{ChangeToken, DepotResult, DEFAULT_UPSTREAM_TIMEOUT};

use super::traits::{CacheStats, Counters, Source, Tier};
use crate::timeout::bounded;

/// Blob store shared between processes (or tasks), addressed by token.
#[async_trait]
pub trait SharedBlobStore: Send + Sync {
    async fn get(&self, token: &ChangeToken) -> DepotResult<Option<Vec<u8>>>;

    /// Store `value` under `token` unless a blob is already present.
    /// Returns `true` when this call stored it.
    async fn store(&self, token: &ChangeToken, value: Vec<u8>) -> DepotResult<bool>;

    /// Number of blobs held, when the backend can tell.
    fn len(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Default)]
pub struct InMemorySharedBlobStore {
    blobs: DashMap<ChangeToken, Vec<u8>>,
}

impl InMemorySharedBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedBlobStore for InMemorySharedBlobStore {
    async fn get(&self, token: &ChangeToken) -> DepotResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(token).map(|blob| blob.value().clone()))
    }

    async fn store(&self, token: &ChangeToken, value: Vec<u8>) -> DepotResult<bool> {
        let mut stored = false;
        self.blobs.entry(token.clone()).or_insert_with(|| {
            stored = true;
            value
        });
        Ok(stored)
    }

    fn len(&self) -> Option<u64> {
        Some(self.blobs.len() as u64)
    }
}

/// Shared tier over a [`Source`] and a [`SharedBlobStore`].
pub struct SharedTier<S, B> {
    source: S,
    blobs: B,
    fetch_timeout: Duration,
    counters: Counters,
}

impl<S: Source, B: SharedBlobStore> SharedTier<S, B> {
    pub fn new(source: S, blobs: B) -> Self {
        Self {
            source,
            blobs,
            fetch_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            counters: Counters::default(),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: Source, B: SharedBlobStore> Tier for SharedTier<S, B> {
    async fn fetch(&self, key: &str) -> DepotResult<Vec<u8>> {
        let token = bounded("check_source", self.fetch_timeout, self.source.check_source(key)).await?;

        match self.blobs.get(&token).await {
            Ok(Some(value)) => {
                self.counters.hit();
                tracing::debug!(key = %key, token = %token, "Shared tier hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Shared tier read failed, treating as miss"),
        }

        self.counters.miss();
        tracing::debug!(key = %key, token = %token, "Shared tier miss");
        let (value, fresh) = bounded(
            "fetch_from_source",
            self.fetch_timeout,
            self.source.fetch_from_source(key),
        )
        .await?;

        if let Err(e) = self.blobs.store(&fresh, value.clone()).await {
            tracing::warn!(key = %key, error = %e, "Failed to store shared blob");
        }
        Ok(value)
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.blobs.len().unwrap_or(0))
    }
}
