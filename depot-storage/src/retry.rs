//! Retry policy for metadata store calls.
//!
//! Retryable errors (throttling, transient internal errors) are retried with
//! linear backoff: after failed attempt `i` the caller sleeps `i` backoff
//! units. Terminal errors return immediately. When the budget is exhausted
//! the last error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use depot_core::{
    DepotConfig, StoreResult, VersionPointer, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_UNIT,
    DEFAULT_UPSTREAM_TIMEOUT,
};

use crate::metadata::MetadataStore;
use crate::timeout::bounded_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Linear backoff unit.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_unit: DEFAULT_RETRY_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn from_config(config: &DepotConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_backoff_unit)
    }

    /// Sleep before the next attempt after failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds, fails terminally, or the budget is
    /// spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let backoff = self.backoff_for(attempt);
                    tracing::debug!(
                        operation = operation,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying metadata store call"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::warn!(
                            operation = operation,
                            attempts = attempt,
                            error = %e,
                            "Metadata store retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Metadata store decorator applying a [`RetryPolicy`] and a per-attempt
/// timeout to every call.
#[derive(Debug, Clone)]
pub struct RetryingMetadataStore<M> {
    inner: M,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl<M: MetadataStore> RetryingMetadataStore<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            call_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: MetadataStore> MetadataStore for RetryingMetadataStore<M> {
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>> {
        self.policy
            .run("get_item", || {
                bounded_store("get_item", self.call_timeout, self.inner.get_item(name))
            })
            .await
    }

    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()> {
        self.policy
            .run("put_item", || {
                bounded_store("put_item", self.call_timeout, self.inner.put_item(pointer))
            })
            .await
    }
}
