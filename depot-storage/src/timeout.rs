//! Deadline helpers for upstream calls.

use std::future::Future;
use std::time::Duration;

use depot_core::{DepotError, DepotResult, StoreError, StoreResult};

/// Bound a store call. Elapsing becomes [`StoreError::TimedOut`], which the
/// retry policy treats as terminal.
pub async fn bounded_store<T, F>(operation: &str, after: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = operation, after_ms = after.as_millis() as u64, "Store call timed out");
            Err(StoreError::TimedOut {
                operation: operation.to_string(),
                after,
            })
        }
    }
}

/// Bound a source or remote call that already speaks [`DepotError`].
pub async fn bounded<T, F>(operation: &str, after: Duration, future: F) -> DepotResult<T>
where
    F: Future<Output = DepotResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = operation, after_ms = after.as_millis() as u64, "Upstream call timed out");
            Err(DepotError::Timeout {
                operation: operation.to_string(),
                after,
            })
        }
    }
}
