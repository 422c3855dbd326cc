//! Fetch-through tier behaviour against a counting upstream.

use std::sync::Arc;
use std::time::Duration;

use depot_core::{DepotError, ErrorKind, StoreError};
use depot_storage::{
    ContentStore, ContentStoreSource, ExpiringLruCache, InMemoryContentStore,
    InMemorySharedBlobStore, LocalTier, ManualClock, MemoryTier, SharedTier, Tier, TierSource,
};
use depot_test_utils::CountingSource;
use tempfile::TempDir;

fn memory_tier(source: Arc<CountingSource>, ttl: Duration) -> (MemoryTier<Arc<CountingSource>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = ExpiringLruCache::with_clock(16, ttl, clock.clone()).expect("cache");
    (MemoryTier::new(cache, source), clock)
}

// ============================================================================
// IN-PROCESS TIER
// ============================================================================

#[tokio::test]
async fn test_memory_tier_fetches_once_until_expiry() {
    let source = Arc::new(CountingSource::new().with_object("team/app.bin", b"hello"));
    let (tier, clock) = memory_tier(source.clone(), Duration::from_secs(2));

    assert_eq!(tier.fetch("team/app.bin").await.expect("miss"), b"hello");
    assert_eq!(tier.fetch("team/app.bin").await.expect("hit"), b"hello");
    assert_eq!(source.fetch_calls(), 1);

    source.set("team/app.bin", b"world");
    clock.advance(Duration::from_secs(2));
    assert_eq!(tier.fetch("team/app.bin").await.expect("refetch"), b"world");
    assert_eq!(source.fetch_calls(), 2);

    let stats = tier.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn test_memory_tier_propagates_source_error_verbatim() {
    let source = Arc::new(CountingSource::new());
    let upstream = DepotError::Remote {
        status: 404,
        message: "No version set for object team/app.bin".into(),
    };
    source.set_failure(Some(upstream.clone()));
    let (tier, _clock) = memory_tier(source.clone(), Duration::from_secs(60));

    let err = tier.fetch("team/app.bin").await.expect_err("source failure");
    assert_eq!(err, upstream);
    assert_eq!(source.fetch_calls(), 1, "no retry inside the tier");

    source.set_failure(None);
    source.set("team/app.bin", b"hello");
    assert_eq!(tier.fetch("team/app.bin").await.expect("recovered"), b"hello");
}

#[tokio::test(start_paused = true)]
async fn test_memory_tier_timeout_caches_nothing() {
    let source = Arc::new(CountingSource::new().with_object("k", b"v"));
    source.set_delay(Some(Duration::from_secs(60)));
    let (tier, _clock) = memory_tier(source.clone(), Duration::from_secs(60));
    let tier = tier.with_fetch_timeout(Duration::from_secs(30));

    let err = tier.fetch("k").await.expect_err("slow source");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(tier.cache().is_empty());
}

// ============================================================================
// DURABLE LOCAL TIER
// ============================================================================

#[tokio::test]
async fn test_local_tier_revalidates_by_token() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let source = Arc::new(CountingSource::new().with_object("team/app.bin", b"hello"));
    let tier = LocalTier::open(dir.path(), 10, source.clone()).expect("open");

    assert_eq!(tier.fetch("team/app.bin").await.expect("miss"), b"hello");
    assert_eq!(tier.fetch("team/app.bin").await.expect("hit"), b"hello");
    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(source.check_calls(), 2, "every fetch checks the token");

    source.set("team/app.bin", b"world");
    assert_eq!(tier.fetch("team/app.bin").await.expect("changed"), b"world");
    assert_eq!(source.fetch_calls(), 2);

    let tokens = tier.stored_tokens("team/app.bin").expect("tokens");
    assert_eq!(tokens.len(), 1, "stale copy is replaced");
}

#[tokio::test]
async fn test_local_tier_keys_with_common_text_stay_separate() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let source = Arc::new(
        CountingSource::new()
            .with_object("team/app.bin", b"binary")
            .with_object("team/app.bin.sig", b"signature"),
    );
    let tier = LocalTier::open(dir.path(), 10, source.clone()).expect("open");

    tier.fetch("team/app.bin.sig").await.expect("miss");
    tier.fetch("team/app.bin").await.expect("miss");
    source.set("team/app.bin", b"rebuilt");
    tier.fetch("team/app.bin").await.expect("changed");

    assert_eq!(tier.stored_tokens("team/app.bin").expect("tokens").len(), 1);
    assert_eq!(tier.stored_tokens("team/app.bin.sig").expect("tokens").len(), 1);
    assert_eq!(tier.fetch("team/app.bin.sig").await.expect("hit"), b"signature");
    assert_eq!(source.fetch_calls(), 3);
    assert_eq!(tier.stats().entry_count, 2);
}

#[tokio::test]
async fn test_local_tier_survives_reopen() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let source = Arc::new(CountingSource::new().with_object("k", b"durable"));
    {
        let tier = LocalTier::open(dir.path(), 10, source.clone()).expect("open");
        tier.fetch("k").await.expect("miss");
    }
    let tier = LocalTier::open(dir.path(), 10, source.clone()).expect("reopen");
    assert_eq!(tier.fetch("k").await.expect("hit"), b"durable");
    assert_eq!(source.fetch_calls(), 1);
}

#[tokio::test]
async fn test_local_tier_check_failure_propagates() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let source = Arc::new(CountingSource::new());
    let tier = LocalTier::open(dir.path(), 10, source.clone()).expect("open");

    let err = tier.fetch("missing").await.expect_err("absent upstream");
    assert!(err.is_not_found());
    assert_eq!(source.fetch_calls(), 0);
}

// ============================================================================
// SHARED TIER
// ============================================================================

#[tokio::test]
async fn test_shared_tier_shares_blob_across_keys() {
    let source = Arc::new(
        CountingSource::new()
            .with_object("team/app.bin", b"same bytes")
            .with_object("team/app.bin/v1", b"same bytes"),
    );
    let tier = SharedTier::new(source.clone(), InMemorySharedBlobStore::new());

    assert_eq!(tier.fetch("team/app.bin").await.expect("miss"), b"same bytes");
    assert_eq!(tier.fetch("team/app.bin/v1").await.expect("token hit"), b"same bytes");
    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(tier.stats().entry_count, 1);
}

#[tokio::test]
async fn test_shared_tier_misses_on_new_token() {
    let source = Arc::new(CountingSource::new().with_object("k", b"one"));
    let tier = SharedTier::new(source.clone(), InMemorySharedBlobStore::new());
    tier.fetch("k").await.expect("miss");
    source.set("k", b"two");
    assert_eq!(tier.fetch("k").await.expect("miss"), b"two");
    assert_eq!(source.fetch_calls(), 2);
    assert_eq!(tier.stats().entry_count, 2);
}

// ============================================================================
// COMPOSITION
// ============================================================================

#[tokio::test]
async fn test_memory_over_local_over_content_store() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let content = Arc::new(InMemoryContentStore::new());
    content
        .put("team/app.bin/v1", b"hello".to_vec())
        .await
        .expect("put");

    let source = ContentStoreSource::new(content.clone());
    let local = Arc::new(LocalTier::open(dir.path(), 10, source.clone()).expect("open"));
    let memory = MemoryTier::new(
        ExpiringLruCache::new(8, Duration::from_secs(60)).expect("cache"),
        TierSource::new(local.clone(), source),
    );

    assert_eq!(memory.fetch("team/app.bin/v1").await.expect("cold"), b"hello");
    assert_eq!(memory.fetch("team/app.bin/v1").await.expect("warm"), b"hello");
    assert_eq!(local.stats().misses, 1);
    assert_eq!(memory.stats().hits, 1);

    let err = memory.fetch("team/app.bin/v2").await.expect_err("missing");
    assert!(matches!(
        err,
        DepotError::Upstream { source: StoreError::NotFound { .. }, .. }
    ));
}
