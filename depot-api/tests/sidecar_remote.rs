//! Sidecar and remote client against a Version API bound to a real socket.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    routing::get as get_route,
    Router,
};
use depot_api::sidecar::{self, SidecarTier};
use depot_api::{create_router, RemoteVersionSource};
use depot_core::{Channel, DepotError, Promotion};
use depot_storage::{ExpiringLruCache, LocalTier, MemoryTier, Source, Tier};
use depot_test_utils::fixtures::{app_path, in_memory_controller};
use depot_test_utils::CountingSource;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

type Controller = depot_storage::VersionController<
    depot_storage::InMemoryContentStore,
    Arc<depot_storage::InMemoryMetadataStore>,
>;

/// Serve a fresh Version API on `127.0.0.1:0`; returns its base URL.
async fn spawn_version_api() -> (String, Arc<Controller>) {
    let (controller, _content, _metadata) = in_memory_controller();
    let controller = Arc::new(controller);
    let app = create_router(controller.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/", addr), controller)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect")
        .to_vec();
    (status, body)
}

// ============================================================================
// REMOTE CLIENT
// ============================================================================

#[tokio::test]
async fn test_remote_fetch_and_check_agree_on_token() {
    let (base, controller) = spawn_version_api().await;
    controller
        .add_object(&app_path(), "v1", b"hello".to_vec(), Promotion::Prod)
        .await
        .expect("publish");

    let source = RemoteVersionSource::new(&base, Duration::from_secs(5)).expect("client");
    let (body, token) = source.fetch_from_source("team/app.bin").await.expect("fetch");
    assert_eq!(body, b"hello");

    let (_, expected) = controller
        .head_object(&app_path(), None, Channel::Prod)
        .await
        .expect("head");
    assert_eq!(token, expected);
    assert_eq!(source.check_source("team/app.bin").await.expect("check"), expected);
    assert_eq!(source.check_source("team/app.bin/v1").await.expect("check"), expected);
}

#[tokio::test]
async fn test_remote_error_envelope_is_surfaced() {
    let (base, _controller) = spawn_version_api().await;
    let source = RemoteVersionSource::new(&base, Duration::from_secs(5)).expect("client");

    let err = source
        .fetch_from_source("team/app.bin?dev=true")
        .await
        .expect_err("no dev pointer");
    match err {
        DepotError::Remote { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "No dev version set for object team/app.bin");
        }
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_upstream_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let source =
        RemoteVersionSource::new(&format!("http://{}", addr), Duration::from_secs(5)).expect("client");
    let err = source
        .fetch_from_source("team/app.bin")
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, DepotError::Upstream { .. } | DepotError::Timeout { .. }));
}

/// Upstream that never sends an `ETag`; counts GET requests only.
async fn spawn_etagless_upstream() -> (String, Arc<AtomicU32>) {
    async fn serve_object(method: Method, State(gets): State<Arc<AtomicU32>>) -> &'static str {
        if method == Method::GET {
            gets.fetch_add(1, Ordering::SeqCst);
        }
        "hello"
    }

    let gets = Arc::new(AtomicU32::new(0));
    let app = Router::new()
        .route("/team/app.bin", get_route(serve_object))
        .with_state(gets.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/", addr), gets)
}

#[tokio::test]
async fn test_missing_etag_costs_one_fetch_per_miss() {
    let (base, gets) = spawn_etagless_upstream().await;
    let source = RemoteVersionSource::new(&base, Duration::from_secs(5)).expect("client");
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let tier = LocalTier::open(dir.path(), 10, source).expect("open local tier");

    assert_eq!(tier.fetch("team/app.bin").await.expect("first fetch"), b"hello");
    assert_eq!(gets.load(Ordering::SeqCst), 1);

    assert_eq!(tier.fetch("team/app.bin").await.expect("second fetch"), b"hello");
    assert_eq!(gets.load(Ordering::SeqCst), 2);
    assert_eq!(tier.stats().hits, 0);
}

// ============================================================================
// SIDECAR
// ============================================================================

#[tokio::test]
async fn test_sidecar_reads_through_once() {
    let (base, controller) = spawn_version_api().await;
    controller
        .add_object(&app_path(), "v1", b"hello".to_vec(), Promotion::Dev)
        .await
        .expect("publish");

    let source = RemoteVersionSource::new(&base, Duration::from_secs(5)).expect("client");
    let cache = ExpiringLruCache::new(16, Duration::from_secs(300)).expect("cache");
    let tier: Arc<SidecarTier> = Arc::new(MemoryTier::new(cache, source));
    let app = sidecar::create_router(tier.clone());

    assert_eq!(get(&app, "/team/app.bin?dev=true").await, (StatusCode::OK, b"hello".to_vec()));
    assert_eq!(get(&app, "/team/app.bin?dev=true").await.1, b"hello");
    assert_eq!(tier.stats().hits, 1);
    assert_eq!(tier.stats().misses, 1);

    let (status, body) = get(&app, "/team/app.bin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).expect("error envelope");
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "No prod version set for object team/app.bin");
}

#[tokio::test]
async fn test_sidecar_cache_keys() {
    let source = Arc::new(
        CountingSource::new()
            .with_object("team/app.bin", b"prod")
            .with_object("team/app.bin?dev=true", b"dev")
            .with_object("team/app.bin/v7", b"pinned"),
    );
    let cache = ExpiringLruCache::new(16, Duration::from_secs(300)).expect("cache");
    let app = sidecar::create_router(Arc::new(MemoryTier::new(cache, source.clone())));

    assert_eq!(get(&app, "/team/app.bin").await.1, b"prod");
    assert_eq!(get(&app, "/team/app.bin?dev=true").await.1, b"dev");
    assert_eq!(get(&app, "/team/app.bin/v7?dev=true").await.1, b"pinned");
    assert_eq!(source.fetch_calls(), 3);

    let (status, body) = get(&app, "/health/cache").await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_slice(&body).expect("stats");
    assert_eq!(stats[0]["tier"], "memory");
    assert_eq!(stats[0]["entryCount"], 3);
}
