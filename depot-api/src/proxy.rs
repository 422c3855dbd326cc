//! Cache proxy.
//!
//! Serves raw content-store keys three ways so the tiers can be compared
//! side by side:
//! - `GET /source/{*key}` straight from the content store
//! - `GET /local/{*key}` through the durable local tier
//! - `GET /shared/{*key}` through the shared tier
//!
//! The shared tier keeps its blobs on Redis when `redis_url` is configured,
//! otherwise in process memory.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use depot_core::{DepotConfig, DEFAULT_UPSTREAM_TIMEOUT};
use depot_storage::timeout::bounded;
use depot_storage::{
    ContentStoreSource, FsContentStore, InMemorySharedBlobStore, LocalTier, RedisSharedBlobStore,
    SharedTier, Source, Tier,
};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::routes::health::{self, TierHealth};
use crate::routes::objects::OBJECT_CONTENT_TYPE;

#[derive(Clone)]
pub struct ProxyState {
    source: Arc<dyn Source>,
    local: Arc<dyn Tier>,
    shared: Arc<dyn Tier>,
    fetch_timeout: Duration,
}

impl ProxyState {
    pub fn new(source: Arc<dyn Source>, local: Arc<dyn Tier>, shared: Arc<dyn Tier>) -> Self {
        Self {
            source,
            local,
            shared,
            fetch_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Bound on direct source reads; the tiers carry their own.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Filesystem content store, LMDB local tier, and shared blobs on Redis
    /// or in process memory.
    pub async fn open(config: &DepotConfig) -> ApiResult<Self> {
        let content = FsContentStore::open(&config.content_root)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to open content store: {}", e)))?;
        let source = ContentStoreSource::new(Arc::new(content));

        let local = LocalTier::open(
            &config.local_cache_path,
            config.local_cache_map_size_mb,
            source.clone(),
        )?
        .with_fetch_timeout(config.upstream_timeout);
        let shared: Arc<dyn Tier> = match &config.redis_url {
            Some(url) => {
                let blobs = RedisSharedBlobStore::connect(url).await?;
                Arc::new(
                    SharedTier::new(source.clone(), blobs)
                        .with_fetch_timeout(config.upstream_timeout),
                )
            }
            None => {
                tracing::warn!("No redis_url configured, shared tier blobs stay in process memory");
                Arc::new(
                    SharedTier::new(source.clone(), InMemorySharedBlobStore::new())
                        .with_fetch_timeout(config.upstream_timeout),
                )
            }
        };

        tracing::info!(
            content_root = %config.content_root.display(),
            local_cache = %config.local_cache_path.display(),
            shared_blobs = config.redis_url.as_deref().unwrap_or("memory"),
            "Cache proxy tiers opened"
        );
        Ok(Self::new(Arc::new(source), Arc::new(local), shared)
            .with_fetch_timeout(config.upstream_timeout))
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn fetch_source(
    State(state): State<ProxyState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let (body, _token) = bounded(
        "fetch_from_source",
        state.fetch_timeout,
        state.source.fetch_from_source(normalize(&key)),
    )
    .await?;
    Ok(object_body(body))
}

async fn fetch_local(State(state): State<ProxyState>, Path(key): Path<String>) -> ApiResult<Response> {
    let body = state.local.fetch(normalize(&key)).await?;
    Ok(object_body(body))
}

async fn fetch_shared(
    State(state): State<ProxyState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let body = state.shared.fetch(normalize(&key)).await?;
    Ok(object_body(body))
}

fn normalize(key: &str) -> &str {
    key.trim_start_matches('/')
}

fn object_body(body: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(OBJECT_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: ProxyState) -> Router {
    let health = TierHealth::new()
        .with_tier("local", state.local.clone())
        .with_tier("shared", state.shared.clone());
    Router::new()
        .route("/source/*key", get(fetch_source))
        .route("/local/*key", get(fetch_local))
        .route("/shared/*key", get(fetch_shared))
        .with_state(state)
        .merge(health::create_router(health))
        .layer(TraceLayer::new_for_http())
}
