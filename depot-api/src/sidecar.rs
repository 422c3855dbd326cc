//! Read-through sidecar.
//!
//! Serves `GET /{category}/{object}[/{version}]?dev=` from an in-process
//! expiring LRU in front of the remote Version API. A miss makes exactly one
//! remote call; remote errors come back with the remote message.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use depot_core::{DepotConfig, ObjectPath};
use depot_storage::{MemoryTier, Tier};
use tower_http::trace::TraceLayer;

use crate::error::ApiResult;
use crate::remote::{object_key, RemoteVersionSource};
use crate::routes::health::{self, TierHealth};
use crate::routes::objects::OBJECT_CONTENT_TYPE;
use crate::types::ChannelQuery;

pub type SidecarTier = MemoryTier<RemoteVersionSource>;

/// In-process tier over the configured upstream.
pub fn open_tier(config: &DepotConfig) -> ApiResult<SidecarTier> {
    let source = RemoteVersionSource::from_config(config)?;
    tracing::info!(
        upstream = source.base_url(),
        capacity = config.cache_capacity,
        ttl_secs = config.cache_ttl.as_secs(),
        "Sidecar cache configured"
    );
    Ok(MemoryTier::from_config(config, source)?)
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn get_current<T: Tier + 'static>(
    State(tier): State<Arc<T>>,
    Path((category, object)): Path<(String, String)>,
    Query(query): Query<ChannelQuery>,
) -> ApiResult<Response> {
    let path = ObjectPath::new(category, object)?;
    serve(tier.as_ref(), &object_key(&path, None, query.dev())).await
}

async fn get_version<T: Tier + 'static>(
    State(tier): State<Arc<T>>,
    Path((category, object, version)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let path = ObjectPath::new(category, object)?;
    serve(tier.as_ref(), &object_key(&path, Some(version.as_str()), false)).await
}

async fn serve<T: Tier>(tier: &T, key: &str) -> ApiResult<Response> {
    let body = tier.fetch(key).await?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(OBJECT_CONTENT_TYPE))],
        body,
    )
        .into_response())
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router<T: Tier + 'static>(tier: Arc<T>) -> Router {
    let health = TierHealth::new().with_tier("memory", tier.clone());
    Router::new()
        .route("/:category/:object", get(get_current::<T>))
        .route("/:category/:object/:version", get(get_version::<T>))
        .with_state(tier)
        .merge(health::create_router(health))
        .layer(TraceLayer::new_for_http())
}
