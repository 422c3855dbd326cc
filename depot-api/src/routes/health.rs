//! Health Check Endpoints
//!
//! - /up - Liveness check, always answers `Happy`
//! - /health/cache - Counters of every cache tier a surface serves through
//!
//! No authentication required for health endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use depot_storage::Tier;

use crate::types::TierStatsResponse;

pub const UP_BODY: &str = "Happy";

// ============================================================================
// STATE
// ============================================================================

/// Named tiers reported by `/health/cache`.
#[derive(Clone, Default)]
pub struct TierHealth {
    tiers: Vec<(String, Arc<dyn Tier>)>,
}

impl TierHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, name: impl Into<String>, tier: Arc<dyn Tier>) -> Self {
        self.tiers.push((name.into(), tier));
        self
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

pub async fn up() -> &'static str {
    UP_BODY
}

async fn cache_stats(State(health): State<TierHealth>) -> Json<Vec<TierStatsResponse>> {
    let stats = health
        .tiers
        .iter()
        .map(|(name, tier)| TierStatsResponse::new(name.clone(), &tier.stats()))
        .collect();
    Json(stats)
}

// ============================================================================
// ROUTER
// ============================================================================

/// `/up` alone, for the Version API.
pub fn up_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/up", get(up))
}

/// `/up` plus `/health/cache` over `health`.
pub fn create_router<S>(health: TierHealth) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health/cache", get(cache_stats))
        .with_state(health)
        .merge(up_router())
}
