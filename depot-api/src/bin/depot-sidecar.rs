//! DEPOT read-through sidecar.
//!
//! Caches Version API reads in process. Set `DEPOT_UPSTREAM_URL` to the
//! Version API base URL.

use std::sync::Arc;

use depot_api::sidecar::{create_router, open_tier};
use depot_api::telemetry::{init_tracing, TelemetryConfig};
use depot_api::{serve, ApiConfig, ApiResult, SIDECAR_PORT};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env(SIDECAR_PORT);
    init_tracing(&TelemetryConfig::new("depot-sidecar", &config))?;
    config.depot.validate()?;

    let tier = Arc::new(open_tier(&config.depot)?);
    let app = create_router(tier);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting DEPOT sidecar");
    serve(app, addr).await
}
