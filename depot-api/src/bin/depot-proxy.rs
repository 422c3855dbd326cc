//! DEPOT cache proxy.
//!
//! Serves raw content-store keys directly, through the durable local tier
//! and through the shared tier.

use depot_api::proxy::create_router;
use depot_api::telemetry::{init_tracing, TelemetryConfig};
use depot_api::{serve, ApiConfig, ApiResult, ProxyState, PROXY_PORT};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env(PROXY_PORT);
    init_tracing(&TelemetryConfig::new("depot-proxy", &config))?;
    config.depot.validate()?;

    let state = ProxyState::open(&config.depot).await?;
    let app = create_router(state);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting DEPOT cache proxy");
    serve(app, addr).await
}
