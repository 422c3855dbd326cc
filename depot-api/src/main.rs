//! DEPOT Version API Entry Point
//!
//! Opens the content store and pointer table, then serves the Version API.

use depot_api::telemetry::{init_tracing, TelemetryConfig};
use depot_api::{create_router, open_controller, serve, ApiConfig, ApiResult, VERSION_API_PORT};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env(VERSION_API_PORT);
    init_tracing(&TelemetryConfig::new("depot-api", &config))?;
    config.depot.validate()?;

    let controller = open_controller(&config.depot).await?;
    let app = create_router(controller);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting DEPOT Version API");
    serve(app, addr).await
}
