//! Tracing subscriber initialization.
//!
//! Library crates only emit `tracing` events; each binary installs the
//! subscriber once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "depot_api=debug,depot_storage=debug,tower_http=info,info";

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// JSON log lines instead of the human-readable format
    pub json: bool,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, config: &ApiConfig) -> Self {
        Self {
            service_name: service_name.into(),
            json: config.json_logs,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        json = config.json,
        "Telemetry initialized"
    );
    Ok(())
}
