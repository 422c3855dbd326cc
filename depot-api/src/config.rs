//! API Configuration Module
//!
//! Loads the shared [`DepotConfig`] plus listener settings from environment
//! variables. Each binary builds one [`ApiConfig`] in `main` and passes it by
//! reference into constructors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use depot_core::DepotConfig;

use crate::error::{ApiError, ApiResult};

pub const VERSION_API_PORT: u16 = 8080;
pub const SIDECAR_PORT: u16 = 8081;
pub const PROXY_PORT: u16 = 8082;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Store, cache and retry settings shared with the library crates.
    pub depot: DepotConfig,

    /// Listener host (`DEPOT_BIND`).
    pub bind_host: String,

    /// Listener port (`PORT`).
    pub port: u16,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl ApiConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            depot: DepotConfig::default(),
            bind_host: "0.0.0.0".to_string(),
            port,
            json_logs: false,
        }
    }

    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DEPOT_CONTENT_ROOT`: content store root directory
    /// - `DEPOT_METADATA_PATH`: pointer table directory
    /// - `DEPOT_METADATA_MAP_SIZE_MB`: pointer table size limit (default: 64)
    /// - `DEPOT_PATH_PREFIX`: optional content key prefix
    /// - `DEPOT_CACHE_SIZE`: in-process cache capacity (default: 1000)
    /// - `DEPOT_CACHE_EXPIRY_SECONDS`: in-process cache TTL (default: 300)
    /// - `DEPOT_UPSTREAM_URL`: Version API base URL for the sidecar
    /// - `DEPOT_LOCAL_CACHE_PATH`: durable local tier directory
    /// - `DEPOT_LOCAL_CACHE_MAP_SIZE_MB`: durable local tier size limit (default: 1024)
    /// - `DEPOT_REDIS_URL`: Redis server for the shared tier (default: in-process)
    /// - `DEPOT_RETRY_ATTEMPTS`: metadata attempt budget (default: 3)
    /// - `DEPOT_RETRY_BACKOFF_MS`: linear backoff unit (default: 1000)
    /// - `DEPOT_UPSTREAM_TIMEOUT_SECS`: bound on upstream calls (default: 30)
    /// - `DEPOT_LIST_PAGE_SIZE`: store page size when listing (default: 1000)
    /// - `DEPOT_LOG_FORMAT`: `json` for JSON log lines
    /// - `DEPOT_BIND` / `PORT`: listener address
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), default_port)
    }

    /// Same as [`ApiConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F, default_port: u16) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DepotConfig::default();

        let depot = DepotConfig {
            content_root: lookup("DEPOT_CONTENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.content_root),
            metadata_path: lookup("DEPOT_METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_path),
            metadata_map_size_mb: parse_or(
                &lookup,
                "DEPOT_METADATA_MAP_SIZE_MB",
                defaults.metadata_map_size_mb,
            ),
            path_prefix: lookup("DEPOT_PATH_PREFIX").filter(|p| !p.trim().is_empty()),
            cache_capacity: parse_or(&lookup, "DEPOT_CACHE_SIZE", defaults.cache_capacity),
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "DEPOT_CACHE_EXPIRY_SECONDS",
                defaults.cache_ttl.as_secs(),
            )),
            upstream_url: lookup("DEPOT_UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            local_cache_path: lookup("DEPOT_LOCAL_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_cache_path),
            local_cache_map_size_mb: parse_or(
                &lookup,
                "DEPOT_LOCAL_CACHE_MAP_SIZE_MB",
                defaults.local_cache_map_size_mb,
            ),
            redis_url: lookup("DEPOT_REDIS_URL").filter(|u| !u.trim().is_empty()),
            retry_attempts: parse_or(&lookup, "DEPOT_RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_backoff_unit: Duration::from_millis(parse_or(
                &lookup,
                "DEPOT_RETRY_BACKOFF_MS",
                defaults.retry_backoff_unit.as_millis() as u64,
            )),
            upstream_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DEPOT_UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),
            list_page_size: parse_or(&lookup, "DEPOT_LIST_PAGE_SIZE", defaults.list_page_size),
        };

        let json_logs = lookup("DEPOT_LOG_FORMAT")
            .map(|s| s.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            depot,
            bind_host: lookup("DEPOT_BIND").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", default_port),
            json_logs,
        }
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }
}

/// Parse `key`, keeping `default` when it is unset or unparseable.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "Unparseable setting, using default");
                default
            }
        },
        None => default,
    }
}
