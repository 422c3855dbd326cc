//! DEPOT API - HTTP Surfaces
//!
//! Three axum surfaces over the `depot-storage` components:
//! - the Version API (publish, fetch, pointer update, listing)
//! - a read-through sidecar caching the Version API in process
//! - a cache proxy serving raw content-store keys through each tier
//!
//! Each binary loads [`ApiConfig`] from the environment, installs tracing
//! and serves its router until Ctrl-C.

pub mod config;
pub mod error;
pub mod proxy;
pub mod remote;
pub mod routes;
pub mod server;
pub mod sidecar;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, PROXY_PORT, SIDECAR_PORT, VERSION_API_PORT};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use proxy::ProxyState;
pub use remote::{object_key, RemoteVersionSource};
pub use routes::create_router;
pub use server::serve;
pub use state::{open_controller, StoreController};
pub use types::*;
