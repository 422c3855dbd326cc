//! Listener loop shared by the three binaries.

use std::net::SocketAddr;

use axum::Router;

use crate::error::{ApiError, ApiResult};

/// Serve `app` on `addr` until the server fails or Ctrl-C arrives.
pub async fn serve(app: Router, addr: SocketAddr) -> ApiResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "Listening");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }
    Ok(())
}
