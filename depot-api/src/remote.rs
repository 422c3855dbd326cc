//! Remote Version API client used as a cache [`Source`].
//!
//! Cache keys are request paths relative to the upstream base URL:
//! `team/app.bin`, `team/app.bin/v2`, `team/app.bin?dev=true`.

use std::time::Duration;

use async_trait::async_trait;
use depot_core::{ChangeToken, DepotConfig, DepotError, DepotResult, ObjectPath, StoreError};
use depot_storage::Source;
use reqwest::header::ETAG;
use reqwest::{Response, StatusCode};

use crate::types::ErrorEnvelope;

/// Token reported for a HEAD reply without an `ETag`. Fetched copies are
/// always stored under an ETag or a content hash, so it never matches one.
const UNVERSIONED_TOKEN: &str = "unversioned";

/// Cache key (and relative URL) for one sidecar read.
///
/// An explicit version wins over `dev`; `dev` only selects the pointer.
pub fn object_key(path: &ObjectPath, version: Option<&str>, dev: bool) -> String {
    match version.filter(|v| !v.is_empty()) {
        Some(version) => format!("{}/{}", path, version),
        None if dev => format!("{}?dev=true", path),
        None => path.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct RemoteVersionSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteVersionSource {
    /// `base_url` is normalized to end in exactly one `/`.
    pub fn new(base_url: &str, timeout: Duration) -> DepotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DepotError::config("upstream_url", e.to_string()))?;
        Ok(Self {
            client,
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        Self::new(&config.upstream_base(), config.upstream_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, key.trim_start_matches('/'))
    }

    fn transport_error(&self, key: &str, method: &str, err: reqwest::Error) -> DepotError {
        if err.is_timeout() {
            DepotError::Timeout {
                operation: format!("{} {}", method, self.url(key)),
                after: self.timeout,
            }
        } else {
            DepotError::Upstream {
                key: key.to_string(),
                source: StoreError::Transient {
                    reason: err.to_string(),
                },
            }
        }
    }

    /// Turn a non-success reply into [`DepotError::Remote`], keeping the
    /// remote error message when the body is an error envelope.
    async fn remote_error(response: Response) -> DepotError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback_message(status));
        DepotError::Remote {
            status: status.as_u16(),
            message,
        }
    }
}

fn fallback_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

fn etag_of(response: &Response) -> Option<ChangeToken> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(ChangeToken::from_etag)
}

#[async_trait]
impl Source for RemoteVersionSource {
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)> {
        let response = self
            .client
            .get(self.url(key))
            .send()
            .await
            .map_err(|e| self.transport_error(key, "GET", e))?;
        if !response.status().is_success() {
            return Err(Self::remote_error(response).await);
        }

        let etag = etag_of(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(key, "GET", e))?
            .to_vec();
        let token = etag.unwrap_or_else(|| ChangeToken::for_content(&body));
        tracing::debug!(key, bytes = body.len(), token = %token, "Fetched from remote");
        Ok((body, token))
    }

    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken> {
        let response = self
            .client
            .head(self.url(key))
            .send()
            .await
            .map_err(|e| self.transport_error(key, "HEAD", e))?;
        if !response.status().is_success() {
            return Err(Self::remote_error(response).await);
        }
        Ok(etag_of(&response).unwrap_or_else(|| {
            tracing::debug!(key, "No ETag on HEAD reply, reporting unversioned token");
            ChangeToken::new(UNVERSIONED_TOKEN)
        }))
    }
}
