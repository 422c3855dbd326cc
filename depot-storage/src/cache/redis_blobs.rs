//! Redis-backed [`SharedBlobStore`].
//!
//! Every process pointing at the same server shares one blob namespace, so a
//! blob fetched by one proxy instance is a hit for all of them. Blobs are
//! written with `SET NX` to keep the set-if-absent contract.

use async_trait::async_trait;
use depot_core::{ChangeToken, DepotError, DepotResult, StoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};

use super::shared::SharedBlobStore;

const BLOB_KEY_PREFIX: &str = "depot:blob:";

/// Shared blobs on a Redis server, keyed by change token.
#[derive(Clone)]
pub struct RedisSharedBlobStore {
    connection: ConnectionManager,
    url: String,
}

impl RedisSharedBlobStore {
    /// Connect to `url` (`redis://host:port/db`). The connection manager
    /// reconnects on its own after a dropped connection.
    pub async fn connect(url: &str) -> DepotResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| DepotError::config("redis_url", e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| redis_error(url, e))?;
        tracing::info!(url, "Connected shared blob store");
        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn blob_key(token: &ChangeToken) -> String {
    format!("{}{}", BLOB_KEY_PREFIX, token.as_str())
}

/// Connection trouble is transient; anything the server rejected is not.
fn redis_error(key: &str, err: RedisError) -> DepotError {
    let reason = err.to_string();
    let source = if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        StoreError::Transient { reason }
    } else {
        StoreError::backend(reason)
    };
    DepotError::Upstream {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl SharedBlobStore for RedisSharedBlobStore {
    async fn get(&self, token: &ChangeToken) -> DepotResult<Option<Vec<u8>>> {
        let key = blob_key(token);
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = connection
            .get(key.as_str())
            .await
            .map_err(|e| redis_error(&key, e))?;
        Ok(value)
    }

    async fn store(&self, token: &ChangeToken, value: Vec<u8>) -> DepotResult<bool> {
        let key = blob_key(token);
        let mut connection = self.connection.clone();
        let stored: bool = connection
            .set_nx(key.as_str(), value)
            .await
            .map_err(|e| redis_error(&key, e))?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::ErrorKind;

    #[test]
    fn test_blob_keys_are_namespaced() {
        assert_eq!(blob_key(&ChangeToken::new("abc123")), "depot:blob:abc123");
    }

    #[tokio::test]
    async fn test_unparseable_url_is_config_error() {
        let err = match RedisSharedBlobStore::connect("not a url").await {
            Ok(_) => panic!("url should be rejected"),
            Err(e) => e,
        };
        assert!(matches!(err, DepotError::Config { .. }));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
