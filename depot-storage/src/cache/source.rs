//! Source adapters: content stores and tiers as cache sources.

use std::sync::Arc;

use async_trait::async_trait;
use depot_core::{ChangeToken, DepotError, DepotResult};

use super::traits::{Source, Tier};
use crate::content::ContentStore;

/// Serves raw content-store keys.
pub struct ContentStoreSource<C> {
    content: Arc<C>,
}

impl<C: ContentStore> ContentStoreSource<C> {
    pub fn new(content: Arc<C>) -> Self {
        Self { content }
    }
}

impl<C> Clone for ContentStoreSource<C> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
        }
    }
}

#[async_trait]
impl<C: ContentStore> Source for ContentStoreSource<C> {
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)> {
        let object = self
            .content
            .get(key)
            .await
            .map_err(|source| DepotError::Upstream {
                key: key.to_string(),
                source,
            })?;
        Ok((object.body, object.token))
    }

    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken> {
        self.content
            .head(key)
            .await
            .map_err(|source| DepotError::Upstream {
                key: key.to_string(),
                source,
            })
    }
}

/// Uses a tier as the source of another tier.
///
/// Tokens come from `tokens` (normally the source the inner tier wraps);
/// bytes come through the inner tier.
pub struct TierSource<T, S> {
    tier: T,
    tokens: S,
}

impl<T: Tier, S: Source> TierSource<T, S> {
    pub fn new(tier: T, tokens: S) -> Self {
        Self { tier, tokens }
    }

    pub fn tier(&self) -> &T {
        &self.tier
    }
}

#[async_trait]
impl<T: Tier, S: Source> Source for TierSource<T, S> {
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)> {
        let token = self.tokens.check_source(key).await?;
        let value = self.tier.fetch(key).await?;
        Ok((value, token))
    }

    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken> {
        self.tokens.check_source(key).await
    }
}
