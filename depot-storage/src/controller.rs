//! Version Controller: publish, resolve and promote versions across the
//! content store and the pointer table.
//!
//! Content keys come from the configured [`KeyScheme`]; pointer records are
//! keyed by the bare object path. Metadata calls go through the retry policy;
//! content calls are bounded by the call timeout only.

use std::sync::Arc;
use std::time::Duration;

use depot_core::{
    validate_version, ChangeToken, Channel, DepotConfig, DepotError, DepotResult, KeyScheme,
    ListPage, ObjectPath, Promotion, StoredObject, VersionPointer, DEFAULT_LIST_PAGE_SIZE,
    DEFAULT_UPSTREAM_TIMEOUT,
};

use crate::content::ContentStore;
use crate::listing::Lister;
use crate::metadata::MetadataStore;
use crate::retry::{RetryPolicy, RetryingMetadataStore};
use crate::timeout::bounded_store;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub key_scheme: KeyScheme,
    pub retry: RetryPolicy,
    /// Bound on every content call and every metadata attempt.
    pub call_timeout: Duration,
    pub list_page_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            key_scheme: KeyScheme::default(),
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

impl ControllerConfig {
    pub fn from_config(config: &DepotConfig) -> Self {
        Self {
            key_scheme: config.key_scheme(),
            retry: RetryPolicy::from_config(config),
            call_timeout: config.upstream_timeout,
            list_page_size: config.list_page_size,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_key_scheme(mut self, key_scheme: KeyScheme) -> Self {
        self.key_scheme = key_scheme;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_list_page_size(mut self, list_page_size: usize) -> Self {
        self.list_page_size = list_page_size;
        self
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Shared, long-lived orchestrator. Holds no per-request state and is safe
/// to call concurrently.
pub struct VersionController<C, M> {
    content: Arc<C>,
    metadata: RetryingMetadataStore<M>,
    lister: Lister<C>,
    config: ControllerConfig,
}

impl<C, M> VersionController<C, M>
where
    C: ContentStore,
    M: MetadataStore,
{
    pub fn new(config: ControllerConfig, content: Arc<C>, metadata: M) -> Self {
        let metadata = RetryingMetadataStore::new(metadata, config.retry)
            .with_call_timeout(config.call_timeout);
        let lister = Lister::new(
            content.clone(),
            config.key_scheme.clone(),
            config.list_page_size,
            config.call_timeout,
        );
        Self {
            content,
            metadata,
            lister,
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn content_store(&self) -> &Arc<C> {
        &self.content
    }

    /// Publish a version.
    ///
    /// An existing `(path, version)` is only accepted when the publish
    /// promotes; its bytes are then left untouched and only pointers move.
    /// A pointer failure after a successful content write is reported as
    /// [`DepotError::MetadataWrite`]; retrying the whole call is safe.
    pub async fn add_object(
        &self,
        path: &ObjectPath,
        version: &str,
        body: Vec<u8>,
        promotion: Promotion,
    ) -> DepotResult<()> {
        validate_version(version)?;
        let key = self.config.key_scheme.content_key(path, version);

        let exists = match bounded_store("head", self.config.call_timeout, self.content.head(&key)).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(source) => {
                return Err(DepotError::ContentRead {
                    path: path.to_string(),
                    version: version.to_string(),
                    source,
                })
            }
        };

        if exists && !promotion.is_promoting() {
            return Err(DepotError::Conflict {
                path: path.to_string(),
                version: version.to_string(),
            });
        }

        if !exists {
            let size = body.len();
            bounded_store("put", self.config.call_timeout, self.content.put(&key, body))
                .await
                .map_err(|source| DepotError::ContentWrite {
                    path: path.to_string(),
                    version: version.to_string(),
                    source,
                })?;
            tracing::info!(path = %path, version = %version, bytes = size, "Stored object version");
        }

        if promotion.is_promoting() {
            self.update_pointer(path, version, |pointer| pointer.promote(promotion, version))
                .await?;
            tracing::info!(path = %path, version = %version, promotion = ?promotion, "Promoted object version");
        }
        Ok(())
    }

    /// Publish with the raw `(dev, prod)` flags.
    pub async fn add_object_with_flags(
        &self,
        path: &ObjectPath,
        version: &str,
        body: Vec<u8>,
        dev: bool,
        prod: bool,
    ) -> DepotResult<()> {
        self.add_object(path, version, body, Promotion::from_flags(dev, prod))
            .await
    }

    /// Fetch one version.
    ///
    /// A non-empty `version` is fetched directly and pointer state is never
    /// consulted. Otherwise the pointer for `channel` is resolved first.
    pub async fn get_object(
        &self,
        path: &ObjectPath,
        version: Option<&str>,
        channel: Channel,
    ) -> DepotResult<StoredObject> {
        let version = match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                validate_version(version)?;
                version.to_string()
            }
            None => self.resolve(path, channel).await?,
        };

        let key = self.config.key_scheme.content_key(path, &version);
        match bounded_store("get", self.config.call_timeout, self.content.get(&key)).await {
            Ok(mut object) => {
                tracing::debug!(path = %path, version = %version, bytes = object.body.len(), "Read object version");
                object.version = Some(version);
                Ok(object)
            }
            Err(e) if e.is_not_found() => Err(DepotError::ContentNotFound {
                path: path.to_string(),
                version,
            }),
            Err(source) => Err(DepotError::ContentRead {
                path: path.to_string(),
                version,
                source,
            }),
        }
    }

    /// Change token of one version without fetching its bytes.
    pub async fn head_object(
        &self,
        path: &ObjectPath,
        version: Option<&str>,
        channel: Channel,
    ) -> DepotResult<(String, ChangeToken)> {
        let version = match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                validate_version(version)?;
                version.to_string()
            }
            None => self.resolve(path, channel).await?,
        };

        let key = self.config.key_scheme.content_key(path, &version);
        match bounded_store("head", self.config.call_timeout, self.content.head(&key)).await {
            Ok(token) => Ok((version, token)),
            Err(e) if e.is_not_found() => Err(DepotError::ContentNotFound {
                path: path.to_string(),
                version,
            }),
            Err(source) => Err(DepotError::ContentRead {
                path: path.to_string(),
                version,
                source,
            }),
        }
    }

    /// Point one channel at `version`. The other field is preserved and no
    /// content-existence check is made.
    pub async fn set_version(
        &self,
        path: &ObjectPath,
        version: &str,
        channel: Channel,
    ) -> DepotResult<()> {
        validate_version(version)?;
        self.update_pointer(path, version, |pointer| pointer.set_channel(channel, version))
            .await?;
        tracing::info!(path = %path, version = %version, channel = %channel, "Set version pointer");
        Ok(())
    }

    pub async fn set_dev_version(&self, path: &ObjectPath, version: &str) -> DepotResult<()> {
        self.set_version(path, version, Channel::Dev).await
    }

    /// Raw pointer record, `None` when the object was never promoted.
    pub async fn pointer(&self, path: &ObjectPath) -> DepotResult<Option<VersionPointer>> {
        self.metadata
            .get_item(&self.config.key_scheme.pointer_key(path))
            .await
            .map_err(|source| DepotError::MetadataRead {
                path: path.to_string(),
                source,
            })
    }

    pub async fn list_categories(&self, token: Option<&str>) -> DepotResult<ListPage> {
        self.lister.list_categories(token).await
    }

    pub async fn list_objects(&self, category: &str, token: Option<&str>) -> DepotResult<ListPage> {
        self.lister.list_objects(category, token).await
    }

    pub async fn list_object_versions(
        &self,
        category: &str,
        object: &str,
        token: Option<&str>,
    ) -> DepotResult<ListPage> {
        self.lister.list_object_versions(category, object, token).await
    }

    async fn resolve(&self, path: &ObjectPath, channel: Channel) -> DepotResult<String> {
        let pointer = self.pointer(path).await?;
        pointer
            .as_ref()
            .and_then(|pointer| pointer.channel(channel))
            .map(str::to_string)
            .ok_or_else(|| DepotError::PointerNotSet {
                path: path.to_string(),
                channel,
            })
    }

    /// Read-modify-write of the pointer record. Last writer wins.
    async fn update_pointer<F>(&self, path: &ObjectPath, version: &str, apply: F) -> DepotResult<()>
    where
        F: FnOnce(&mut VersionPointer),
    {
        let name = self.config.key_scheme.pointer_key(path);
        let mut pointer = self
            .metadata
            .get_item(&name)
            .await
            .map_err(|source| DepotError::MetadataWrite {
                path: path.to_string(),
                version: version.to_string(),
                source,
            })?
            .unwrap_or_else(|| VersionPointer::new(name));
        apply(&mut pointer);

        self.metadata
            .put_item(&pointer)
            .await
            .map_err(|source| DepotError::MetadataWrite {
                path: path.to_string(),
                version: version.to_string(),
                source,
            })
    }
}
