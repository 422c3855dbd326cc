//! Configuration value shared by every DEPOT component.
//!
//! Built once at process start (see `depot-api` for the environment loader)
//! and passed by reference into constructors.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_LIST_PAGE_SIZE, DEFAULT_LOCAL_CACHE_MAP_SIZE_MB,
    DEFAULT_METADATA_MAP_SIZE_MB,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_UNIT, DEFAULT_UPSTREAM_TIMEOUT,
    DEFAULT_UPSTREAM_URL,
};
use crate::{DepotError, DepotResult, KeyScheme};

#[derive(Debug, Clone, PartialEq)]
pub struct DepotConfig {
    /// Content-store bucket: root directory of the filesystem content store.
    pub content_root: PathBuf,
    /// Metadata-store table: directory of the LMDB pointer table.
    pub metadata_path: PathBuf,
    /// Maximum size of the pointer table in megabytes.
    pub metadata_map_size_mb: usize,
    /// Optional shared prefix for content keys.
    pub path_prefix: Option<String>,
    /// In-process cache capacity (entries).
    pub cache_capacity: usize,
    /// In-process cache entry lifetime.
    pub cache_ttl: Duration,
    /// Base URL of the upstream Version API for sidecar deployments.
    pub upstream_url: String,
    /// Directory of the durable local cache tier.
    pub local_cache_path: PathBuf,
    /// Maximum size of the durable local cache tier in megabytes.
    pub local_cache_map_size_mb: usize,
    /// Redis server holding the shared tier's blobs. Without it the shared
    /// tier keeps blobs in process memory.
    pub redis_url: Option<String>,
    /// Metadata store attempt budget.
    pub retry_attempts: u32,
    /// Linear backoff unit between metadata attempts.
    pub retry_backoff_unit: Duration,
    /// Bound on every upstream call.
    pub upstream_timeout: Duration,
    /// Page size requested from the content store when listing.
    pub list_page_size: usize,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("./data/objects"),
            metadata_path: PathBuf::from("./data/pointers"),
            metadata_map_size_mb: DEFAULT_METADATA_MAP_SIZE_MB,
            path_prefix: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            local_cache_path: PathBuf::from("./data/cache"),
            local_cache_map_size_mb: DEFAULT_LOCAL_CACHE_MAP_SIZE_MB,
            redis_url: None,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff_unit: DEFAULT_RETRY_BACKOFF_UNIT,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

impl DepotConfig {
    /// Reject values no component can run with.
    pub fn validate(&self) -> DepotResult<()> {
        if self.cache_capacity == 0 {
            return Err(DepotError::config("cache_capacity", "must be greater than zero"));
        }
        if self.retry_attempts == 0 {
            return Err(DepotError::config("retry_attempts", "must be at least 1"));
        }
        if self.list_page_size == 0 {
            return Err(DepotError::config("list_page_size", "must be greater than zero"));
        }
        if self.metadata_map_size_mb == 0 {
            return Err(DepotError::config("metadata_map_size_mb", "must be greater than zero"));
        }
        if self.local_cache_map_size_mb == 0 {
            return Err(DepotError::config("local_cache_map_size_mb", "must be greater than zero"));
        }
        if self.upstream_timeout.is_zero() {
            return Err(DepotError::config("upstream_timeout", "must be greater than zero"));
        }
        if self.upstream_url.trim().is_empty() {
            return Err(DepotError::config("upstream_url", "must not be empty"));
        }
        Ok(())
    }

    pub fn key_scheme(&self) -> KeyScheme {
        KeyScheme::new(self.path_prefix.as_deref())
    }

    /// Upstream base URL with exactly one trailing slash.
    pub fn upstream_base(&self) -> String {
        format!("{}/", self.upstream_url.trim_end_matches('/'))
    }
}
