//! Shared defaults.

use std::time::Duration;

/// Separator between path segments in content keys.
pub const PATH_DELIMITER: char = '/';

/// Metadata store attempt budget.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Linear backoff unit: attempt `i` waits `i` units before the next attempt.
pub const DEFAULT_RETRY_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Bound on every upstream call (store, source, remote controller).
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Matches the object-store maximum page size.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

pub const DEFAULT_METADATA_MAP_SIZE_MB: usize = 64;

pub const DEFAULT_LOCAL_CACHE_MAP_SIZE_MB: usize = 1024;

pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080/";
