//! DEPOT Storage - Store Ports, Version Controller and Cache Tiers
//!
//! Defines the content and metadata store abstractions with their adapters,
//! the retry policy wrapping metadata calls, the Version Controller and
//! Listing Engine built on top of them, and the fetch-through cache tiers.

pub mod cache;
pub mod content;
pub mod controller;
pub mod fs_content;
pub mod listing;
pub mod metadata;
pub mod retry;
pub mod timeout;

pub use cache::{
    Cache, CacheStats, Clock, ContentStoreSource, ExpiringLruCache, InMemorySharedBlobStore,
    LocalTier, ManualClock, MemoryTier, RedisSharedBlobStore, SharedBlobStore, SharedTier, Source,
    SystemClock, Tier, TierSource,
};
pub use content::{page_sorted_keys, ContentStore, InMemoryContentStore, ListOutput, ListRequest};
pub use controller::{ControllerConfig, VersionController};
pub use fs_content::FsContentStore;
pub use listing::Lister;
pub use metadata::{InMemoryMetadataStore, LmdbMetadataStore, MetadataStore};
pub use retry::{RetryPolicy, RetryingMetadataStore};
