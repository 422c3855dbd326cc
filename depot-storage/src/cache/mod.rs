//! Fetch-through cache tiers.
//!
//! Three interchangeable tiers implement [`Tier`] over any [`Source`]:
//!
//! - [`MemoryTier`]: in-process LRU with per-entry TTL
//! - [`LocalTier`]: durable LMDB copy revalidated by change token
//! - [`SharedTier`]: blobs shared by change token across keys, held in
//!   process memory or on a Redis server ([`RedisSharedBlobStore`])
//!
//! Tiers never retry and never substitute errors: whatever the source
//! returns is what the caller sees. Each upstream call is bounded by the
//! tier's fetch timeout, and nothing is cached when it elapses.
//!
//! ```ignore
//! let source = ContentStoreSource::new(content.clone());
//! let local = Arc::new(LocalTier::open("/var/cache/depot", 512, source.clone())?);
//! let memory = MemoryTier::new(
//!     ExpiringLruCache::new(1000, Duration::from_secs(300))?,
//!     TierSource::new(local, source),
//! );
//! let bytes = memory.fetch("team/app.bin/v1").await?;
//! ```

pub mod clock;
pub mod local;
pub mod memory;
pub mod redis_blobs;
pub mod shared;
pub mod source;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use local::LocalTier;
pub use memory::{ExpiringLruCache, MemoryTier};
pub use redis_blobs::RedisSharedBlobStore;
pub use shared::{InMemorySharedBlobStore, SharedBlobStore, SharedTier};
pub use source::{ContentStoreSource, TierSource};
pub use traits::{Cache, CacheStats, Source, Tier};
