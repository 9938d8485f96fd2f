//! Keyed cache of lifetime-managed resources.
//!
//! This module provides:
//! - `ResourceCache<R>`: coalesced creation, sliding expiration, exactly-once teardown
//! - `ResourceCacheConfig`: expiration window and sweep cadence
//!
//! # Example
//!
//! ```ignore
//! let cache: ResourceCache<QueueConnection> = ResourceCache::new(ResourceCacheConfig::default());
//!
//! // Concurrent callers share the single instance built by the first factory.
//! let connection = cache
//!     .get_or_create("sender_queue_orders", || async { broker.connect("orders").await })
//!     .await?;
//!
//! // On shutdown, release everything that is still cached.
//! cache.teardown_all().await;
//! ```

mod resource_cache;
mod resource_config;

pub use resource_cache::ResourceCache;
pub use resource_config::ResourceCacheConfig;
