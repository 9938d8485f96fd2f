#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for resource cache operations.
///
/// Use this target for logging resource creation, eviction, and teardown.
pub const TRACING_TARGET_RESOURCE: &str = "courier_cache::resource";

/// Tracing target for key-value TTL store operations.
///
/// Use this target for logging store hits, misses, and expirations.
pub const TRACING_TARGET_STORE: &str = "courier_cache::store";

mod deadline;
mod resource;
mod store;
mod teardown;

pub use courier_core::{Error, ErrorKind, Result};
pub use resource::{ResourceCache, ResourceCacheConfig};
pub use store::{Expiration, MemoryStore, TtlStore};
pub use teardown::Teardown;
