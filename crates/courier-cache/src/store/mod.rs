//! Key-value stores with per-entry expiration.
//!
//! This module provides:
//! - `TtlStore<V>`: async get/set/remove contract with fixed or sliding expiry
//! - `MemoryStore<V>`: process-local implementation
//! - `Expiration`: expiry policy chosen per entry on `set`

mod memory_store;
mod ttl_store;

pub use memory_store::MemoryStore;
pub use ttl_store::{Expiration, TtlStore};
