//! Key-value TTL store contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Expiration policy of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiration {
    /// Entry expires a fixed duration after it was stored.
    Fixed(Duration),
    /// Entry expires after the duration elapses without a read.
    Sliding(Duration),
}

impl Expiration {
    /// Returns the configured duration regardless of policy.
    #[inline]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Fixed(duration) | Self::Sliding(duration) => *duration,
        }
    }

    /// Returns true for sliding expiration.
    #[inline]
    pub fn is_sliding(&self) -> bool {
        matches!(self, Self::Sliding(_))
    }
}

/// Asynchronous key-value store whose entries expire.
///
/// Implementations must be safe to share between tasks; a single store can
/// back any number of independent users as long as their keys differ.
#[async_trait::async_trait]
pub trait TtlStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the value stored under `key` unless it is absent or expired.
    async fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under `key` with the given expiration and returns it.
    async fn set(&self, key: &str, value: V, expiration: Expiration) -> V;

    /// Removes the value stored under `key`, returning it if it was live.
    async fn remove(&self, key: &str) -> Option<V>;
}
