//! Process-local TTL store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{Expiration, TtlStore};
use crate::deadline::deadline_after;
use crate::TRACING_TARGET_STORE;

#[derive(Debug, Clone)]
struct StoredValue<V> {
    value: V,
    expiration: Expiration,
    expires_at: Instant,
}

impl<V> StoredValue<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory [`TtlStore`] keyed by string.
///
/// Expired entries are dropped lazily on access or by
/// [`MemoryStore::purge_expired`]. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct MemoryStore<V> {
    entries: Arc<Mutex<HashMap<String, StoredValue<V>>>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V> MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|_, stored| !stored.is_expired(now));
        before - guard.len()
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let guard = self.entries.lock().await;
        guard.values().filter(|stored| !stored.is_expired(now)).count()
    }

    /// Returns true if no live entry is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl<V> TtlStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;

        let Some(stored) = guard.get_mut(key) else {
            tracing::trace!(target: TRACING_TARGET_STORE, key = %key, "Store miss");
            return None;
        };

        if stored.is_expired(now) {
            guard.remove(key);
            tracing::trace!(target: TRACING_TARGET_STORE, key = %key, "Store entry expired");
            return None;
        }

        if let Expiration::Sliding(window) = stored.expiration {
            stored.expires_at = deadline_after(now, window);
        }

        Some(stored.value.clone())
    }

    async fn set(&self, key: &str, value: V, expiration: Expiration) -> V {
        let expires_at = deadline_after(Instant::now(), expiration.duration());
        let mut guard = self.entries.lock().await;
        guard.insert(
            key.to_string(),
            StoredValue {
                value: value.clone(),
                expiration,
                expires_at,
            },
        );

        tracing::trace!(
            target: TRACING_TARGET_STORE,
            key = %key,
            ttl_ms = expiration.duration().as_millis() as u64,
            sliding = expiration.is_sliding(),
            "Stored value"
        );

        value
    }

    async fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        guard
            .remove(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.value)
    }
}
