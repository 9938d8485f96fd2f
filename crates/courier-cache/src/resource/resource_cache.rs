//! Resource cache with coalesced creation and exactly-once teardown.
//!
//! # Lifecycle
//!
//! Every key maps to a slot that is initialized at most once. Concurrent
//! callers for the same key wait on the same slot and receive the same
//! instance. An entry leaves the cache in exactly one of four ways:
//!
//! - **Natural eviction**: the sliding window elapsed without an access. The
//!   background sweeper (or the next access to the key) removes the entry and
//!   tears it down without blocking callers.
//! - **Explicit removal**: [`ResourceCache::remove`] tears the resource down
//!   before returning.
//! - **Full teardown**: [`ResourceCache::teardown_all`] walks every key ever
//!   registered and removes whatever is still present.
//! - **Drop**: when the last clone of the cache is dropped, remaining
//!   resources are released on the current runtime.
//!
//! Whoever takes an entry out of the map owns its teardown, and taking happens
//! under the map lock, so a resource is never torn down twice.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::ResourceCacheConfig;
use crate::deadline::deadline_after;
use crate::{Error, Result, TRACING_TARGET_RESOURCE, Teardown};

type Slot<R> = Arc<OnceCell<Arc<R>>>;

/// Cached slot and its sliding deadline.
struct CacheEntry<R> {
    slot: Slot<R>,
    expires_at: Instant,
}

impl<R> CacheEntry<R> {
    fn new(expires_at: Instant) -> Self {
        Self {
            slot: Arc::new(OnceCell::new()),
            expires_at,
        }
    }

    /// Returns the resource if the slot finished initializing.
    fn resource(&self) -> Option<Arc<R>> {
        self.slot.get().cloned()
    }

    /// In-flight slots never expire; their deadline is refreshed once created.
    fn is_expired(&self, now: Instant) -> bool {
        self.slot.initialized() && self.expires_at <= now
    }
}

struct CacheState<R> {
    entries: HashMap<String, CacheEntry<R>>,
    /// Every key ever inserted; only drives [`ResourceCache::teardown_all`].
    registry: HashSet<String>,
}

struct CacheInner<R: Teardown> {
    name: String,
    sliding_expiration: Duration,
    state: Mutex<CacheState<R>>,
    shutdown: CancellationToken,
}

impl<R: Teardown> CacheInner<R> {
    fn lock(&self) -> MutexGuard<'_, CacheState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stops the sweeper and releases whatever is still cached, including
/// resources whose creation finished after the last `teardown_all`.
impl<R: Teardown> Drop for CacheInner<R> {
    fn drop(&mut self) {
        self.shutdown.cancel();

        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let remaining: Vec<(String, Arc<R>)> = state
            .entries
            .drain()
            .filter_map(|(key, entry)| Some((key, entry.resource()?)))
            .collect();

        if remaining.is_empty() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: TRACING_TARGET_RESOURCE,
                cache = %self.name,
                count = remaining.len(),
                "No async runtime, dropped resources were not torn down"
            );
            return;
        };

        let name = self.name.clone();
        handle.spawn(async move {
            for (key, resource) in remaining {
                release(&name, &key, resource).await;
            }
        });
    }
}

/// Keyed cache of resources that must be torn down when they leave the cache.
///
/// The cache is cheaply cloneable; clones share the same entries. A
/// background sweeper is spawned on the current Tokio runtime when the cache
/// is created and stops once the last clone is dropped; any resource still
/// cached at that point is torn down in the background.
pub struct ResourceCache<R: Teardown> {
    inner: Arc<CacheInner<R>>,
}

impl<R: Teardown> Clone for ResourceCache<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Teardown> std::fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("name", &self.inner.name)
            .field("sliding_expiration", &self.inner.sliding_expiration)
            .field("len", &self.len())
            .finish()
    }
}

impl<R: Teardown> ResourceCache<R> {
    /// Creates a new cache and starts its expiration sweeper.
    ///
    /// Without a Tokio runtime no sweeper is started and expired entries are
    /// only evicted when their key is accessed again or on
    /// [`ResourceCache::evict_expired`].
    pub fn new(config: ResourceCacheConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(CacheInner {
            name: config.name().to_string(),
            sliding_expiration: config.sliding_expiration(),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                registry: HashSet::new(),
            }),
            shutdown: CancellationToken::new(),
        });

        Self::spawn_sweeper(&inner, config.sweep_interval());

        tracing::debug!(
            target: TRACING_TARGET_RESOURCE,
            cache = %inner.name,
            sliding_expiration_secs = inner.sliding_expiration.as_secs(),
            sweep_interval_secs = config.sweep_interval().as_secs(),
            "Created resource cache"
        );

        Ok(Self { inner })
    }

    /// Returns the cache name used in logs.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the sliding expiration window.
    pub fn sliding_expiration(&self) -> Duration {
        self.inner.sliding_expiration
    }

    /// Returns the resource cached under `key`, creating it with `factory` if absent.
    ///
    /// `factory` runs at most once per key no matter how many callers race on
    /// it; every caller receives the same instance. A successful access
    /// refreshes the key's sliding expiration window.
    ///
    /// A failing or cancelled factory leaves no entry behind, and its error is
    /// returned unchanged. Callers that were waiting on it may then run their
    /// own factory.
    #[tracing::instrument(skip(self, factory), target = TRACING_TARGET_RESOURCE)]
    pub async fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> Result<Arc<R>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let pending = PendingSlot {
            inner: &self.inner,
            key,
            slot: self.acquire_slot(key),
        };

        let resource = pending
            .slot
            .get_or_try_init(|| async move {
                tracing::debug!(
                    target: TRACING_TARGET_RESOURCE,
                    cache = %self.inner.name,
                    key = %key,
                    "Cache miss, creating resource"
                );
                factory().await.map(Arc::new)
            })
            .await
            .map(Arc::clone);

        match resource {
            Ok(resource) => {
                self.touch(key, &pending.slot);
                Ok(resource)
            }
            Err(error) => {
                tracing::debug!(
                    target: TRACING_TARGET_RESOURCE,
                    cache = %self.inner.name,
                    key = %key,
                    error = %error,
                    "Resource factory failed"
                );
                Err(error)
            }
        }
    }

    /// Like [`ResourceCache::get_or_create`], aborting the factory when `cancel` fires.
    pub async fn get_or_create_cancellable<F, Fut>(
        &self,
        key: &str,
        cancel: &CancellationToken,
        factory: F,
    ) -> Result<Arc<R>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        tokio::select! {
            biased;

            () = cancel.cancelled() => Err(Error::cancelled()
                .with_message(format!("Creation of resource '{key}' was cancelled"))),

            result = self.get_or_create(key, factory) => result,
        }
    }

    /// Returns the cached resource for `key` without creating it.
    ///
    /// A hit counts as an access and refreshes the sliding window.
    pub fn get(&self, key: &str) -> Option<Arc<R>> {
        let now = Instant::now();
        let mut state = self.inner.lock();
        let entry = state.entries.get_mut(key)?;
        if entry.is_expired(now) {
            return None;
        }

        let resource = entry.resource()?;
        entry.expires_at = deadline_after(now, self.inner.sliding_expiration);
        Some(resource)
    }

    /// Returns true if a live resource is cached under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.slot.initialized() && !entry.is_expired(now))
    }

    /// Returns the number of created resources currently held.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|entry| entry.slot.initialized())
            .count()
    }

    /// Returns true if no created resource is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every key ever inserted into this cache.
    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().registry.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Removes the resource cached under `key` and tears it down.
    ///
    /// Teardown has completed by the time this returns. Returns false if no
    /// created resource was cached under `key` (never inserted, already
    /// evicted, or still being created).
    #[tracing::instrument(skip(self), target = TRACING_TARGET_RESOURCE)]
    pub async fn remove(&self, key: &str) -> bool {
        let resource = {
            let mut state = self.inner.lock();
            match state.entries.get(key) {
                Some(entry) if entry.slot.initialized() => {
                    state.entries.remove(key).and_then(|entry| entry.resource())
                }
                _ => None,
            }
        };

        match resource {
            Some(resource) => {
                release(&self.inner.name, key, resource).await;
                true
            }
            None => false,
        }
    }

    /// Evicts every entry whose sliding window elapsed and tears it down.
    ///
    /// Returns the number of evicted resources.
    pub async fn evict_expired(&self) -> usize {
        let expired = {
            let now = Instant::now();
            let mut state = self.inner.lock();
            let keys: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();

            keys.into_iter()
                .filter_map(|key| {
                    let resource = state.entries.remove(&key)?.resource()?;
                    Some((key, resource))
                })
                .collect::<Vec<_>>()
        };

        if expired.is_empty() {
            return 0;
        }

        tracing::debug!(
            target: TRACING_TARGET_RESOURCE,
            cache = %self.inner.name,
            count = expired.len(),
            "Evicting expired resources"
        );

        let count = expired.len();
        let name = &self.inner.name;
        futures::future::join_all(
            expired
                .into_iter()
                .map(|(key, resource)| async move { release(name, &key, resource).await }),
        )
        .await;

        count
    }

    /// Removes and tears down every resource still cached.
    ///
    /// Safe to call repeatedly and concurrently with eviction: keys that are
    /// already gone are skipped. Returns the number of resources torn down by
    /// this call.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_RESOURCE)]
    pub async fn teardown_all(&self) -> usize {
        let mut keys: Vec<String> = self.inner.lock().registry.iter().cloned().collect();
        keys.sort_unstable();

        let mut count = 0;
        for key in keys {
            if self.remove(&key).await {
                count += 1;
            }
        }

        tracing::info!(
            target: TRACING_TARGET_RESOURCE,
            cache = %self.inner.name,
            count,
            "Tore down cached resources"
        );

        count
    }

    /// Returns the slot for `key`, installing a fresh one if needed.
    ///
    /// An expired entry found here is replaced and its resource released in
    /// the background.
    fn acquire_slot(&self, key: &str) -> Slot<R> {
        let now = Instant::now();
        let deadline = deadline_after(now, self.inner.sliding_expiration);

        let (slot, expired) = {
            let mut state = self.inner.lock();
            if !state.registry.contains(key) {
                state.registry.insert(key.to_string());
            }

            let expired = match state.entries.get(key) {
                Some(entry) if entry.is_expired(now) => {
                    state.entries.remove(key).and_then(|entry| entry.resource())
                }
                _ => None,
            };

            let entry = state
                .entries
                .entry(key.to_string())
                .or_insert_with(|| CacheEntry::new(deadline));
            entry.expires_at = deadline;
            (Arc::clone(&entry.slot), expired)
        };

        if let Some(resource) = expired {
            let name = self.inner.name.clone();
            let key = key.to_string();
            tokio::spawn(async move { release(&name, &key, resource).await });
        }

        slot
    }

    /// Refreshes the sliding window of `key` if `slot` is still installed.
    fn touch(&self, key: &str, slot: &Slot<R>) {
        let deadline = deadline_after(Instant::now(), self.inner.sliding_expiration);
        let mut state = self.inner.lock();
        if let Some(entry) = state.entries.get_mut(key)
            && Arc::ptr_eq(&entry.slot, slot)
        {
            entry.expires_at = deadline;
        }
    }

    fn spawn_sweeper(inner: &Arc<CacheInner<R>>, period: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: TRACING_TARGET_RESOURCE,
                cache = %inner.name,
                "No async runtime, expired resources are only evicted on access"
            );
            return;
        };

        let weak: Weak<CacheInner<R>> = Arc::downgrade(inner);
        let shutdown = inner.shutdown.clone();

        handle.spawn(async move {
            let start = deadline_after(Instant::now(), period);
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let Some(inner) = weak.upgrade() else {
                    break;
                };

                ResourceCache { inner }.evict_expired().await;
            }
        });
    }
}

/// Removes a slot left uninitialized by a failed or cancelled factory.
///
/// The slot is only removed when no other caller still holds it; a caller
/// that remains will run its own factory into the same slot. Handles are
/// cloned and released under the map lock, so the last failing caller always
/// observes an exact count.
struct PendingSlot<'a, R: Teardown> {
    inner: &'a CacheInner<R>,
    key: &'a str,
    slot: Slot<R>,
}

impl<R: Teardown> Drop for PendingSlot<'_, R> {
    fn drop(&mut self) {
        if self.slot.initialized() {
            return;
        }

        let mut state = self.inner.lock();
        let slot = std::mem::take(&mut self.slot);
        let installed = state
            .entries
            .get(self.key)
            .is_some_and(|entry| Arc::ptr_eq(&entry.slot, &slot));

        // One reference is held by the map, the other by this caller.
        if installed && Arc::strong_count(&slot) == 2 {
            state.entries.remove(self.key);
        }

        drop(slot);
        drop(state);
    }
}

/// Tears down a resource that has already left the map.
///
/// Failures are logged and never propagated.
async fn release<R: Teardown>(cache: &str, key: &str, resource: Arc<R>) {
    match resource.teardown().await {
        Ok(()) => tracing::debug!(
            target: TRACING_TARGET_RESOURCE,
            cache = %cache,
            key = %key,
            "Resource torn down"
        ),
        Err(error) => tracing::warn!(
            target: TRACING_TARGET_RESOURCE,
            cache = %cache,
            key = %key,
            error = %error,
            "Resource teardown failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Connection {
        id: usize,
        teardowns: AtomicUsize,
        fail_teardown: bool,
    }

    impl Connection {
        fn new(id: usize) -> Self {
            Self {
                id,
                teardowns: AtomicUsize::new(0),
                fail_teardown: false,
            }
        }

        fn failing(id: usize) -> Self {
            Self {
                fail_teardown: true,
                ..Self::new(id)
            }
        }

        fn teardowns(&self) -> usize {
            self.teardowns.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Teardown for Connection {
        async fn teardown(&self) -> Result<()> {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            if self.fail_teardown {
                return Err(Error::teardown().with_message("link already closed"));
            }
            Ok(())
        }
    }

    fn config(sliding_secs: u64) -> ResourceCacheConfig {
        // Long sweep interval so tests drive eviction explicitly.
        ResourceCacheConfig::new()
            .with_name("test")
            .with_sliding_expiration_secs(sliding_secs)
            .with_sweep_interval_secs(24 * 60 * 60)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_single_instance() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let created = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                let created = Arc::clone(&created);
                tokio::spawn(async move {
                    cache
                        .get_or_create("sender_queue_orders", || async move {
                            let id = created.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(Connection::new(id))
                        })
                        .await
                })
            })
            .collect();

        let resources: Vec<Arc<Connection>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(resources.iter().all(|r| Arc::ptr_eq(r, &resources[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_leaves_no_entry() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();

        let error = cache
            .get_or_create("sender_queue_orders", || async {
                Err(Error::factory().with_message("namespace unreachable"))
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Factory);
        assert!(!cache.contains_key("sender_queue_orders"));
        assert!(cache.is_empty());

        let resource = cache
            .get_or_create("sender_queue_orders", || async { Ok(Connection::new(7)) })
            .await
            .unwrap();
        assert_eq!(resource.id, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_factory_leaves_no_entry() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let error = cache
            .get_or_create_cancellable("receiver_queue_orders", &cancel, || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Connection::new(1))
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), crate::ErrorKind::Cancelled);
        assert!(!cache.contains_key("receiver_queue_orders"));
        assert_eq!(cache.inner.lock().entries.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_expiration_refreshes_on_access() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let resource = cache
            .get_or_create("sender_topic_events", || async { Ok(Connection::new(1)) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(cache.get("sender_topic_events").is_some());

        // 100s after creation, but only 50s after the last access.
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(cache.evict_expired().await, 0);
        assert_eq!(resource.teardowns(), 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.evict_expired().await, 1);
        assert_eq!(resource.teardowns(), 1);
        assert!(!cache.contains_key("sender_topic_events"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_evicts_untouched_entries() {
        let config = ResourceCacheConfig::new()
            .with_sliding_expiration_secs(10)
            .with_sweep_interval_secs(1);
        let cache = ResourceCache::<Connection>::new(config).unwrap();
        let resource = cache
            .get_or_create("sender_queue_orders", || async { Ok(Connection::new(1)) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(12)).await;
        settle().await;

        assert_eq!(resource.teardowns(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_replaced_on_access() {
        let cache = ResourceCache::<Connection>::new(config(10)).unwrap();
        let first = cache
            .get_or_create("sender_queue_orders", || async { Ok(Connection::new(1)) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        let second = cache
            .get_or_create("sender_queue_orders", || async { Ok(Connection::new(2)) })
            .await
            .unwrap();
        settle().await;

        assert_eq!(second.id, 2);
        assert_eq!(first.teardowns(), 1);
        assert_eq!(second.teardowns(), 0);
    }

    #[tokio::test]
    async fn test_remove_tears_down_before_returning() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let resource = cache
            .get_or_create("receiver_queue_orders", || async { Ok(Connection::new(1)) })
            .await
            .unwrap();

        assert!(cache.remove("receiver_queue_orders").await);
        assert_eq!(resource.teardowns(), 1);

        assert!(!cache.remove("receiver_queue_orders").await);
        assert!(!cache.remove("never_inserted").await);
        assert_eq!(resource.teardowns(), 1);
    }

    #[tokio::test]
    async fn test_teardown_all_is_idempotent() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let mut resources = Vec::new();
        for (id, key) in ["a", "b", "c"].into_iter().enumerate() {
            let resource = cache
                .get_or_create(key, || async move { Ok(Connection::new(id)) })
                .await
                .unwrap();
            resources.push(resource);
        }

        assert!(cache.remove("b").await);
        assert_eq!(cache.teardown_all().await, 2);
        assert_eq!(cache.teardown_all().await, 0);

        assert!(resources.iter().all(|r| r.teardowns() == 1));
        assert_eq!(cache.registered_keys(), vec!["a", "b", "c"]);
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_teardown_paths_release_once() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let mut resources = Vec::new();
        for id in 0..16 {
            let key = format!("sender_queue_{id}");
            let resource = cache
                .get_or_create(&key, || async move { Ok(Connection::new(id)) })
                .await
                .unwrap();
            resources.push(resource);
        }

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move { cache.teardown_all().await }));
        }
        for id in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                usize::from(cache.remove(&format!("sender_queue_{id}")).await)
            }));
        }

        let total: usize = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .sum();

        assert_eq!(total, 16);
        assert!(resources.iter().all(|r| r.teardowns() == 1));
    }

    #[tokio::test]
    async fn test_teardown_failure_is_contained() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let failing = cache
            .get_or_create("broken", || async { Ok(Connection::failing(1)) })
            .await
            .unwrap();
        let healthy = cache
            .get_or_create("healthy", || async { Ok(Connection::new(2)) })
            .await
            .unwrap();

        assert!(cache.remove("broken").await);
        assert_eq!(failing.teardowns(), 1);

        assert!(cache.contains_key("healthy"));
        assert_eq!(cache.teardown_all().await, 1);
        assert_eq!(healthy.teardowns(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_eviction_and_teardown_release_once() {
        let cache = ResourceCache::<Connection>::new(config(1)).unwrap();
        let mut resources = Vec::new();
        for id in 0..16 {
            let key = format!("receiver_queue_{id}");
            let resource = cache
                .get_or_create(&key, || async move { Ok(Connection::new(id)) })
                .await
                .unwrap();
            resources.push(resource);
        }

        // Every entry is now expired but still present.
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let evicting = cache.clone();
            tasks.push(tokio::spawn(async move { evicting.evict_expired().await }));
            let tearing = cache.clone();
            tasks.push(tokio::spawn(async move { tearing.teardown_all().await }));
        }
        for id in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                usize::from(cache.remove(&format!("receiver_queue_{id}")).await)
            }));
        }

        let total: usize = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .sum();

        assert_eq!(total, 16);
        assert!(resources.iter().all(|r| r.teardowns() == 1));
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_leave_no_slot() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_create("sender_topic_events", || async {
                            tokio::time::sleep(Duration::from_millis(2)).await;
                            Err(Error::factory().with_message("topic unreachable"))
                        })
                        .await
                })
            })
            .collect();

        for joined in futures::future::join_all(tasks).await {
            assert!(joined.unwrap().is_err());
        }

        assert!(cache.inner.lock().entries.is_empty());
        assert_eq!(cache.registered_keys(), vec!["sender_topic_events"]);
    }

    #[tokio::test]
    async fn test_dropping_cache_tears_down_late_resources() {
        let cache = ResourceCache::<Connection>::new(config(60)).unwrap();
        let gate = Arc::new(tokio::sync::Notify::new());

        let creating = {
            let cache = cache.clone();
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                cache
                    .get_or_create("receiver_queue_orders", || async move {
                        gate.notified().await;
                        Ok(Connection::new(1))
                    })
                    .await
            })
        };
        settle().await;

        // Still in flight, so nothing to tear down yet.
        assert_eq!(cache.teardown_all().await, 0);
        drop(cache);

        gate.notify_one();
        let resource = creating.await.unwrap().unwrap();
        settle().await;

        assert_eq!(resource.teardowns(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_windows_do_not_overflow() {
        let config = ResourceCacheConfig::new()
            .with_sliding_expiration_secs(u64::MAX)
            .with_sweep_interval_secs(u64::MAX);
        let cache = ResourceCache::<Connection>::new(config).unwrap();

        let resource = cache
            .get_or_create("sender_queue_orders", || async { Ok(Connection::new(1)) })
            .await
            .unwrap();
        assert!(cache.get("sender_queue_orders").is_some());

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(cache.evict_expired().await, 0);
        assert_eq!(resource.teardowns(), 0);
        assert!(cache.remove("sender_queue_orders").await);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ResourceCacheConfig::new().with_sliding_expiration_secs(0);
        assert!(ResourceCache::<Connection>::new(config).is_err());
    }
}
