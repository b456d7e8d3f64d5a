//! Memoized snapshot of every stored selector configuration

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::store::SelectorConfigurationStore;
use crate::types::SelectorConfiguration;

/// Immutable, ordered view of the stored configurations
pub type Snapshot = Arc<[SelectorConfiguration]>;

/// Caches the full configuration list in front of the store
///
/// Reads are served from a shared slot. A cold slot is populated under a
/// single async mutex with a re-check, so concurrent cold readers share one
/// store round-trip. Every invalidation bumps a generation counter; a
/// population that started under an older generation hands its result to
/// its own caller but never installs it.
pub struct ConfigurationSnapshotCache {
    store: Arc<dyn SelectorConfigurationStore>,
    cached: RwLock<Option<Snapshot>>,
    populate: Mutex<()>,
    generation: AtomicU64,
    store_reads: AtomicUsize,
}

impl ConfigurationSnapshotCache {
    pub fn new(store: Arc<dyn SelectorConfigurationStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            populate: Mutex::new(()),
            generation: AtomicU64::new(0),
            store_reads: AtomicUsize::new(0),
        }
    }

    /// Current snapshot, reading through to the store when cold
    pub async fn browse(&self) -> Result<Snapshot> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let _guard = self.populate.lock().await;

        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let configurations = self.store.browse().await?;
        self.store_reads.fetch_add(1, Ordering::Relaxed);

        let snapshot: Snapshot = configurations.into();
        debug!("Loaded selector configuration snapshot ({} entries)", snapshot.len());

        let mut slot = self.cached.write();
        if self.generation.load(Ordering::Acquire) == generation {
            *slot = Some(snapshot.clone());
        } else {
            debug!("Snapshot invalidated while loading, not caching it");
        }

        Ok(snapshot)
    }

    /// Cached snapshot without touching the store
    pub fn current(&self) -> Option<Snapshot> {
        self.cached.read().clone()
    }

    /// Discard the snapshot; the next browse reads from the store
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.cached.write() = None;
    }

    /// Drop the snapshot to reclaim memory
    ///
    /// Unlike [`invalidate`](Self::invalidate) an in-flight population may
    /// still install its result afterwards.
    pub fn release(&self) {
        *self.cached.write() = None;
    }

    /// Number of store round-trips performed so far
    pub fn store_reads(&self) -> usize {
        self.store_reads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySelectorConfigurationStore;
    use crate::types::EntityId;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Store whose listing takes a while to come back
    struct SlowStore {
        inner: InMemorySelectorConfigurationStore,
        delay: Duration,
    }

    #[async_trait]
    impl SelectorConfigurationStore for SlowStore {
        async fn browse(&self) -> Result<Vec<SelectorConfiguration>> {
            let configurations = self.inner.browse().await?;
            tokio::time::sleep(self.delay).await;
            Ok(configurations)
        }

        async fn read(&self, id: &EntityId) -> Result<Option<SelectorConfiguration>> {
            self.inner.read(id).await
        }

        async fn create(&self, configuration: SelectorConfiguration) -> Result<SelectorConfiguration> {
            self.inner.create(configuration).await
        }

        async fn update(&self, configuration: SelectorConfiguration) -> Result<()> {
            self.inner.update(configuration).await
        }

        async fn delete(&self, configuration: &SelectorConfiguration) -> Result<()> {
            self.inner.delete(configuration).await
        }
    }

    async fn store_with(names: &[&str]) -> Arc<InMemorySelectorConfigurationStore> {
        let store = Arc::new(InMemorySelectorConfigurationStore::new());
        for name in names {
            store
                .create(SelectorConfiguration::csel(*name, "true"))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_snapshot_is_reused() {
        let store = store_with(&["a", "b"]).await;
        let cache = ConfigurationSnapshotCache::new(store.clone());

        let first = cache.browse().await.unwrap();
        let second = cache.browse().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(cache.store_reads(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = store_with(&["a"]).await;
        let cache = ConfigurationSnapshotCache::new(store.clone());

        let first = cache.browse().await.unwrap();
        store.create(SelectorConfiguration::csel("b", "true")).await.unwrap();

        // Without invalidation the stale snapshot is served
        assert_eq!(cache.browse().await.unwrap().len(), 1);

        cache.invalidate();
        let second = cache.browse().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        assert_eq!(cache.store_reads(), 2);
    }

    #[tokio::test]
    async fn test_release_recomputes_lazily() {
        let store = store_with(&["a"]).await;
        let cache = ConfigurationSnapshotCache::new(store);

        cache.browse().await.unwrap();
        cache.release();
        assert!(cache.current().is_none());

        assert_eq!(cache.browse().await.unwrap().len(), 1);
        assert_eq!(cache.store_reads(), 2);
    }

    #[tokio::test]
    async fn test_invalidating_empty_cache_is_noop() {
        let store = store_with(&[]).await;
        let cache = ConfigurationSnapshotCache::new(store);

        cache.invalidate();
        cache.invalidate();

        assert!(cache.current().is_none());
        assert!(cache.browse().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cold_reads_share_one_round_trip() {
        let store = store_with(&["a", "b", "c"]).await;
        let cache = Arc::new(ConfigurationSnapshotCache::new(store));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.browse().await.unwrap().len() }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 3);
        }
        assert_eq!(cache.store_reads(), 1);
    }

    #[tokio::test]
    async fn test_load_started_before_invalidate_is_not_installed() {
        let store = Arc::new(SlowStore {
            inner: InMemorySelectorConfigurationStore::new(),
            delay: Duration::from_millis(100),
        });
        let cache = Arc::new(ConfigurationSnapshotCache::new(store.clone()));

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.browse().await.unwrap().len() })
        };

        // Let the load read the (still empty) store, then change it underneath
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.create(SelectorConfiguration::csel("a", "true")).await.unwrap();
        cache.invalidate();

        assert_eq!(in_flight.await.unwrap(), 0);
        assert!(cache.current().is_none(), "Stale load must not be cached");

        assert_eq!(cache.browse().await.unwrap().len(), 1);
        assert!(cache.current().is_some());
        assert_eq!(cache.store_reads(), 2);
    }
}
