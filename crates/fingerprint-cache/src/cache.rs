use crate::fingerprint::Fingerprint;
use crate::result::GenerationResult;
use crate::store::CacheStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub degraded: bool,
}

struct CacheInner {
    store: Option<Arc<dyn CacheStore>>,
    reuse_failed_results: bool,
    degraded: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

/// Shared front for a [`CacheStore`] that never fails its callers.
///
/// The first store error is logged as `CacheUnavailable`; from then on every
/// lookup misses and nothing is persisted until the cache is rebuilt.
#[derive(Clone)]
pub struct FingerprintCache {
    inner: Arc<CacheInner>,
}

impl FingerprintCache {
    pub fn new(store: Arc<dyn CacheStore>, reuse_failed_results: bool) -> Self {
        Self::build(Some(store), reuse_failed_results)
    }

    /// Cache that always misses and never persists
    #[must_use]
    pub fn disabled() -> Self {
        Self::build(None, false)
    }

    fn build(store: Option<Arc<dyn CacheStore>>, reuse_failed_results: bool) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                reuse_failed_results,
                degraded: AtomicBool::new(false),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Stored result for `fingerprint`, if usable.
    ///
    /// Failed results only count as hits when `reuse_failed_results` is set.
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Option<GenerationResult> {
        let found = match self.active_store() {
            Some(store) => match store.get(fingerprint).await {
                Ok(found) => found,
                Err(err) => {
                    self.degrade(&err);
                    None
                }
            },
            None => None,
        };

        let usable = found.filter(|result| {
            result.fingerprint == *fingerprint
                && !result.is_cancelled()
                && (!result.is_failed() || self.inner.reuse_failed_results)
        });

        let counter = if usable.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        usable
    }

    /// Persist a terminal result. Cancelled results are never stored.
    pub async fn record(&self, fingerprint: &Fingerprint, result: &GenerationResult) {
        if result.is_cancelled() {
            return;
        }
        let Some(store) = self.active_store() else {
            return;
        };
        match store.put(fingerprint, result).await {
            Ok(()) => {
                self.inner.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => self.degrade(&err),
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            writes: self.inner.writes.load(Ordering::Relaxed),
            degraded: self.is_degraded(),
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn CacheStore>> {
        if self.is_degraded() {
            return None;
        }
        self.inner.store.as_ref()
    }

    fn degrade(&self, err: &crate::error::CacheError) {
        if !self.inner.degraded.swap(true, Ordering::AcqRel) {
            log::warn!("CacheUnavailable: {err}; continuing without cache for this run");
        }
    }
}

impl std::fmt::Debug for FingerprintCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintCache")
            .field("enabled", &self.inner.store.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, Result};
    use crate::memory_store::MemoryCacheStore;
    use crate::result::{ErrorKind, GenerationStatus};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    struct BrokenStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _: &Fingerprint) -> Result<Option<GenerationResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("disk gone".into()))
        }

        async fn put(&self, _: &Fingerprint, _: &GenerationResult) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("disk gone".into()))
        }
    }

    fn fp(text: &str) -> Fingerprint {
        Fingerprint::compute("v1", text)
    }

    #[tokio::test]
    async fn hit_after_record() {
        let cache = FingerprintCache::new(Arc::new(MemoryCacheStore::new(8)), false);
        let key = fp("a");
        assert!(cache.lookup(&key).await.is_none());

        let result = GenerationResult::success(key.clone(), "A.".into(), 1);
        cache.record(&key, &result).await;

        assert_eq!(cache.lookup(&key).await, Some(result));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
    }

    #[tokio::test]
    async fn failed_results_are_retried_unless_reused() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(8));
        let key = fp("b");
        let failed = GenerationResult::failed(key.clone(), ErrorKind::RetriesExhausted, 3);

        let retrying = FingerprintCache::new(store.clone(), false);
        retrying.record(&key, &failed).await;
        assert!(retrying.lookup(&key).await.is_none());

        let reusing = FingerprintCache::new(store, true);
        let hit = reusing.lookup(&key).await.unwrap();
        assert_eq!(hit.status, GenerationStatus::Failed);
    }

    #[tokio::test]
    async fn cancelled_results_are_not_persisted() {
        let store = Arc::new(MemoryCacheStore::new(8));
        let cache = FingerprintCache::new(store.clone(), true);
        let key = fp("c");
        cache
            .record(&key, &GenerationResult::failed(key.clone(), ErrorKind::Cancelled, 1))
            .await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_degrades_once() {
        let store = Arc::new(BrokenStore {
            calls: AtomicUsize::new(0),
        });
        let cache = FingerprintCache::new(store.clone(), false);
        let key = fp("d");

        assert!(cache.lookup(&key).await.is_none());
        assert!(cache.is_degraded());

        cache
            .record(&key, &GenerationResult::success(key.clone(), "D.".into(), 1))
            .await;
        assert!(cache.lookup(&key).await.is_none());

        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().writes, 0);
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = FingerprintCache::disabled();
        let key = fp("e");
        cache
            .record(&key, &GenerationResult::success(key.clone(), "E.".into(), 1))
            .await;
        assert!(cache.lookup(&key).await.is_none());
        assert!(!cache.is_degraded());
    }
}
