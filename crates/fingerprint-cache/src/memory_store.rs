use crate::error::{CacheError, Result};
use crate::fingerprint::Fingerprint;
use crate::result::GenerationResult;
use crate::store::CacheStore;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Process-local LRU store; contents vanish with the process
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<Fingerprint, GenerationResult>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<GenerationResult>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(entries.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: &Fingerprint, result: &GenerationResult) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.put(fingerprint.clone(), result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> (Fingerprint, GenerationResult) {
        let fp = Fingerprint::compute("v1", text);
        let result = GenerationResult::success(fp.clone(), format!("explains {text}"), 1);
        (fp, result)
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let store = MemoryCacheStore::new(2);
        let (a, ra) = entry("a");
        let (b, rb) = entry("b");
        let (c, rc) = entry("c");

        store.put(&a, &ra).await.unwrap();
        store.put(&b, &rb).await.unwrap();
        // touch `a` so `b` is the eviction candidate
        assert!(store.get(&a).await.unwrap().is_some());
        store.put(&c, &rc).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(&b).await.unwrap().is_none());
        assert_eq!(store.get(&c).await.unwrap(), Some(rc));
    }

    #[tokio::test]
    async fn zero_capacity_still_holds_one() {
        let store = MemoryCacheStore::new(0);
        let (a, ra) = entry("a");
        store.put(&a, &ra).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
