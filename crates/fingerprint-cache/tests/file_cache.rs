use codedoc_cache::{
    ErrorKind, FileCacheStore, Fingerprint, FingerprintCache, GenerationResult, GenerationStatus,
};
use std::sync::Arc;
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn survives_reopen() {
    init_logging();
    let dir = tempdir().unwrap();
    let fp = Fingerprint::compute("v1", "def add(a, b):\n    return a + b\n");

    {
        let cache = FingerprintCache::new(Arc::new(FileCacheStore::new(dir.path(), "v1")), false);
        let result = GenerationResult::success(fp.clone(), "Adds two numbers.".into(), 2);
        cache.record(&fp, &result).await;
    }

    let reopened = FingerprintCache::new(Arc::new(FileCacheStore::new(dir.path(), "v1")), false);
    let hit = reopened.lookup(&fp).await.unwrap();
    assert_eq!(hit.explanation_text, "Adds two numbers.");
    assert_eq!(hit.attempts, 2);
    assert_eq!(hit.into_cache_hit().status, GenerationStatus::Skipped);
}

#[tokio::test]
async fn template_version_isolates_entries() {
    let dir = tempdir().unwrap();
    let text = "fn main() {}\n";
    let v1 = Fingerprint::compute("v1", text);
    let v1_cache = FingerprintCache::new(Arc::new(FileCacheStore::new(dir.path(), "v1")), false);
    v1_cache
        .record(&v1, &GenerationResult::success(v1.clone(), "Entry.".into(), 1))
        .await;

    let v2 = Fingerprint::compute("v2", text);
    let v2_cache = FingerprintCache::new(Arc::new(FileCacheStore::new(dir.path(), "v2")), false);
    assert!(v2_cache.lookup(&v2).await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_of_one_key_leave_a_whole_entry() {
    let dir = tempdir().unwrap();
    let cache = FingerprintCache::new(Arc::new(FileCacheStore::new(dir.path(), "v1")), true);
    let fp = Fingerprint::compute("v1", "shared");

    let mut handles = Vec::new();
    for i in 0..16u32 {
        let cache = cache.clone();
        let fp = fp.clone();
        handles.push(tokio::spawn(async move {
            let result = if i % 2 == 0 {
                GenerationResult::success(fp.clone(), format!("writer {i}"), 1)
            } else {
                GenerationResult::failed(fp.clone(), ErrorKind::BackendError, 3)
            };
            cache.record(&fp, &result).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = cache.lookup(&fp).await.unwrap();
    assert_eq!(stored.fingerprint, fp);
    assert!(!cache.is_degraded());
    assert_eq!(cache.stats().writes, 16);
}

#[tokio::test]
async fn unwritable_directory_degrades_instead_of_failing() {
    init_logging();
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let cache = FingerprintCache::new(Arc::new(FileCacheStore::new(&blocker, "v1")), false);
    let fp = Fingerprint::compute("v1", "x");
    cache
        .record(&fp, &GenerationResult::success(fp.clone(), "X.".into(), 1))
        .await;

    assert!(cache.is_degraded());
    assert!(cache.lookup(&fp).await.is_none());
}
