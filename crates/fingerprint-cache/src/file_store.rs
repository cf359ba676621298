use crate::error::{CacheError, Result};
use crate::fingerprint::Fingerprint;
use crate::result::{unix_ms_now, GenerationResult};
use crate::store::CacheStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

const ENVELOPE_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize, Debug)]
struct CacheEnvelope<T> {
    format: u32,
    created_ms: u64,
    result: T,
}

/// One JSON file per fingerprint under `<dir>/<template>/<aa>/<bb>/`
#[derive(Debug)]
pub struct FileCacheStore {
    base_dir: PathBuf,
    template_dir: String,
    tmp_counter: AtomicU64,
}

impl FileCacheStore {
    /// Does not touch the filesystem; directories are created on first write.
    pub fn new(base_dir: impl Into<PathBuf>, template_version: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            template_dir: safe_component(template_version),
            tmp_counter: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        let key = safe_component(fingerprint.as_str());
        let (shard_a, shard_b) = shard_dirs(&key);
        self.base_dir
            .join(&self.template_dir)
            .join(shard_a)
            .join(shard_b)
            .join(format!("{key}.json"))
    }

    /// Delete the oldest entries (by mtime) until the store fits in `max_bytes`.
    /// Returns the number of files removed. `0` disables pruning.
    pub async fn prune(&self, max_bytes: u64) -> Result<usize> {
        if max_bytes == 0 {
            return Ok(0);
        }
        let root = self.base_dir.clone();
        tokio::task::spawn_blocking(move || prune_dir(&root, max_bytes))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<GenerationResult>> {
        let path = self.entry_path(fingerprint);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let envelope: CacheEnvelope<GenerationResult> = match serde_json::from_slice(&bytes) {
            Ok(val) => val,
            Err(err) => {
                log::warn!("Cache entry corrupted {}: {err}", path.display());
                return Ok(None);
            }
        };

        if envelope.format != ENVELOPE_FORMAT || envelope.result.fingerprint != *fingerprint {
            return Ok(None);
        }
        Ok(Some(envelope.result))
    }

    async fn put(&self, fingerprint: &Fingerprint, result: &GenerationResult) -> Result<()> {
        let path = self.entry_path(fingerprint);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(&CacheEnvelope {
            format: ENVELOPE_FORMAT,
            created_ms: unix_ms_now(),
            result,
        })?;

        // Unique temp name per write so concurrent writers of one key never
        // share a partial file; the last rename wins.
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

fn safe_component(raw: &str) -> String {
    let out: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    match out.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => out,
    }
}

fn shard_dirs(hex: &str) -> (String, String) {
    let a = hex.get(0..2).unwrap_or("00").to_string();
    let b = hex.get(2..4).unwrap_or("00").to_string();
    (a, b)
}

struct FileEntry {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

fn prune_dir(root: &Path, max_bytes: u64) -> usize {
    let mut files = Vec::new();
    let mut total = 0u64;
    collect_files(root, &mut files, &mut total);
    if total <= max_bytes {
        return 0;
    }
    files.sort_by(|a, b| a.modified.cmp(&b.modified));
    let mut removed = 0;
    for file in files {
        if total <= max_bytes {
            break;
        }
        if std::fs::remove_file(&file.path).is_ok() {
            total = total.saturating_sub(file.len);
            removed += 1;
        }
    }
    log::debug!("pruned {removed} cache entries under {}", root.display());
    removed
}

fn collect_files(root: &Path, out: &mut Vec<FileEntry>, total: &mut u64) {
    let Ok(read_dir) = std::fs::read_dir(root) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect_files(&path, out, total);
            continue;
        }
        let len = meta.len();
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        *total = total.saturating_add(len);
        out.push(FileEntry {
            path,
            len,
            modified,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn entry_path_is_sharded_by_template() {
        let store = FileCacheStore::new("/cache", "v1/beta");
        let fp = Fingerprint::compute("v1/beta", "x");
        let path = store.entry_path(&fp);
        let hex = fp.as_str();
        let expected = PathBuf::from("/cache")
            .join("v1_beta")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(format!("{hex}.json"));
        assert_eq!(path, expected);
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path(), "v1");
        let fp = Fingerprint::compute("v1", "fn a() {}");

        assert_eq!(store.get(&fp).await.unwrap(), None);

        let result = GenerationResult::success(fp.clone(), "Does nothing.".into(), 1);
        store.put(&fp, &result).await.unwrap();
        assert_eq!(store.get(&fp).await.unwrap(), Some(result));
    }

    #[tokio::test]
    async fn later_write_replaces_earlier() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path(), "v1");
        let fp = Fingerprint::compute("v1", "body");

        let failed = GenerationResult::failed(fp.clone(), ErrorKind::Timeout, 3);
        store.put(&fp, &failed).await.unwrap();
        let ok = GenerationResult::success(fp.clone(), "ok".into(), 1);
        store.put(&fp, &ok).await.unwrap();

        assert_eq!(store.get(&fp).await.unwrap(), Some(ok));
    }

    #[tokio::test]
    async fn corrupted_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path(), "v1");
        let fp = Fingerprint::compute("v1", "body");
        let path = store.entry_path(&fp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        assert_eq!(store.get(&fp).await.unwrap(), None);
    }

    #[tokio::test]
    async fn prune_removes_oldest_first() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path(), "v1");
        let mut fps = Vec::new();
        for i in 0..4 {
            let fp = Fingerprint::compute("v1", &format!("chunk {i}"));
            let result = GenerationResult::success(fp.clone(), "x".repeat(200), 1);
            store.put(&fp, &result).await.unwrap();
            fps.push(fp);
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let one_entry = std::fs::metadata(store.entry_path(&fps[3])).unwrap().len();
        let removed = store.prune(one_entry * 2).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.get(&fps[0]).await.unwrap(), None);
        assert!(store.get(&fps[3]).await.unwrap().is_some());
    }
}
