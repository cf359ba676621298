use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::result::GenerationResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Persistent key/value store for generation results
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` on a miss; `Err` only when the store itself is unusable
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<GenerationResult>>;

    /// Overwrites any previous entry for the key
    async fn put(&self, fingerprint: &Fingerprint, result: &GenerationResult) -> Result<()>;
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    File,
    Memory,
}
