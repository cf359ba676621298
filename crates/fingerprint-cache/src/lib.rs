//! # codedoc cache
//!
//! Content-addressed storage of generation results.
//!
//! ```text
//! (template version, chunk text)
//!     │
//!     └──> Fingerprint (SHA-256, hex)
//!            │
//!            └──> FingerprintCache ──> CacheStore
//!                   (degrades on error)   ├─ FileCacheStore   (sharded JSON files)
//!                                         └─ MemoryCacheStore (LRU)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codedoc_cache::{FileCacheStore, Fingerprint, FingerprintCache, GenerationResult};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let cache = FingerprintCache::new(Arc::new(FileCacheStore::new(".codedoc_cache", "v1")), false);
//! let fp = Fingerprint::compute("v1", "fn main() {}\n");
//! if cache.lookup(&fp).await.is_none() {
//!     let result = GenerationResult::success(fp.clone(), "Program entry point.".into(), 1);
//!     cache.record(&fp, &result).await;
//! }
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod file_store;
pub mod fingerprint;
pub mod memory_store;
pub mod result;
pub mod store;

pub use cache::{CacheStats, FingerprintCache};
pub use error::{CacheError, Result};
pub use file_store::FileCacheStore;
pub use fingerprint::Fingerprint;
pub use memory_store::MemoryCacheStore;
pub use result::{ErrorKind, GenerationResult, GenerationStatus};
pub use store::{CacheBackend, CacheStore};
