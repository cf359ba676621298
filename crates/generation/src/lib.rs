//! # codedoc generation
//!
//! Schedules documentation requests for chunks against a text-generation
//! backend.
//!
//! ```text
//! Chunk[] ──> plan (dedup by id, group by fingerprint)
//!               │
//!               ├─ cache hit ─────────────> Skipped
//!               └─ queue ──> C workers ──> rate gate ──> backend (timeout)
//!                                 │                         │
//!                                 └──── retry w/ backoff <──┘
//!                                              │
//!                                  terminal result ──> cache (streamed)
//! ```
//!
//! Workers never exceed the configured ceiling, and cancellation turns every
//! unfinished chunk into an explicit `Cancelled` failure.

pub mod backend;
pub mod error;
pub mod prompt;
pub mod rate_gate;
pub mod retry;
pub mod scheduler;

pub use backend::{GenerationOptions, TextGenerationBackend};
pub use error::{BackendError, Result, SchedulerError};
pub use prompt::PromptTemplate;
pub use rate_gate::RateGate;
pub use retry::RetryPolicy;
pub use scheduler::{
    ChunkState, GenerationEvent, GenerationScheduler, SchedulerSettings, SchedulerSnapshot,
    MAX_CONCURRENCY,
};
