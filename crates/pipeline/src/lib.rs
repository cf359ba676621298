//! # codedoc pipeline
//!
//! Turns a stream of source files into per-unit documentation.
//!
//! ```text
//! FileProvider ──> Chunker (detect + assemble)
//!                     │
//!                     └──> GenerationScheduler ──> backend
//!                              │        └──> FingerprintCache
//!                              └──> aggregate
//!                                      │
//!                                      ├──> file summaries (optional, same scheduler machinery)
//!                                      ├──> project overview (optional)
//!                                      └──> RunReport ──> OutputWriter
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codedoc_pipeline::{DocPipeline, MemoryWriter, PipelineConfig, SourceFile, VecProvider};
//! use codedoc_generation::TextGenerationBackend;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo(backend: Arc<dyn TextGenerationBackend>) -> anyhow::Result<()> {
//! let pipeline = DocPipeline::new(PipelineConfig::default(), backend)?;
//! let mut files = VecProvider::new(vec![SourceFile::new("src/main.rs", "fn main() {}\n")]);
//! let report = pipeline.run(&mut files, &CancellationToken::new()).await?;
//!
//! let mut out = MemoryWriter::default();
//! report.write_to(&mut out)?;
//! println!("{} units documented", report.summary.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod summary;
pub mod writer;

pub use aggregator::{
    aggregate, DocumentNode, FileDocument, NodeContent, RunSummary, SummaryContent,
};
pub use config::{CacheSettings, PipelineConfig, SummarySettings};
pub use error::{ConfigError, PipelineError, ProviderError, Result, WriterError};
pub use pipeline::{DocPipeline, RunReport};
pub use provider::{FileProvider, SourceFile, VecProvider};
pub use writer::{JsonLinesWriter, MemoryWriter, OutputWriter};
