//! # codedoc Chunker
//!
//! Boundary detection and budgeted chunk assembly for LLM documentation runs.
//!
//! ## Philosophy
//!
//! The chunker splits source files into units a generation backend can digest:
//! - Unit spans follow syntactic boundaries (functions, classes, top-level blocks)
//! - Spans always cover the whole file, in order, without overlap
//! - Ambiguous regions are kept whole rather than cut in the wrong place
//! - Chunk boundaries are a pure function of `(units, budget)` so fingerprints stay stable
//!
//! ## Architecture
//!
//! ```text
//! Source Text + Language Tag
//!     │
//!     ├──> Boundary Detection
//!     │    ├─> Tree-sitter top-level nodes (rust/python/js/ts, error-free trees only)
//!     │    ├─> Structural scan (braces / indentation / def..end)
//!     │    └─> Whole-file fallback (unknown languages)
//!     │
//!     └──> Chunk Assembly
//!          ├─> Greedy packing in source order under the budget
//!          └─> Oversized units become single-unit chunks (never truncated)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codedoc_chunker::{Chunker, ChunkerConfig, Language};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = "fn parse(input: &str) -> usize {\n    input.len()\n}\n";
//!
//! let chunks = chunker.chunk("src/lib.rs", code, Language::Rust);
//! for chunk in chunks {
//!     println!("{}: {} unit(s), {} bytes", chunk.id, chunk.units.len(), chunk.size_estimate);
//! }
//! ```

mod assembler;
mod ast_analyzer;
mod chunker;
mod config;
mod detector;
mod error;
mod language;
mod scanner;
mod symbols;
mod types;

pub use assembler::{assemble, ChunkAssembler};
pub use chunker::Chunker;
pub use config::{ChunkerConfig, SizeMetric};
pub use detector::{detect, BoundaryDetector};
pub use error::{ChunkerError, Result};
pub use language::{Language, SyntaxFamily};
pub use types::{Chunk, ChunkId, SourceUnit, UnitKind};
