use crate::language::Language;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Chunker failures.
///
/// Only configuration errors reach callers of [`crate::Chunker`]; the
/// syntax-tree variants stay internal because detection falls back to the
/// structural scan.
#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),

    #[error("No syntax tree grammar for {0}")]
    NoGrammar(Language),

    #[error("Syntax tree unusable: {0}")]
    SyntaxTree(String),
}
