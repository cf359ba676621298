use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for boundary detection and chunk assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size measured with `size_metric` (hard limit, except for
    /// single units that exceed it on their own)
    pub max_chunk_budget: usize,

    /// How chunk sizes are measured
    pub size_metric: SizeMetric,

    /// Try a tree-sitter parse before the structural scan for languages that
    /// have a grammar bundled
    pub use_syntax_tree: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_budget: 1000,
            size_metric: SizeMetric::Chars,
            use_syntax_tree: true,
        }
    }
}

impl ChunkerConfig {
    /// Config with a specific character budget
    pub fn with_char_budget(budget: usize) -> Self {
        Self {
            max_chunk_budget: budget,
            size_metric: SizeMetric::Chars,
            ..Default::default()
        }
    }

    /// Config with a specific token budget
    pub fn with_token_budget(budget: usize) -> Self {
        Self {
            max_chunk_budget: budget,
            size_metric: SizeMetric::Tokens,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_budget == 0 {
            return Err(ChunkerError::InvalidConfig(
                "max_chunk_budget must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unit used to measure chunk sizes against the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMetric {
    /// Byte length of the text
    #[default]
    Chars,

    /// Rough token estimate (~4 bytes of code per token)
    Tokens,
}

impl SizeMetric {
    /// Measure a piece of text
    #[must_use]
    pub fn measure(self, text: &str) -> usize {
        match self {
            Self::Chars => text.len(),
            Self::Tokens => estimate_tokens(text),
        }
    }
}

/// Estimate tokens from content (rough heuristic: 4 chars per token for code)
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}
