use codedoc_cache::{ErrorKind, GenerationResult, GenerationStatus};
use codedoc_chunker::{Chunk, ChunkId, Language, SourceUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::Arc;

/// What a unit is documented with. Whether the text came from the backend
/// or the cache is left out so reruns over a warm cache give equal nodes;
/// that split lives in [`RunSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeContent {
    Explanation {
        text: String,
        chunk_id: ChunkId,
        /// Units documented by the same explanation (1 = this unit alone)
        shared_with: usize,
    },
    /// `error_kind` is `None` when no result exists for the chunk at all
    Failed {
        error_kind: Option<ErrorKind>,
        chunk_id: ChunkId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub source_unit: SourceUnit,
    pub content: NodeContent,
}

impl DocumentNode {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.content, NodeContent::Failed { .. })
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Explanation { text, .. } => Some(text),
            NodeContent::Failed { .. } => None,
        }
    }
}

/// Outcome of a file summary or project overview request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryContent {
    Text { text: String },
    Failed { error_kind: Option<ErrorKind> },
}

impl SummaryContent {
    pub(crate) fn from_result(result: Option<&GenerationResult>) -> Self {
        match result {
            Some(r) if !r.is_failed() => Self::Text {
                text: r.explanation_text.clone(),
            },
            other => Self::Failed {
                error_kind: other.and_then(|r| r.error_kind),
            },
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Failed { .. } => None,
        }
    }
}

/// Per-unit outcome counts. `skipped` covers cache hits and blank chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDocument {
    pub file_path: String,
    pub language: Language,
    pub nodes: Vec<DocumentNode>,
    /// Set when file summaries are enabled and the file had explanations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_summary: Option<SummaryContent>,
}

/// Build a file's document in source order, whatever order results arrived in
pub fn aggregate(
    file_path: &str,
    language: Language,
    chunks: &[Arc<Chunk>],
    results: &HashMap<ChunkId, GenerationResult>,
) -> (FileDocument, RunSummary) {
    let mut ordered: Vec<&Arc<Chunk>> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.start_offset());

    let mut nodes = Vec::new();
    let mut summary = RunSummary::default();

    for chunk in ordered {
        let shared_with = chunk.units.len();
        let result = results.get(&chunk.id);
        for unit in &chunk.units {
            let content = match result {
                Some(r) if !r.is_failed() => {
                    if r.status == GenerationStatus::Success {
                        summary.succeeded += 1;
                    } else {
                        summary.skipped += 1;
                    }
                    NodeContent::Explanation {
                        text: r.explanation_text.clone(),
                        chunk_id: chunk.id.clone(),
                        shared_with,
                    }
                }
                other => {
                    summary.failed += 1;
                    NodeContent::Failed {
                        error_kind: other.and_then(|r| r.error_kind),
                        chunk_id: chunk.id.clone(),
                    }
                }
            };
            nodes.push(DocumentNode {
                source_unit: unit.clone(),
                content,
            });
        }
    }

    let document = FileDocument {
        file_path: file_path.to_string(),
        language,
        nodes,
        file_summary: None,
    };
    (document, summary)
}
