//! Inputs for the file summary and project overview passes.
//!
//! Both passes reuse the generation scheduler: their inputs are packed into
//! synthetic chunks whose text is earlier output rather than source, so they
//! are fingerprinted, cached and retried like any unit chunk.

use crate::aggregator::{FileDocument, NodeContent, SummaryContent};
use codedoc_chunker::{Chunk, ChunkId, SourceUnit, UnitKind};

/// Path used for the overview chunk
pub const PROJECT_PATH: &str = "project";

/// One chunk carrying the file's explanations in source order, each
/// multi-unit explanation once. `None` when nothing was explained.
pub(crate) fn file_summary_chunk(document: &FileDocument) -> Option<Chunk> {
    let mut text = String::new();
    let mut units = Vec::new();
    let mut last: Option<&ChunkId> = None;
    let mut labels: Vec<String> = Vec::new();
    let mut pending: Option<&str> = None;

    for node in &document.nodes {
        let NodeContent::Explanation {
            text: explanation,
            chunk_id,
            ..
        } = &node.content
        else {
            continue;
        };
        if explanation.trim().is_empty() {
            continue;
        }
        units.push(node.source_unit.clone());
        if last == Some(chunk_id) {
            labels.push(node.source_unit.label());
            continue;
        }
        if let Some(previous) = pending.take() {
            push_section(&mut text, &labels, previous);
        }
        labels = vec![node.source_unit.label()];
        pending = Some(explanation.as_str());
        last = Some(chunk_id);
    }
    let previous = pending?;
    push_section(&mut text, &labels, previous);

    Some(Chunk {
        id: ChunkId::new(&document.file_path, 0),
        file_path: document.file_path.clone(),
        units,
        size_estimate: text.len(),
        text,
        oversized: false,
    })
}

fn push_section(out: &mut String, labels: &[String], explanation: &str) {
    out.push_str("## ");
    out.push_str(&labels.join(", "));
    out.push('\n');
    out.push_str(explanation.trim_end());
    out.push_str("\n\n");
}

/// One chunk with an excerpt per file, taken from the file summary when it
/// exists and from the unit explanations otherwise. `None` when no file
/// contributed anything.
pub(crate) fn overview_chunk(
    documents: &[FileDocument],
    max_files: usize,
    excerpt_chars: usize,
) -> Option<Chunk> {
    let mut text = String::new();
    let mut units = Vec::new();

    for document in documents {
        if units.len() >= max_files {
            break;
        }
        let source = match document.file_summary.as_ref().and_then(SummaryContent::text) {
            Some(summary) => summary.to_string(),
            None => match file_summary_chunk(document) {
                Some(chunk) => chunk.text,
                None => continue,
            },
        };
        text.push_str("### ");
        text.push_str(&document.file_path);
        text.push('\n');
        text.push_str(&excerpt(source.trim(), excerpt_chars));
        text.push_str("\n\n");
        units.push(SourceUnit {
            file_path: document.file_path.clone(),
            language: document.language,
            start_offset: 0,
            end_offset: 0,
            kind: UnitKind::File,
            name: Some(document.file_path.clone()),
        });
    }
    if units.is_empty() {
        return None;
    }

    Some(Chunk {
        id: ChunkId::new(PROJECT_PATH, 0),
        file_path: PROJECT_PATH.to_string(),
        units,
        size_estimate: text.len(),
        text,
        oversized: false,
    })
}

/// First `max_chars` characters, marked when cut
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::DocumentNode;
    use codedoc_cache::ErrorKind;
    use codedoc_chunker::Language;
    use pretty_assertions::assert_eq;

    fn node(name: &str, chunk: usize, text: Option<&str>) -> DocumentNode {
        let chunk_id = ChunkId::new("m.rs", chunk);
        DocumentNode {
            source_unit: SourceUnit {
                file_path: "m.rs".into(),
                language: Language::Rust,
                start_offset: 0,
                end_offset: 1,
                kind: UnitKind::Function,
                name: Some(name.into()),
            },
            content: match text {
                Some(text) => NodeContent::Explanation {
                    text: text.into(),
                    chunk_id,
                    shared_with: 1,
                },
                None => NodeContent::Failed {
                    error_kind: Some(ErrorKind::Timeout),
                    chunk_id,
                },
            },
        }
    }

    fn document(path: &str, nodes: Vec<DocumentNode>) -> FileDocument {
        FileDocument {
            file_path: path.into(),
            language: Language::Rust,
            nodes,
            file_summary: None,
        }
    }

    #[test]
    fn shared_explanations_appear_once() {
        let doc = document(
            "m.rs",
            vec![
                node("a", 0, Some("a and b")),
                node("b", 0, Some("a and b")),
                node("c", 1, None),
                node("d", 2, Some("just d\n")),
            ],
        );

        let chunk = file_summary_chunk(&doc).unwrap();

        assert_eq!(
            chunk.text,
            "## function a, function b\na and b\n\n## function d\njust d\n\n"
        );
        assert_eq!(chunk.units.len(), 3);
        assert_eq!(chunk.id, ChunkId::new("m.rs", 0));
        assert_eq!(chunk.language(), Language::Rust);
    }

    #[test]
    fn nothing_to_summarize_without_explanations() {
        let doc = document("m.rs", vec![node("a", 0, None), node("b", 1, Some("  \n"))]);
        assert!(file_summary_chunk(&doc).is_none());
        assert!(overview_chunk(&[doc], 20, 300).is_none());
    }

    #[test]
    fn overview_prefers_file_summaries_and_caps_files() {
        let mut first = document("a.rs", vec![node("a", 0, Some("unit text"))]);
        first.file_summary = Some(SummaryContent::Text {
            text: "whole-file summary".into(),
        });
        let second = document("b.rs", vec![node("b", 0, Some("ünïcödé text"))]);
        let third = document("c.rs", vec![node("c", 0, Some("never reached"))]);

        let chunk = overview_chunk(&[first, second, third], 2, 12).unwrap();

        assert_eq!(
            chunk.text,
            "### a.rs\nwhole-file s...\n\n### b.rs\n## function ...\n\n"
        );
        assert_eq!(chunk.unit_labels(), vec!["file a.rs", "file b.rs"]);
        assert_eq!(chunk.file_path, PROJECT_PATH);
    }

    #[test]
    fn excerpt_cuts_on_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé...");
        assert_eq!(excerpt("héllo", 5), "héllo");
        assert_eq!(excerpt("", 3), "");
    }
}
