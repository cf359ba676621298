use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous syntactic region of a source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceUnit {
    /// Source file path
    pub file_path: String,

    /// Language the unit was detected with
    pub language: Language,

    /// Byte offset of the first byte (inclusive)
    pub start_offset: usize,

    /// Byte offset one past the last byte (exclusive)
    pub end_offset: usize,

    /// What kind of region this is
    pub kind: UnitKind,

    /// Symbol name when one could be determined
    pub name: Option<String>,
}

impl SourceUnit {
    /// Length of the unit in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }

    /// Slice the unit out of the file text it was detected in
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start_offset..self.end_offset]
    }

    /// 1-indexed line range `(first, last)` of the unit within `source`
    #[must_use]
    pub fn line_range(&self, source: &str) -> (usize, usize) {
        let first = source[..self.start_offset].matches('\n').count() + 1;
        let body = self.text(source).trim_end_matches('\n');
        (first, first + body.matches('\n').count())
    }

    /// Human-readable label such as `function parse` or `block`
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {name}", self.kind.as_str()),
            None => self.kind.as_str().to_string(),
        }
    }
}

/// Type of a source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Function, method or closure bound at top level
    Function,
    /// Class-like declaration (class, struct, enum, trait, impl, interface, module)
    Class,
    /// Anything else: imports, statements, constants
    Block,
    /// The whole file (no structural rule applied)
    File,
}

impl UnitKind {
    /// Whether this kind represents a named declaration
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        matches!(self, Self::Function | Self::Class)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Block => "block",
            Self::File => "file",
        }
    }
}

/// Stable chunk identifier: `<file_path>#<ordinal>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    #[must_use]
    pub fn new(file_path: &str, ordinal: usize) -> Self {
        Self(format!("{file_path}#{ordinal}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contiguous group of units sized for one generation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier
    pub id: ChunkId,

    /// Source file path
    pub file_path: String,

    /// Units in source order
    pub units: Vec<SourceUnit>,

    /// Exact source text covered by the units
    pub text: String,

    /// Size measured with the configured metric
    pub size_estimate: usize,

    /// Single unit that exceeds the budget on its own
    pub oversized: bool,
}

impl Chunk {
    /// Language of the chunk (all units of a chunk share a file)
    #[must_use]
    pub fn language(&self) -> Language {
        self.units
            .first()
            .map_or(Language::Unknown, |unit| unit.language)
    }

    /// Byte offset where the chunk starts in its file
    #[must_use]
    pub fn start_offset(&self) -> usize {
        self.units.first().map_or(0, |unit| unit.start_offset)
    }

    /// Byte offset where the chunk ends in its file
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.units.last().map_or(0, |unit| unit.end_offset)
    }

    /// Labels of the contained units, in order
    #[must_use]
    pub fn unit_labels(&self) -> Vec<String> {
        self.units.iter().map(SourceUnit::label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(start: usize, end: usize, kind: UnitKind, name: Option<&str>) -> SourceUnit {
        SourceUnit {
            file_path: "test.rs".to_string(),
            language: Language::Rust,
            start_offset: start,
            end_offset: end,
            kind,
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_unit_text_and_lines() {
        let source = "use a;\n\nfn b() {\n}\n";
        let fn_unit = unit(7, source.len(), UnitKind::Function, Some("b"));
        assert_eq!(fn_unit.text(source), "\nfn b() {\n}\n");
        assert_eq!(fn_unit.line_range(source), (2, 4));
        assert_eq!(fn_unit.len(), 12);
    }

    #[test]
    fn test_unit_label() {
        assert_eq!(
            unit(0, 1, UnitKind::Function, Some("run")).label(),
            "function run"
        );
        assert_eq!(unit(0, 1, UnitKind::Block, None).label(), "block");
    }

    #[test]
    fn test_chunk_id_format() {
        let id = ChunkId::new("src/lib.rs", 3);
        assert_eq!(id.as_str(), "src/lib.rs#3");
        assert_eq!(id.to_string(), "src/lib.rs#3");
    }

    #[test]
    fn test_unit_kind_declaration() {
        assert!(UnitKind::Function.is_declaration());
        assert!(UnitKind::Class.is_declaration());
        assert!(!UnitKind::Block.is_declaration());
        assert!(!UnitKind::File.is_declaration());
    }
}
