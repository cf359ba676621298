use crate::ast_analyzer::AstAnalyzer;
use crate::config::ChunkerConfig;
use crate::language::{Language, SyntaxFamily};
use crate::scanner;
use crate::symbols;
use crate::types::{SourceUnit, UnitKind};

/// Locates syntactic unit boundaries in a file.
///
/// Detection never fails: languages without a rule come back as one `File`
/// unit, and regions the scan cannot make sense of are kept whole.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryDetector {
    use_syntax_tree: bool,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self {
            use_syntax_tree: true,
        }
    }
}

struct Segment {
    start: usize,
    end: usize,
    hint: Option<(UnitKind, Option<String>)>,
}

impl BoundaryDetector {
    #[must_use]
    pub const fn new(use_syntax_tree: bool) -> Self {
        Self { use_syntax_tree }
    }

    #[must_use]
    pub const fn from_config(config: &ChunkerConfig) -> Self {
        Self::new(config.use_syntax_tree)
    }

    /// Split `text` into ordered, non-overlapping units that cover it entirely
    pub fn detect(&self, file_path: &str, text: &str, language: Language) -> Vec<SourceUnit> {
        let make = |start: usize, end: usize, kind: UnitKind, name: Option<String>| SourceUnit {
            file_path: file_path.to_string(),
            language,
            start_offset: start,
            end_offset: end,
            kind,
            name,
        };

        if text.is_empty() {
            return vec![make(0, 0, UnitKind::File, None)];
        }

        if language.syntax_family() == SyntaxFamily::Opaque {
            log::info!(
                "DetectionFallback: no boundary rule for {file_path} ({language}), using whole file"
            );
            return vec![make(0, text.len(), UnitKind::File, None)];
        }

        let segments = self.segments(file_path, text, language);

        let mut units: Vec<SourceUnit> = Vec::with_capacity(segments.len());
        let mut carried_start: Option<usize> = None;
        for segment in segments {
            let slice = &text[segment.start..segment.end];
            if symbols::is_trivia(slice, language) {
                match units.last_mut() {
                    Some(prev) => prev.end_offset = segment.end,
                    None => {
                        carried_start.get_or_insert(segment.start);
                    }
                }
                continue;
            }

            let (kind, name) = segment
                .hint
                .unwrap_or_else(|| symbols::classify(slice, language));
            let start = carried_start.take().unwrap_or(segment.start);
            units.push(make(start, segment.end, kind, name));
        }

        if units.is_empty() {
            return vec![make(0, text.len(), UnitKind::Block, None)];
        }

        coalesce_blocks(units)
    }

    fn segments(&self, file_path: &str, text: &str, language: Language) -> Vec<Segment> {
        if self.use_syntax_tree && language.supports_ast() {
            match AstAnalyzer::new(language).and_then(|mut analyzer| analyzer.boundaries(text)) {
                Ok(boundaries) if !boundaries.is_empty() => {
                    let ends: Vec<usize> = boundaries
                        .iter()
                        .skip(1)
                        .map(|b| b.start)
                        .chain(std::iter::once(text.len()))
                        .collect();
                    return boundaries
                        .into_iter()
                        .zip(ends)
                        .map(|(b, end)| Segment {
                            start: b.start,
                            end,
                            hint: Some((b.kind, b.name)),
                        })
                        .collect();
                }
                Ok(_) => {}
                Err(e) => {
                    log::debug!("syntax tree unusable for {file_path}, using structural scan: {e}");
                }
            }
        }

        let outcome = scanner::scan(text, language);
        if outcome.ambiguous {
            log::debug!(
                "ambiguous structure in {file_path}; keeping the region after offset {} whole",
                outcome.starts.last().copied().unwrap_or(0)
            );
        }

        let ends: Vec<usize> = outcome
            .starts
            .iter()
            .skip(1)
            .copied()
            .chain(std::iter::once(text.len()))
            .collect();
        outcome
            .starts
            .into_iter()
            .zip(ends)
            .map(|(start, end)| Segment {
                start,
                end,
                hint: None,
            })
            .collect()
    }
}

/// Merge runs of anonymous blocks (imports, statements) into one unit
fn coalesce_blocks(units: Vec<SourceUnit>) -> Vec<SourceUnit> {
    let mut out: Vec<SourceUnit> = Vec::with_capacity(units.len());
    for unit in units {
        if let Some(prev) = out.last_mut() {
            let anonymous_block = |u: &SourceUnit| u.kind == UnitKind::Block && u.name.is_none();
            if anonymous_block(prev) && anonymous_block(&unit) {
                prev.end_offset = unit.end_offset;
                continue;
            }
        }
        out.push(unit);
    }
    out
}

/// Detect units with the default detector
pub fn detect(file_path: &str, text: &str, language: Language) -> Vec<SourceUnit> {
    BoundaryDetector::default().detect(file_path, text, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(units: &[SourceUnit]) -> Vec<(UnitKind, Option<&str>)> {
        units.iter().map(|u| (u.kind, u.name.as_deref())).collect()
    }

    fn assert_covers(text: &str, units: &[SourceUnit]) {
        assert_eq!(units.first().map(|u| u.start_offset), Some(0));
        assert_eq!(units.last().map(|u| u.end_offset), Some(text.len()));
        for pair in units.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
    }

    #[test]
    fn unknown_language_falls_back_to_whole_file() {
        let text = "SELECT * FROM t;\nSELECT 1;\n";
        let units = detect("q.sql", text, Language::Unknown);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::File);
        assert_eq!(units[0].len(), text.len());
    }

    #[test]
    fn empty_text_is_single_empty_unit() {
        let units = detect("empty.rs", "", Language::Rust);
        assert_eq!(units.len(), 1);
        assert!(units[0].is_empty());
    }

    #[test]
    fn rust_units_via_syntax_tree() {
        let text = "use a;\nuse b;\n\nfn one() {}\n\nstruct Two;\n// trailing\n";
        let units = detect("lib.rs", text, Language::Rust);
        assert_covers(text, &units);
        assert_eq!(
            summary(&units),
            vec![
                (UnitKind::Block, None),
                (UnitKind::Function, Some("one")),
                (UnitKind::Class, Some("Two")),
            ]
        );
        assert!(units[2].text(text).ends_with("// trailing\n"));
    }

    #[test]
    fn rust_with_syntax_errors_uses_scanner() {
        let text = "fn ok() {}\nfn broken( {\n}\n";
        let units = detect("lib.rs", text, Language::Rust);
        assert_covers(text, &units);
        assert_eq!(units[0].name.as_deref(), Some("ok"));
    }

    #[test]
    fn scanner_path_matches_without_syntax_tree() {
        let text = "use a;\n\nfn one() {\n}\n\nfn two() {\n}\n";
        let units = BoundaryDetector::new(false).detect("lib.rs", text, Language::Rust);
        assert_covers(text, &units);
        assert_eq!(
            summary(&units),
            vec![
                (UnitKind::Block, None),
                (UnitKind::Function, Some("one")),
                (UnitKind::Function, Some("two")),
            ]
        );
    }

    #[test]
    fn go_units_via_scanner() {
        let text = "package main\n\nimport \"fmt\"\n\n// Hello greets.\nfunc Hello() {\n\tfmt.Println(\"}\")\n}\n\ntype Server struct {\n}\n";
        let units = detect("main.go", text, Language::Go);
        assert_covers(text, &units);
        let names: Vec<_> = units.iter().filter_map(|u| u.name.as_deref()).collect();
        assert_eq!(names, vec!["Hello", "Server"]);
    }

    #[test]
    fn leading_trivia_joins_first_unit() {
        let text = "// license header\n\nint main(void) {\n  return 0;\n}\n";
        let units = detect("main.c", text, Language::C);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].start_offset, 0);
        assert_eq!(units[0].name.as_deref(), Some("main"));
    }
}
