//! Lightweight declaration recognition for unit kinds and names.

use crate::language::Language;
use crate::types::UnitKind;
use once_cell::sync::Lazy;
use regex::Regex;

const MODIFIERS: &str = r#"(?:(?:pub(?:\([^)]*\))?|export|default|declare|async|static|public|private|protected|internal|open|override|final|abstract|sealed|data|inline|extern(?:\s+"[^"]*")?|unsafe|const|suspend|fileprivate|partial|virtual)\s+)*"#;

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{MODIFIERS}(?:(?:fn|def|func|fun)\s+|function\s*\*?\s*)(?:self\.)?(?:\([^)]*\)\s*)?(?:<[^>]*>\s*)?([A-Za-z_$][\w$?!]*)"
    ))
    .unwrap_or_else(|err| unreachable!("invalid function pattern: {err}"))
});

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{MODIFIERS}(?:enum\s+class|class|struct|enum|trait|interface|protocol|module|mod|object|union|record|extension|namespace)\s+([A-Za-z_$][\w$]*)"
    ))
    .unwrap_or_else(|err| unreachable!("invalid class pattern: {err}"))
});

static IMPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?:[^{]*?\s+for\s+)?([A-Za-z_]\w*)")
        .unwrap_or_else(|err| unreachable!("invalid impl pattern: {err}"))
});

static GO_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^type\s+([A-Za-z_]\w*)\s+(?:struct|interface)\b")
        .unwrap_or_else(|err| unreachable!("invalid type pattern: {err}"))
});

static JS_BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
    )
    .unwrap_or_else(|err| unreachable!("invalid binding pattern: {err}"))
});

static C_FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][\w:<>,\*&\[\]]*\s+)+[\*&]*([A-Za-z_~][\w:~]*)\s*\([^;]*$")
        .unwrap_or_else(|err| unreachable!("invalid c function pattern: {err}"))
});

const C_FUNCTION_NOT_NAMES: &[&str] = &["if", "while", "for", "switch", "return", "sizeof", "catch"];

/// Determine kind and name of a unit from its text.
///
/// Only zero-indent lines are considered so nested declarations never name
/// their enclosing unit.
pub(crate) fn classify(text: &str, language: Language) -> (UnitKind, Option<String>) {
    for line in text.lines() {
        if line.is_empty() || line.starts_with([' ', '\t']) {
            continue;
        }
        let line = line.trim_end();
        if is_comment_line(line, language) || is_annotation_line(line, language) {
            continue;
        }
        if let Some(found) = match_declaration(line, language) {
            return found;
        }
    }
    (UnitKind::Block, None)
}

fn match_declaration(line: &str, language: Language) -> Option<(UnitKind, Option<String>)> {
    let capture = |re: &Regex| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    if language == Language::Rust {
        if let Some(name) = capture(&IMPL_RE) {
            return Some((UnitKind::Class, Some(name)));
        }
    }
    if matches!(language, Language::JavaScript | Language::TypeScript) {
        if let Some(name) = capture(&JS_BINDING_RE) {
            return Some((UnitKind::Function, Some(name)));
        }
    }
    if let Some(name) = capture(&FUNCTION_RE) {
        return Some((UnitKind::Function, Some(name)));
    }
    if let Some(name) = capture(&CLASS_RE) {
        return Some((UnitKind::Class, Some(name)));
    }
    if language == Language::Go {
        if let Some(name) = capture(&GO_TYPE_RE) {
            return Some((UnitKind::Class, Some(name)));
        }
    }
    if matches!(
        language,
        Language::C | Language::Cpp | Language::Java | Language::CSharp
    ) {
        if let Some(name) = capture(&C_FUNCTION_RE) {
            if !C_FUNCTION_NOT_NAMES.contains(&name.as_str()) {
                return Some((UnitKind::Function, Some(name)));
            }
        }
    }
    None
}

fn is_comment_line(trimmed: &str, language: Language) -> bool {
    if trimmed.starts_with("/*") || trimmed.starts_with('*') || trimmed.starts_with("*/") {
        return language.line_comment() == Some("//");
    }
    language
        .line_comment()
        .is_some_and(|prefix| trimmed.starts_with(prefix))
}

fn is_annotation_line(trimmed: &str, language: Language) -> bool {
    match language {
        Language::Rust => trimmed.starts_with("#[") || trimmed.starts_with("#!["),
        Language::C | Language::Cpp | Language::CSharp => trimmed.starts_with('#'),
        _ => trimmed.starts_with('@'),
    }
}

/// Whether the text carries no code at all (only blanks and comments)
pub(crate) fn is_trivia(text: &str, language: Language) -> bool {
    let mut in_block_comment = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if language.line_comment() == Some("//") && trimmed.starts_with("/*") {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        if is_comment_line(trimmed, language) {
            continue;
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(kind: UnitKind, name: &str) -> (UnitKind, Option<String>) {
        (kind, Some(name.to_string()))
    }

    #[test]
    fn classifies_rust_items() {
        assert_eq!(
            classify("/// docs\n#[inline]\npub(crate) async fn load() {}\n", Language::Rust),
            named(UnitKind::Function, "load")
        );
        assert_eq!(
            classify("impl<T> Display for Wrapper<T> {\n}\n", Language::Rust),
            named(UnitKind::Class, "Wrapper")
        );
        assert_eq!(
            classify("pub struct Point {\n    fn_ptr: fn(),\n}\n", Language::Rust),
            named(UnitKind::Class, "Point")
        );
        assert_eq!(
            classify("use std::io;\nconst MAX: usize = 3;\n", Language::Rust),
            (UnitKind::Block, None)
        );
    }

    #[test]
    fn classifies_python_and_ruby() {
        assert_eq!(
            classify("@cache\nasync def fetch(url):\n    pass\n", Language::Python),
            named(UnitKind::Function, "fetch")
        );
        assert_eq!(
            classify("class Parser:\n    def parse(self):\n        pass\n", Language::Python),
            named(UnitKind::Class, "Parser")
        );
        assert_eq!(
            classify("def self.build\nend\n", Language::Ruby),
            named(UnitKind::Function, "build")
        );
    }

    #[test]
    fn classifies_js_and_go() {
        assert_eq!(
            classify("export const handler = async (req) => {\n};\n", Language::JavaScript),
            named(UnitKind::Function, "handler")
        );
        assert_eq!(
            classify("export default class Store {\n}\n", Language::TypeScript),
            named(UnitKind::Class, "Store")
        );
        assert_eq!(
            classify("func (s *Server) Serve() error {\n}\n", Language::Go),
            named(UnitKind::Function, "Serve")
        );
        assert_eq!(
            classify("type Config struct {\n}\n", Language::Go),
            named(UnitKind::Class, "Config")
        );
    }

    #[test]
    fn classifies_c_family_functions() {
        assert_eq!(
            classify("#include <stdio.h>\nstatic int main(int argc, char **argv) {\n}\n", Language::C),
            named(UnitKind::Function, "main")
        );
        assert_eq!(
            classify("int prototype(void);\n", Language::C),
            (UnitKind::Block, None)
        );
    }

    #[test]
    fn trivia_detection() {
        assert!(is_trivia("\n// trailing\n/* block\n still */\n", Language::Rust));
        assert!(is_trivia("# comment\n\n", Language::Python));
        assert!(!is_trivia("// c\nlet x = 1;\n", Language::JavaScript));
        assert!(!is_trivia("x = 1\n", Language::Python));
    }
}
