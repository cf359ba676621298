//! Structural boundary scan used when no syntax tree is available.
//!
//! The scan only ever places boundaries at line starts, so every offset it
//! returns is a valid UTF-8 char boundary. When the scan loses track of the
//! structure it stops placing boundaries; whatever follows the last safe
//! boundary stays in a single segment.

use crate::language::{Language, SyntaxFamily};

/// Segment starts found by a scan (always begins with `0`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanOutcome {
    pub starts: Vec<usize>,
    pub ambiguous: bool,
}

impl ScanOutcome {
    fn whole() -> Self {
        Self {
            starts: vec![0],
            ambiguous: false,
        }
    }
}

pub(crate) fn scan(text: &str, language: Language) -> ScanOutcome {
    match language.syntax_family() {
        SyntaxFamily::Braces => scan_braces(text, language),
        SyntaxFamily::Indentation => scan_indentation(text),
        SyntaxFamily::KeywordEnd => scan_keyword_end(text),
        SyntaxFamily::Opaque => ScanOutcome::whole(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    LineComment,
    BlockComment,
    Str(u8),
}

enum RawString {
    NotRaw,
    End(usize),
    Unterminated,
}

fn scan_braces(text: &str, language: Language) -> ScanOutcome {
    let bytes = text.as_bytes();
    let mut starts = vec![0];
    let mut state = Lex::Code;
    let mut braces: i64 = 0;
    let mut parens: i64 = 0;
    let mut terminated = false;
    let mut ambiguous = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'\n' {
            if state == Lex::LineComment {
                state = Lex::Code;
            }
            if state == Lex::Code && braces == 0 && parens == 0 && terminated {
                if i + 1 < bytes.len() {
                    starts.push(i + 1);
                }
                terminated = false;
            }
            i += 1;
            continue;
        }

        match state {
            Lex::LineComment => i += 1,
            Lex::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = Lex::Code;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            Lex::Str(quote) => {
                if b == b'\\' && quote != b'`' {
                    i += 2;
                } else {
                    if b == quote {
                        state = Lex::Code;
                    }
                    i += 1;
                }
            }
            Lex::Code => {
                if language == Language::Rust && b == b'r' && !prev_is_ident(bytes, i) {
                    match rust_raw_string(bytes, i) {
                        RawString::End(next) => {
                            i = next;
                            continue;
                        }
                        RawString::Unterminated => {
                            ambiguous = true;
                            break;
                        }
                        RawString::NotRaw => {}
                    }
                }

                match b {
                    b'/' if bytes.get(i + 1) == Some(&b'/') => {
                        state = Lex::LineComment;
                        i += 2;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        state = Lex::BlockComment;
                        i += 2;
                    }
                    b'"' => {
                        state = Lex::Str(b'"');
                        i += 1;
                    }
                    b'`' if language.backtick_is_string() => {
                        state = Lex::Str(b'`');
                        i += 1;
                    }
                    b'\'' if language.single_quote_is_string() => {
                        state = Lex::Str(b'\'');
                        i += 1;
                    }
                    b'\'' => i = skip_char_literal(text, i),
                    b'{' => {
                        braces += 1;
                        i += 1;
                    }
                    b'}' => {
                        braces -= 1;
                        if braces < 0 {
                            ambiguous = true;
                            break;
                        }
                        if braces == 0 && parens == 0 {
                            terminated = true;
                        }
                        i += 1;
                    }
                    b'(' | b'[' => {
                        parens += 1;
                        i += 1;
                    }
                    b')' | b']' => {
                        parens -= 1;
                        if parens < 0 {
                            ambiguous = true;
                            break;
                        }
                        i += 1;
                    }
                    b';' => {
                        if braces == 0 && parens == 0 {
                            terminated = true;
                        }
                        i += 1;
                    }
                    _ => i += 1,
                }
            }
        }
    }

    if !matches!(state, Lex::Code | Lex::LineComment) || braces != 0 || parens != 0 {
        ambiguous = true;
    }

    ScanOutcome { starts, ambiguous }
}

fn prev_is_ident(bytes: &[u8], i: usize) -> bool {
    i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_')
}

/// `r"..."`, `r#"..."#`, `br"..."` (the `b` is consumed as plain code)
fn rust_raw_string(bytes: &[u8], i: usize) -> RawString {
    let mut j = i + 1;
    let mut hashes = 0;
    while bytes.get(j) == Some(&b'#') {
        hashes += 1;
        j += 1;
    }
    if bytes.get(j) != Some(&b'"') {
        return RawString::NotRaw;
    }
    j += 1;
    while j < bytes.len() {
        if bytes[j] == b'"' {
            let closing = &bytes[j + 1..];
            if closing.len() >= hashes && closing[..hashes].iter().all(|&c| c == b'#') {
                return RawString::End(j + 1 + hashes);
            }
        }
        j += 1;
    }
    RawString::Unterminated
}

/// Skip `'x'` / `'\n'` char literals; a lone quote (Rust lifetime, label) is
/// consumed as a single byte.
fn skip_char_literal(text: &str, i: usize) -> usize {
    let bytes = text.as_bytes();
    if bytes.get(i + 1) == Some(&b'\\') {
        let limit = (i + 12).min(bytes.len());
        for j in (i + 2)..limit {
            if bytes[j] == b'\'' {
                return j + 1;
            }
            if bytes[j] == b'\n' {
                break;
            }
        }
        return i + 1;
    }
    if let Some(ch) = text[i + 1..].chars().next() {
        let after = i + 1 + ch.len_utf8();
        if ch != '\'' && ch != '\n' && bytes.get(after) == Some(&b'\'') {
            return after + 1;
        }
    }
    i + 1
}

/// Iterate `(line_start_offset, line_without_newline)`
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        (start, raw.trim_end_matches(['\n', '\r']))
    })
}

fn push_start(starts: &mut Vec<usize>, start: usize) {
    if starts.last().is_some_and(|&last| start > last) {
        starts.push(start);
    }
}

const PY_CONTINUATIONS: &[&str] = &["else", "elif", "except", "finally"];

fn scan_indentation(text: &str) -> ScanOutcome {
    let mut starts = vec![0];
    let mut triple: Option<&'static str> = None;
    let mut depth: i64 = 0;
    let mut continuation = false;
    let mut after_decorator = false;
    let mut comment_run: Option<usize> = None;
    let mut frozen = false;

    for (line_start, line) in lines_with_offsets(text) {
        let trimmed = line.trim();
        let at_top = triple.is_none() && depth == 0 && !continuation;
        let zero_indent = !line.starts_with([' ', '\t']);

        if at_top && !frozen {
            if trimmed.is_empty() {
                comment_run = None;
            } else if trimmed.starts_with('#') {
                if zero_indent {
                    comment_run.get_or_insert(line_start);
                }
                continue;
            } else if zero_indent && !is_python_continuation(trimmed) {
                if !after_decorator {
                    push_start(&mut starts, comment_run.unwrap_or(line_start));
                }
                after_decorator = trimmed.starts_with('@');
                comment_run = None;
            } else {
                comment_run = None;
            }
        }

        match lex_python_line(line, triple, depth) {
            Some((next_triple, next_depth, ends_with_backslash)) => {
                triple = next_triple;
                depth = next_depth;
                continuation = ends_with_backslash;
            }
            None => {
                frozen = true;
                depth = 0;
                triple = None;
                continuation = false;
            }
        }
    }

    let ambiguous = frozen || triple.is_some() || depth != 0;
    ScanOutcome { starts, ambiguous }
}

fn is_python_continuation(trimmed: &str) -> bool {
    if trimmed.starts_with([')', ']', '}']) {
        return true;
    }
    PY_CONTINUATIONS.iter().any(|kw| {
        trimmed
            .strip_prefix(kw)
            .is_some_and(|rest| rest.starts_with([':', ' ', '(']))
    })
}

/// Returns the lexer state after the line, or `None` when brackets go negative.
fn lex_python_line(
    line: &str,
    mut triple: Option<&'static str>,
    mut depth: i64,
) -> Option<(Option<&'static str>, i64, bool)> {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut code_end = bytes.len();

    while i < bytes.len() {
        if let Some(delim) = triple {
            if bytes[i..].starts_with(delim.as_bytes()) {
                triple = None;
                i += 3;
            } else if bytes[i] == b'\\' {
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        match bytes[i] {
            b'#' => {
                code_end = i;
                break;
            }
            b'"' | b'\'' => {
                let quote = bytes[i];
                if bytes[i..].starts_with(b"\"\"\"") {
                    triple = Some("\"\"\"");
                    i += 3;
                } else if bytes[i..].starts_with(b"'''") {
                    triple = Some("'''");
                    i += 3;
                } else {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    let ends_with_backslash =
        triple.is_none() && line[..code_end.min(line.len())].trim_end().ends_with('\\');
    Some((triple, depth, ends_with_backslash))
}

fn scan_keyword_end(text: &str) -> ScanOutcome {
    let mut starts = vec![0];
    let mut open = false;
    let mut in_doc = false;
    let mut comment_run: Option<usize> = None;

    for (line_start, line) in lines_with_offsets(text) {
        if in_doc {
            if line.starts_with("=end") {
                in_doc = false;
            }
            continue;
        }
        if line.starts_with("=begin") {
            in_doc = true;
            if !open {
                comment_run.get_or_insert(line_start);
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            comment_run = None;
            continue;
        }
        let zero_indent = !line.starts_with([' ', '\t']);
        if trimmed.starts_with('#') {
            if !open && zero_indent {
                comment_run.get_or_insert(line_start);
            }
            continue;
        }

        if zero_indent {
            if open {
                if first_word(trimmed) == "end" {
                    open = false;
                }
            } else {
                push_start(&mut starts, comment_run.unwrap_or(line_start));
                open = ruby_opens_block(trimmed);
            }
        }
        comment_run = None;
    }

    ScanOutcome {
        starts,
        ambiguous: open || in_doc,
    }
}

fn first_word(line: &str) -> &str {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
}

fn ruby_opens_block(trimmed: &str) -> bool {
    let code = trimmed.split(" #").next().unwrap_or(trimmed).trim_end();
    if code.ends_with(" end") || code.ends_with(";end") || code.contains("; end") {
        return false;
    }
    matches!(
        first_word(code),
        "def" | "class" | "module" | "begin" | "if" | "unless" | "case" | "while" | "until"
    ) || code.ends_with(" do")
        || (code.contains(" do |") && code.ends_with('|'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segments<'a>(text: &'a str, outcome: &ScanOutcome) -> Vec<&'a str> {
        let mut out = Vec::new();
        for (idx, &start) in outcome.starts.iter().enumerate() {
            let end = outcome.starts.get(idx + 1).copied().unwrap_or(text.len());
            out.push(&text[start..end]);
        }
        out
    }

    #[test]
    fn braces_split_after_closing_lines() {
        let code = "use std::fmt;\n\nfn a() {\n    1\n}\n\nfn b() {\n    if x { y }\n}\n";
        let outcome = scan(code, Language::Rust);
        assert!(!outcome.ambiguous);
        assert_eq!(
            segments(code, &outcome),
            vec![
                "use std::fmt;\n",
                "\nfn a() {\n    1\n}\n",
                "\nfn b() {\n    if x { y }\n}\n",
            ]
        );
    }

    #[test]
    fn braces_ignore_strings_and_comments() {
        let code = "fn a() {\n    let s = \"}\";\n    // }\n    /* } */\n    let c = '}';\n}\nfn b() {}\n";
        let outcome = scan(code, Language::Rust);
        assert!(!outcome.ambiguous);
        assert_eq!(outcome.starts.len(), 2);
        assert!(segments(code, &outcome)[1].starts_with("fn b"));
    }

    #[test]
    fn braces_handle_rust_raw_strings_and_lifetimes() {
        let code = "fn a<'a>(x: &'a str) -> &'a str {\n    r#\"}\"#;\n    x\n}\nfn b() {}\n";
        let outcome = scan(code, Language::Rust);
        assert!(!outcome.ambiguous);
        assert_eq!(outcome.starts.len(), 2);
    }

    #[test]
    fn braces_unterminated_string_is_ambiguous() {
        let code = "fn a() {}\nfn b() {\n    let s = \"oops;\n}\nfn c() {}\n";
        let outcome = scan(code, Language::Rust);
        assert!(outcome.ambiguous);
        // everything after the last safe boundary stays together
        assert_eq!(segments(code, &outcome).len(), 2);
        assert!(segments(code, &outcome)[1].contains("fn c"));
    }

    #[test]
    fn braces_extra_closing_brace_stops_splitting() {
        let code = "int a() { return 1; }\n}\nint b() { return 2; }\n";
        let outcome = scan(code, Language::C);
        assert!(outcome.ambiguous);
        assert_eq!(outcome.starts, vec![0, 22]);
    }

    #[test]
    fn js_template_literal_spans_lines() {
        let code = "const t = `\n}\n`;\nfunction f() {}\n";
        let outcome = scan(code, Language::JavaScript);
        assert!(!outcome.ambiguous);
        assert_eq!(
            segments(code, &outcome),
            vec!["const t = `\n}\n`;\n", "function f() {}\n"]
        );
    }

    #[test]
    fn python_units_with_decorators_and_comments() {
        let code = "import os\n\n# helper\n@cache\ndef a():\n    return 1\n\nclass B:\n    def m(self):\n        pass\nelse_value = 3\n";
        let outcome = scan(code, Language::Python);
        assert!(!outcome.ambiguous);
        assert_eq!(
            segments(code, &outcome),
            vec![
                "import os\n\n",
                "# helper\n@cache\ndef a():\n    return 1\n\n",
                "class B:\n    def m(self):\n        pass\n",
                "else_value = 3\n",
            ]
        );
    }

    #[test]
    fn python_multiline_constructs_do_not_split() {
        let code = "x = [\n1,\n2,\n]\ns = \"\"\"\ndef not_a_function():\n\"\"\"\nif x:\n    pass\nelse:\n    pass\n";
        let outcome = scan(code, Language::Python);
        assert!(!outcome.ambiguous);
        assert_eq!(
            segments(code, &outcome),
            vec![
                "x = [\n1,\n2,\n]\n",
                "s = \"\"\"\ndef not_a_function():\n\"\"\"\n",
                "if x:\n    pass\nelse:\n    pass\n",
            ]
        );
    }

    #[test]
    fn python_unterminated_docstring_is_ambiguous() {
        let code = "def a():\n    pass\ns = \"\"\"\ndef b():\n    pass\n";
        let outcome = scan(code, Language::Python);
        assert!(outcome.ambiguous);
        assert_eq!(outcome.starts.len(), 2);
    }

    #[test]
    fn ruby_def_end_blocks() {
        let code = "require 'json'\n\n# Greets\nclass Greeter\n  def hi\n    puts 'hi'\n  end\nend\n\ndef top; end\n";
        let outcome = scan(code, Language::Ruby);
        assert!(!outcome.ambiguous);
        assert_eq!(
            segments(code, &outcome),
            vec![
                "require 'json'\n\n",
                "# Greets\nclass Greeter\n  def hi\n    puts 'hi'\n  end\nend\n\n",
                "def top; end\n",
            ]
        );
    }

    #[test]
    fn opaque_language_is_one_segment() {
        let outcome = scan("anything { at } all", Language::Unknown);
        assert_eq!(outcome, ScanOutcome::whole());
    }
}
