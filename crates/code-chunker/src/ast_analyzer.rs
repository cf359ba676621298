use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::UnitKind;
use tree_sitter::{Node, Parser};

/// Start of a unit found on the syntax tree, with its kind and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AstBoundary {
    pub start: usize,
    pub kind: UnitKind,
    pub name: Option<String>,
}

/// Tree-sitter based detector for top-level declarations
pub(crate) struct AstAnalyzer {
    parser: Parser,
    language: Language,
}

impl AstAnalyzer {
    /// Create new AST analyzer for a language
    pub fn new(language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::NoGrammar(language));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::SyntaxTree(format!("grammar rejected by parser: {e}")))?;

        Ok(Self { parser, language })
    }

    /// Parse the file and return unit starts, first one always at offset 0.
    ///
    /// Trees with syntax errors are rejected so the caller can use the
    /// structural scan instead of trusting a recovered parse.
    pub fn boundaries(&mut self, content: &str) -> Result<Vec<AstBoundary>> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::SyntaxTree("parser returned no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ChunkerError::SyntaxTree("tree contains errors".to_string()));
        }

        let mut cursor = root.walk();
        let children: Vec<_> = root.named_children(&mut cursor).collect();

        let mut out: Vec<AstBoundary> = Vec::new();
        let mut prev_end = 0usize;
        let mut prev_end_row: Option<usize> = None;
        let mut pending: Option<usize> = None;

        for child in children {
            if self.is_trivia_kind(child.kind()) {
                // A comment trailing the previous item on its last line stays with it.
                let trails_previous = prev_end_row == Some(child.start_position().row);
                if !trails_previous {
                    pending.get_or_insert(child.start_byte());
                }
                continue;
            }

            let anchor = pending.take().unwrap_or_else(|| child.start_byte());
            let start = line_start(content, anchor);
            let (kind, name) = self.classify(content, child);

            if out.is_empty() {
                out.push(AstBoundary {
                    start: 0,
                    kind,
                    name,
                });
            } else if start >= prev_end && out.last().is_some_and(|last| start > last.start) {
                out.push(AstBoundary { start, kind, name });
            } else if let Some(last) = out.last_mut() {
                // Shares a line with the previous item: keep them in one unit.
                if !last.kind.is_declaration() && kind.is_declaration() {
                    last.kind = kind;
                    last.name = name;
                }
            }

            prev_end = child.end_byte();
            prev_end_row = Some(child.end_position().row);
        }

        Ok(out)
    }

    fn is_trivia_kind(&self, kind: &str) -> bool {
        match self.language {
            Language::Rust => matches!(
                kind,
                "line_comment" | "block_comment" | "attribute_item" | "inner_attribute_item"
            ),
            _ => kind == "comment",
        }
    }

    fn classify(&self, content: &str, node: Node) -> (UnitKind, Option<String>) {
        match self.language {
            Language::Rust => Self::classify_rust(content, node),
            Language::Python => Self::classify_python(content, node),
            Language::JavaScript | Language::TypeScript => Self::classify_js(content, node),
            _ => (UnitKind::Block, None),
        }
    }

    fn classify_rust(content: &str, node: Node) -> (UnitKind, Option<String>) {
        match node.kind() {
            "function_item" | "function_signature_item" | "macro_definition" => {
                (UnitKind::Function, field_text(content, node, "name"))
            }
            "impl_item" => (UnitKind::Class, Self::extract_impl_target(content, node)),
            "struct_item" | "enum_item" | "union_item" | "trait_item" | "mod_item" => {
                (UnitKind::Class, field_text(content, node, "name"))
            }
            _ => (UnitKind::Block, None),
        }
    }

    /// Extract the target of an impl block (struct/trait name)
    fn extract_impl_target(content: &str, impl_node: Node) -> Option<String> {
        let target = impl_node.child_by_field_name("type")?;
        match target.kind() {
            "type_identifier" => node_text(content, target),
            // Generic or qualified type: take the last plain identifier
            _ => {
                let mut cursor = target.walk();
                let found = target
                    .children(&mut cursor)
                    .filter(|child| child.kind() == "type_identifier")
                    .last();
                found.and_then(|child| node_text(content, child))
            }
        }
    }

    fn classify_python(content: &str, node: Node) -> (UnitKind, Option<String>) {
        match node.kind() {
            "function_definition" => (UnitKind::Function, field_text(content, node, "name")),
            "class_definition" => (UnitKind::Class, field_text(content, node, "name")),
            "decorated_definition" => node
                .child_by_field_name("definition")
                .map_or((UnitKind::Block, None), |def| {
                    Self::classify_python(content, def)
                }),
            _ => (UnitKind::Block, None),
        }
    }

    fn classify_js(content: &str, node: Node) -> (UnitKind, Option<String>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                (UnitKind::Function, field_text(content, node, "name"))
            }
            "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "module"
            | "internal_module" => (UnitKind::Class, field_text(content, node, "name")),
            "export_statement" => node
                .child_by_field_name("declaration")
                .map_or((UnitKind::Block, None), |decl| Self::classify_js(content, decl)),
            "lexical_declaration" | "variable_declaration" => {
                Self::classify_js_binding(content, node)
            }
            _ => (UnitKind::Block, None),
        }
    }

    /// `const handler = () => {}` and friends
    fn classify_js_binding(content: &str, node: Node) -> (UnitKind, Option<String>) {
        let mut cursor = node.walk();
        let declarator = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "variable_declarator");
        let Some(declarator) = declarator else {
            return (UnitKind::Block, None);
        };
        let kind = match declarator.child_by_field_name("value").map(|v| v.kind()) {
            Some("arrow_function" | "function_expression" | "function" | "generator_function") => {
                UnitKind::Function
            }
            Some("class") => UnitKind::Class,
            _ => return (UnitKind::Block, None),
        };
        (kind, field_text(content, declarator, "name"))
    }
}

fn field_text(content: &str, node: Node, field: &str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(content, child))
}

fn node_text(content: &str, node: Node) -> Option<String> {
    content
        .get(node.start_byte()..node.end_byte())
        .map(str::to_string)
}

fn line_start(content: &str, offset: usize) -> usize {
    content[..offset].rfind('\n').map_or(0, |idx| idx + 1)
}
