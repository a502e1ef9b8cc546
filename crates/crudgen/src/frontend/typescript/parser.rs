//! TypeScript parser using tree-sitter.

use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

use crate::diagnostic::GeneratorError;

/// TypeScript parser.
pub struct TypeScriptParser {
    parser: Parser,
}

impl TypeScriptParser {
    /// Creates a new TypeScript parser.
    pub fn new() -> Result<Self, GeneratorError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|_| GeneratorError::ParserInitFailed)?;
        Ok(Self { parser })
    }

    /// Parses TypeScript source. `path` is only used for diagnostics.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree, GeneratorError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| GeneratorError::ParseFailed { path: path.to_path_buf() })
    }
}

/// Source text covered by `node`.
pub(crate) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Contents of a string literal node, without quotes.
pub(crate) fn string_value(node: Node, source: &str) -> String {
    let text = node_text(node, source);
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

/// Whether `node` has an anonymous child token of the given kind,
/// e.g. the `type` keyword in `import type { A } from "a"`.
pub(crate) fn has_token(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == kind);
    found
}

/// First named child, skipping comments.
pub(crate) fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    found
}

/// Calls `f` on `node` and every descendant, in document order.
pub(crate) fn walk_descendants<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_descendants(child, f);
    }
}
