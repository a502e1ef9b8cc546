//! TypeScript to JavaScript by type erasure.
//!
//! Edits are byte ranges removed from the source; nothing is reprinted, so
//! the output keeps the original formatting and line structure. Enums and
//! namespaces are left as written.

use std::path::Path;

use tree_sitter::Node;

use super::parser::{has_token, TypeScriptParser};
use crate::diagnostic::GeneratorError;

/// Strips type syntax from a module.
///
/// `id` names the module in errors. Sources that do not parse cleanly are
/// rejected rather than passed through half-stripped.
pub fn strip_types(source: &str, id: &str) -> Result<String, GeneratorError> {
    let mut parser = TypeScriptParser::new()?;
    strip_types_with(&mut parser, source, id)
}

/// Same as [`strip_types`], reusing an existing parser.
pub fn strip_types_with(parser: &mut TypeScriptParser, source: &str, id: &str) -> Result<String, GeneratorError> {
    let tree = parser.parse(source, Path::new(id))?;
    let root = tree.root_node();

    if root.has_error() {
        let (row, column) = first_error(root)
            .map(|n| (n.start_position().row, n.start_position().column))
            .unwrap_or((0, 0));
        return Err(GeneratorError::TransformFailed {
            id: id.to_string(),
            message: format!("syntax error at {}:{}", row + 1, column + 1),
        });
    }

    let mut stripper = Stripper::new(source);
    stripper.visit(root);
    Ok(stripper.apply())
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

struct Stripper<'a> {
    source: &'a str,
    removals: Vec<(usize, usize)>,
}

impl<'a> Stripper<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            removals: Vec::new(),
        }
    }

    fn remove(&mut self, node: Node) {
        self.removals.push((node.start_byte(), node.end_byte()));
    }

    /// Removes a keyword together with the whitespace that follows it.
    fn remove_token(&mut self, node: Node) {
        let end = node.next_sibling().map(|n| n.start_byte()).unwrap_or(node.end_byte());
        self.removals.push((node.start_byte(), end));
    }

    /// Removes a list element and the comma separating it from a neighbour.
    fn remove_list_item(&mut self, node: Node) {
        match node.next_sibling() {
            Some(next) if next.kind() == "," => {
                let end = next.next_sibling().map(|n| n.start_byte()).unwrap_or(next.end_byte());
                self.removals.push((node.start_byte(), end));
            }
            _ => match node.prev_sibling() {
                Some(prev) if prev.kind() == "," => {
                    self.removals.push((prev.start_byte(), node.end_byte()));
                }
                _ => self.remove(node),
            },
        }
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "interface_declaration"
            | "type_alias_declaration"
            | "ambient_declaration"
            | "function_signature"
            | "abstract_method_signature"
            | "method_signature"
            | "index_signature"
            | "type_annotation"
            | "type_parameters"
            | "type_arguments"
            | "implements_clause" => {
                self.remove(node);
                return;
            }
            "accessibility_modifier" | "override_modifier" => {
                self.remove_token(node);
                return;
            }
            "export_statement" if self.is_type_only_export(node) => {
                self.remove(node);
                return;
            }
            "import_statement" => {
                if self.visit_import(node) {
                    return;
                }
            }
            "export_specifier" if has_token(node, "type") => {
                self.remove_list_item(node);
                return;
            }
            "as_expression" | "satisfies_expression" => {
                if let Some(expression) = node.named_child(0) {
                    self.removals.push((expression.end_byte(), node.end_byte()));
                    self.visit(expression);
                }
                return;
            }
            "non_null_expression" => {
                if let Some(bang) = node.child(node.child_count().saturating_sub(1)) {
                    if bang.kind() == "!" {
                        self.remove(bang);
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            if !child.is_named() {
                self.visit_token(node, child);
                continue;
            }
            self.visit(child);
        }
    }

    fn visit_token(&mut self, parent: Node, token: Node) {
        match (parent.kind(), token.kind()) {
            ("optional_parameter" | "public_field_definition" | "method_definition", "?") => self.remove(token),
            (_, "readonly") | (_, "declare") | ("abstract_class_declaration", "abstract") => {
                self.remove_token(token)
            }
            ("public_field_definition" | "method_definition", "abstract") => self.remove_token(token),
            _ => {}
        }
    }

    /// `export type { A }`, `export interface A {}`, `export declare ...`
    /// and overload signatures vanish entirely.
    fn is_type_only_export(&self, node: Node) -> bool {
        if has_token(node, "type") {
            return true;
        }
        node.child_by_field_name("declaration").is_some_and(|declaration| {
            matches!(
                declaration.kind(),
                "interface_declaration" | "type_alias_declaration" | "ambient_declaration" | "function_signature"
            )
        })
    }

    /// Returns true when the whole statement was removed.
    fn visit_import(&mut self, node: Node) -> bool {
        if has_token(node, "type") {
            self.remove(node);
            return true;
        }

        let mut cursor = node.walk();
        let Some(clause) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "import_clause")
        else {
            return false;
        };

        let mut kept_bindings = 0;
        let mut type_specifiers = Vec::new();

        let mut clause_cursor = clause.walk();
        for named in clause.named_children(&mut clause_cursor) {
            match named.kind() {
                "named_imports" => {
                    let mut spec_cursor = named.walk();
                    for spec in named.named_children(&mut spec_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        if has_token(spec, "type") {
                            type_specifiers.push(spec);
                        } else {
                            kept_bindings += 1;
                        }
                    }
                }
                _ => kept_bindings += 1,
            }
        }

        if type_specifiers.is_empty() {
            return false;
        }

        if kept_bindings == 0 {
            self.remove(node);
            return true;
        }

        for spec in type_specifiers {
            self.remove_list_item(spec);
        }
        true
    }

    fn apply(mut self) -> String {
        self.removals.sort_by_key(|&(start, end)| (start, std::cmp::Reverse(end)));

        let mut output = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (start, end) in self.removals {
            if end <= cursor {
                continue;
            }
            let start = start.max(cursor);
            output.push_str(&self.source[cursor..start]);
            cursor = end;
        }
        output.push_str(&self.source[cursor..]);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(source: &str) -> String {
        strip_types(source, "crud:products/assets").unwrap()
    }

    #[test]
    fn test_strip_annotations() {
        let out = strip("const a: number = 1;\nfunction f(x: string, y?: number): boolean { return true; }");
        assert_eq!(out, "const a = 1;\nfunction f(x, y) { return true; }");
    }

    #[test]
    fn test_strip_declarations() {
        let out = strip("export type ItemT = { id: number };\ninterface Env {}\nexport const x = 1;");
        assert_eq!(out, "\n\nexport const x = 1;");
    }

    #[test]
    fn test_strip_type_imports() {
        let out = strip(
            "import type { A } from \"a\";\nimport { type B, c } from \"b\";\nimport { type D } from \"d\";\nimport e from \"e\";",
        );
        assert_eq!(out, "\nimport { c } from \"b\";\n\nimport e from \"e\";");
    }

    #[test]
    fn test_strip_expressions() {
        let out = strip("const s = useStore<ItemT>();\nconst v = (x as string).trim();\nconst n = maybe!.value;");
        assert_eq!(out, "const s = useStore();\nconst v = (x).trim();\nconst n = maybe.value;");
    }

    #[test]
    fn test_strip_class_members() {
        let out = strip("class A<T> implements B {\n  private readonly x: number = 1;\n  value(): T { return this.x as T; }\n}");
        assert_eq!(out, "class A  {\n  x = 1;\n  value() { return this.x; }\n}");
    }

    #[test]
    fn test_untyped_module_unchanged() {
        let source = "import { ref } from \"vue\";\nexport const a = ref(1);\n";
        assert_eq!(strip(source), source);
    }

    #[test]
    fn test_syntax_error_rejected() {
        let err = strip_types("const = ;", "crud:products/api").unwrap_err();
        assert!(matches!(err, GeneratorError::TransformFailed { .. }));
    }
}
