//! Response-type extraction from api handler files.
//!
//! An api file default-exports an array of handler calls:
//!
//! ```typescript
//! import type { Product } from "../types";
//!
//! interface Env { currency: string }
//!
//! async function env(): Promise<Env> { ... }
//!
//! export default [
//!   envHandler(env),
//!   listHandler({ assets(ctx): ListAssets { ... } }),
//!   retrieveHandler({ assets: (ctx): Promise<ItemAssets> => ... }),
//! ];
//! ```
//!
//! The extractor records the return types annotated on the `env`, `list`
//! and `retrieve` entry points, plus the file's own type declarations so
//! generated modules can refer to them.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tree_sitter::Node;

use super::parser::{first_named_child, has_token, node_text, string_value, walk_descendants, TypeScriptParser};
use crate::diagnostic::GeneratorError;
use crate::paths;

/// Where relative type imports of an api file are rewritten to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    /// Import root, e.g. `@`.
    pub root: String,
    /// Directory of the api file relative to the root, e.g. `api/crud/products`.
    pub base: String,
}

/// Return types found for each entry point. `None` means the entry point
/// is unused or carries no usable annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiTypes {
    #[serde(rename = "EnvT", skip_serializing_if = "Option::is_none")]
    pub env_t: Option<String>,

    #[serde(rename = "ListAssetsT", skip_serializing_if = "Option::is_none")]
    pub list_assets_t: Option<String>,

    #[serde(rename = "ItemAssetsT", skip_serializing_if = "Option::is_none")]
    pub item_assets_t: Option<String>,
}

/// Presence flags emitted into generated code for runtime checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApiTypesLiteral {
    #[serde(rename = "EnvT")]
    pub env_t: bool,
    #[serde(rename = "ListAssetsT")]
    pub list_assets_t: bool,
    #[serde(rename = "ItemAssetsT")]
    pub item_assets_t: bool,
}

impl ApiTypes {
    pub fn literal(&self) -> ApiTypesLiteral {
        ApiTypesLiteral {
            env_t: self.env_t.is_some(),
            list_assets_t: self.list_assets_t.is_some(),
            item_assets_t: self.item_assets_t.is_some(),
        }
    }
}

/// Everything extracted from one api file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTypes {
    /// Top-level interfaces and type aliases, then rewritten type-only imports.
    pub type_declarations: Vec<String>,

    #[serde(flatten)]
    pub api_types: ApiTypes,
}

/// Extracts types from api file source.
pub fn extract_types(source: &str, context: &ImportContext) -> Result<ExtractedTypes, GeneratorError> {
    let mut parser = TypeScriptParser::new()?;
    extract_types_with(&mut parser, Path::new(&context.base), source, context)
}

/// Same as [`extract_types`], reusing an existing parser.
pub fn extract_types_with(
    parser: &mut TypeScriptParser,
    path: &Path,
    source: &str,
    context: &ImportContext,
) -> Result<ExtractedTypes, GeneratorError> {
    let tree = parser.parse(source, path)?;
    let mut extractor = TypesExtractor::new(source, context);
    extractor.visit_program(tree.root_node());
    Ok(extractor.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryPoint {
    Env,
    List,
    Retrieve,
}

impl EntryPoint {
    /// The keyword occurring first in a callee, e.g. `listHandler` -> `List`.
    fn find(callee: &str) -> Option<Self> {
        [("env", Self::Env), ("list", Self::List), ("retrieve", Self::Retrieve)]
            .into_iter()
            .filter_map(|(keyword, entry)| callee.find(keyword).map(|idx| (idx, entry)))
            .min_by_key(|(idx, _)| *idx)
            .map(|(_, entry)| entry)
    }
}

struct TypesExtractor<'a> {
    source: &'a str,
    context: &'a ImportContext,
    declarations: Vec<String>,
    imports: Vec<String>,
    api_types: ApiTypes,
}

impl<'a> TypesExtractor<'a> {
    fn new(source: &'a str, context: &'a ImportContext) -> Self {
        Self {
            source,
            context,
            declarations: Vec::new(),
            imports: Vec::new(),
            api_types: ApiTypes::default(),
        }
    }

    fn finish(self) -> ExtractedTypes {
        let mut type_declarations = self.declarations;
        for import in self.imports {
            if !type_declarations.contains(&import) {
                type_declarations.push(import);
            }
        }

        ExtractedTypes {
            type_declarations,
            api_types: self.api_types,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(node, self.source)
    }

    fn visit_program(&mut self, root: Node) {
        let bindings = self.collect_bindings(root);

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.visit_import(child),
                "interface_declaration" | "type_alias_declaration" => {
                    self.add_declaration(child);
                }
                "export_statement" => self.visit_export(child, &bindings),
                _ => {}
            }
        }
    }

    /// Top-level functions and variable initializers by name, so that
    /// `envHandler(env)` can be followed to `function env()`.
    fn collect_bindings<'t>(&self, root: Node<'t>) -> HashMap<&'a str, Node<'t>> {
        let mut bindings = HashMap::new();

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let declaration = if child.kind() == "export_statement" {
                match child.child_by_field_name("declaration") {
                    Some(declaration) => declaration,
                    None => continue,
                }
            } else {
                child
            };

            match declaration.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = declaration.child_by_field_name("name") {
                        bindings.insert(self.text(name), declaration);
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = declaration.walk();
                    for declarator in declaration.named_children(&mut inner) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        if let (Some(name), Some(value)) = (
                            declarator.child_by_field_name("name"),
                            declarator.child_by_field_name("value"),
                        ) {
                            bindings.insert(self.text(name), value);
                        }
                    }
                }
                _ => {}
            }
        }

        bindings
    }

    fn add_declaration(&mut self, node: Node) {
        let text = self.text(node).to_string();
        if !self.declarations.contains(&text) {
            self.declarations.push(text);
        }
    }

    fn visit_import(&mut self, node: Node) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = self.rewrite_specifier(&string_value(source, self.source));
        let type_only_clause = has_token(node, "type");

        let mut cursor = node.walk();
        let Some(clause) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "import_clause")
        else {
            return;
        };

        let mut clause_cursor = clause.walk();
        for named in clause.named_children(&mut clause_cursor) {
            if named.kind() != "named_imports" {
                continue;
            }

            let mut spec_cursor = named.walk();
            for spec in named.named_children(&mut spec_cursor) {
                if spec.kind() != "import_specifier" {
                    continue;
                }

                let statement = if type_only_clause {
                    format!("import type {{ {} }} from \"{}\";", self.text(spec), specifier)
                } else if has_token(spec, "type") {
                    format!("import {{ {} }} from \"{}\";", self.text(spec), specifier)
                } else {
                    continue;
                };

                if !self.imports.contains(&statement) {
                    self.imports.push(statement);
                }
            }
        }
    }

    fn rewrite_specifier(&self, specifier: &str) -> String {
        if paths::is_relative(specifier) {
            paths::join_under(&self.context.root, [self.context.base.as_str(), specifier])
        } else {
            specifier.to_string()
        }
    }

    fn visit_export(&mut self, node: Node, bindings: &HashMap<&'a str, Node>) {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            if matches!(declaration.kind(), "interface_declaration" | "type_alias_declaration") {
                self.add_declaration(node);
                return;
            }
        }

        // export default <expr> / export = <expr>
        if !has_token(node, "default") && !has_token(node, "=") {
            return;
        }

        let mut calls = Vec::new();
        walk_descendants(node, &mut |descendant| {
            if descendant.kind() != "array" {
                return;
            }
            let mut cursor = descendant.walk();
            for element in descendant.named_children(&mut cursor) {
                if element.kind() == "call_expression" {
                    calls.push(element);
                }
            }
        });

        for call in calls {
            self.visit_entry_call(call, bindings);
        }
    }

    fn visit_entry_call(&mut self, call: Node, bindings: &HashMap<&'a str, Node>) {
        let Some(callee) = call.child_by_field_name("function") else {
            return;
        };
        let Some(entry) = EntryPoint::find(self.text(callee)) else {
            return;
        };
        let Some(first_arg) = call
            .child_by_field_name("arguments")
            .and_then(first_named_child)
        else {
            return;
        };

        let first_arg = self.resolve_binding(first_arg, bindings);

        match entry {
            EntryPoint::Env => {
                self.api_types.env_t = self.return_type(first_arg);
            }
            EntryPoint::List | EntryPoint::Retrieve => {
                let mut assets = None;
                let mut matched = false;
                for function in self.assets_functions(first_arg) {
                    assets = self.return_type(function);
                    matched = true;
                }

                if matched {
                    match entry {
                        EntryPoint::List => self.api_types.list_assets_t = assets,
                        _ => self.api_types.item_assets_t = assets,
                    }
                }
            }
        }
    }

    fn resolve_binding<'t>(&self, node: Node<'t>, bindings: &HashMap<&'a str, Node<'t>>) -> Node<'t> {
        if node.kind() == "identifier" {
            if let Some(bound) = bindings.get(self.text(node)) {
                return *bound;
            }
        }
        node
    }

    /// `assets` methods and `assets: () => ...` properties of object
    /// literals inside `node`, in document order.
    fn assets_functions<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut found = Vec::new();

        walk_descendants(node, &mut |descendant| {
            if descendant.kind() != "object" {
                return;
            }

            let mut cursor = descendant.walk();
            for member in descendant.named_children(&mut cursor) {
                match member.kind() {
                    "method_definition" => {
                        let named_assets = member
                            .child_by_field_name("name")
                            .is_some_and(|name| self.text(name) == "assets");
                        if named_assets {
                            found.push(member);
                        }
                    }
                    "pair" => {
                        let keyed_assets = member
                            .child_by_field_name("key")
                            .is_some_and(|key| string_value(key, self.source) == "assets");
                        if let (true, Some(value)) = (keyed_assets, member.child_by_field_name("value")) {
                            if value.kind() == "arrow_function" {
                                found.push(value);
                            }
                        }
                    }
                    _ => {}
                }
            }
        });

        found
    }

    /// The annotated return type of a function-like node.
    fn return_type(&self, node: Node) -> Option<String> {
        let annotation = node.child_by_field_name("return_type").or_else(|| {
            let mut cursor = node.walk();
            let direct = node
                .named_children(&mut cursor)
                .find(|child| child.kind() == "type_annotation");
            direct
        })?;

        if annotation.kind() != "type_annotation" {
            return None;
        }

        self.accepted_type(first_named_child(annotation)?, true)
    }

    /// Type references, inline object types and `any`/`unknown` are
    /// accepted; `Promise<T>` is unwrapped once when `unwrap_promise` is set.
    fn accepted_type(&self, ty: Node, unwrap_promise: bool) -> Option<String> {
        match ty.kind() {
            "generic_type" => {
                let name = ty.child_by_field_name("name").or_else(|| first_named_child(ty))?;
                if unwrap_promise && self.text(name) == "Promise" {
                    let mut cursor = ty.walk();
                    let arguments = ty
                        .named_children(&mut cursor)
                        .find(|child| child.kind() == "type_arguments")?;
                    return self.accepted_type(first_named_child(arguments)?, false);
                }
                Some(self.text(ty).to_string())
            }
            "type_identifier" | "nested_type_identifier" | "object_type" => Some(self.text(ty).to_string()),
            "predefined_type" if matches!(self.text(ty), "any" | "unknown") => Some(self.text(ty).to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ImportContext {
        ImportContext {
            root: "@".into(),
            base: "api/crud/products".into(),
        }
    }

    fn extract(source: &str) -> ExtractedTypes {
        extract_types(source, &context()).unwrap()
    }

    const API_FILE: &str = r#"
import type { Product } from "../types";
import { type Category, helper } from "./lib";
import { defineRoute } from "@appril/crud/api";

interface Env { currency: string }
export type Assets = { related: number[] };

async function env(): Promise<Env> {
  return { currency: "USD" };
}

export default [
  envHandler(env),
  listHandler({
    async assets(ctx): Promise<Assets> {
      return { related: [] };
    },
  }),
  retrieveHandler({
    assets: (ctx): ItemAssets => ({}),
  }),
];
"#;

    #[test]
    fn test_extract_entry_point_types() {
        let extracted = extract(API_FILE);
        assert_eq!(extracted.api_types.env_t.as_deref(), Some("Env"));
        assert_eq!(extracted.api_types.list_assets_t.as_deref(), Some("Assets"));
        assert_eq!(extracted.api_types.item_assets_t.as_deref(), Some("ItemAssets"));
    }

    #[test]
    fn test_extract_type_declarations() {
        let extracted = extract(API_FILE);
        assert_eq!(
            extracted.type_declarations,
            vec![
                "interface Env { currency: string }".to_string(),
                "export type Assets = { related: number[] };".to_string(),
                "import type { Product } from \"@/api/crud/types\";".to_string(),
                "import { type Category } from \"@/api/crud/products/lib\";".to_string(),
            ]
        );
    }

    #[test]
    fn test_import_above_root_stays_under_root() {
        let extracted = extract("import type { Shared } from \"../../../../shared\";");
        assert_eq!(
            extracted.type_declarations,
            vec!["import type { Shared } from \"@/shared\";".to_string()]
        );
    }

    #[test]
    fn test_promise_unwrapping() {
        let wrapped = extract("function f(): Promise<Foo> { return x; }\nexport default [ envHandler(f) ];");
        let bare = extract("function f(): Foo { return x; }\nexport default [ envHandler(f) ];");
        assert_eq!(wrapped.api_types.env_t.as_deref(), Some("Foo"));
        assert_eq!(wrapped.api_types, bare.api_types);
    }

    #[test]
    fn test_inline_env_function() {
        let extracted = extract("export default [ env(async (ctx): Promise<{ a: number }> => ({ a: 1 })) ];");
        assert_eq!(extracted.api_types.env_t.as_deref(), Some("{ a: number }"));
    }

    #[test]
    fn test_unannotated_or_unsupported_types_are_absent() {
        let extracted = extract(
            "export default [ envHandler(() => ({})), listHandler({ assets(): string { return \"\"; } }) ];",
        );
        assert_eq!(extracted.api_types, ApiTypes::default());
    }

    #[test]
    fn test_any_is_accepted() {
        let extracted = extract("export default [ envHandler((): any => ({})) ];");
        assert_eq!(extracted.api_types.env_t.as_deref(), Some("any"));
    }

    #[test]
    fn test_last_match_wins() {
        let extracted = extract(
            "export default [ listHandler({ assets: (): First => x }), listHandler({ assets: (): Second => x }) ];",
        );
        assert_eq!(extracted.api_types.list_assets_t.as_deref(), Some("Second"));
    }

    #[test]
    fn test_calls_outside_export_are_ignored() {
        let extracted = extract("const routes = [ envHandler((): Env => x) ];\nexport { routes };");
        assert_eq!(extracted.api_types, ApiTypes::default());
    }

    #[test]
    fn test_export_assignment() {
        let extracted = extract("export = [ retrieveHandler({ assets: (): Promise<Item> => x }) ];");
        assert_eq!(extracted.api_types.item_assets_t.as_deref(), Some("Item"));
    }

    #[test]
    fn test_literal_flags() {
        let extracted = extract(API_FILE);
        let literal = extracted.api_types.literal();
        assert!(literal.env_t && literal.list_assets_t && literal.item_assets_t);

        let json = serde_json::to_string(&ApiTypes::default().literal()).unwrap();
        assert_eq!(json, r#"{"EnvT":false,"ListAssetsT":false,"ItemAssetsT":false}"#);
    }

    #[test]
    fn test_serialized_shape_skips_absent_types() {
        let extracted = extract("function f(): Foo { return x; }\nexport default [ envHandler(f) ];");
        let value = serde_json::to_value(&extracted).unwrap();
        assert_eq!(value["EnvT"], "Foo");
        assert!(value.get("ListAssetsT").is_none());
        assert!(value["typeDeclarations"].as_array().unwrap().is_empty());
    }
}
