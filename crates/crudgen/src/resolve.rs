//! Table resolution: schema declarations to generation units.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::warn;
use serde::{Serialize, Serializer};

use crate::config::AliasSpec;
use crate::diagnostic::GeneratorError;
use crate::paths;
use crate::schema::TableDeclaration;

/// User predicate selecting which declarations generate tables.
pub type TableFilter = Arc<dyn Fn(&TableDeclaration) -> bool + Send + Sync>;

/// Configuration the derived table paths are computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    /// Generator base, e.g. `crud`.
    pub base: String,
    /// Api directory, e.g. `api`.
    pub api_dir: String,
    /// Public (bundler) base URL, e.g. `/admin/`.
    pub public_base: String,
}

/// One generation unit.
///
/// Several tables may share a declaration when aliases are configured.
#[derive(Debug, Clone)]
pub struct Table {
    pub basename: String,
    pub declaration: Arc<TableDeclaration>,
    pub paths: Arc<TablePaths>,
}

impl Table {
    pub fn new(basename: impl Into<String>, declaration: Arc<TableDeclaration>, paths: Arc<TablePaths>) -> Self {
        Self {
            basename: basename.into(),
            declaration,
            paths,
        }
    }

    /// Declared table name (shared by all aliases).
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn schema(&self) -> &str {
        &self.declaration.schema
    }

    pub fn is_alias(&self) -> bool {
        self.basename != self.declaration.name
    }

    /// Path inside the api directory, e.g. `crud/products`.
    pub fn api_path(&self) -> String {
        paths::join([self.paths.base.as_str(), self.basename.as_str()])
    }

    /// Fetch URL, e.g. `/admin/api/crud/products`.
    pub fn api_base(&self) -> String {
        paths::join([
            self.paths.public_base.as_str(),
            self.paths.api_dir.as_str(),
            self.api_path().as_str(),
        ])
    }

    /// Handler file relative to the source folder, e.g.
    /// `api/crud/products/index.ts`.
    pub fn api_file(&self) -> String {
        paths::join([self.paths.api_dir.as_str(), self.api_path().as_str(), "index.ts"])
    }

    /// Human-readable identity used in diagnostics.
    pub fn describe(&self) -> String {
        if self.is_alias() {
            format!("{} (alias of {})", self.basename, self.declaration.name)
        } else {
            self.basename.clone()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableView<'a> {
    #[serde(flatten)]
    declaration: &'a TableDeclaration,
    basename: &'a str,
    api_path: String,
    api_base: String,
    api_file: String,
}

/// Serializes as the declaration's fields plus `basename`, `apiPath`,
/// `apiBase` and `apiFile`, which is what templates see.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TableView {
            declaration: &self.declaration,
            basename: &self.basename,
            api_path: self.api_path(),
            api_base: self.api_base(),
            api_file: self.api_file(),
        }
        .serialize(serializer)
    }
}

/// Maps declarations to tables.
///
/// Declarations passing `filter` yield a table named after themselves,
/// unless they lack a primary key, in which case they are skipped with a
/// warning. Every configured alias yields one more table regardless of the
/// filter and the primary key.
pub fn resolve_tables(
    declarations: &[TableDeclaration],
    filter: Option<&TableFilter>,
    aliases: &BTreeMap<String, AliasSpec>,
    paths: &Arc<TablePaths>,
) -> Vec<Table> {
    let mut tables = Vec::new();

    for declaration in declarations {
        let declaration = Arc::new(declaration.clone());

        if filter.map_or(true, |f| f(declaration.as_ref())) {
            if declaration.primary_key().is_some() {
                tables.push(Table::new(&declaration.name, declaration.clone(), paths.clone()));
            } else {
                warn!("{} - no primaryKey defined, skipping...", declaration.name);
            }
        }

        let alias_names = aliases
            .get(&declaration.name)
            .map(AliasSpec::names)
            .unwrap_or_default();

        for alias in alias_names {
            tables.push(Table::new(alias, declaration.clone(), paths.clone()));
        }
    }

    tables
}

/// Rejects table sets where two tables resolve to the same api path.
pub fn ensure_unique_api_paths(tables: &[Table]) -> Result<(), GeneratorError> {
    let mut seen: HashMap<String, &Table> = HashMap::new();

    for table in tables {
        let api_path = table.api_path();
        if let Some(first) = seen.get(&api_path) {
            return Err(GeneratorError::DuplicateApiPath {
                api_path,
                first: first.describe(),
                second: table.describe(),
            });
        }
        seen.insert(api_path, table);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decl(value: serde_json::Value) -> TableDeclaration {
        serde_json::from_value(value).unwrap()
    }

    fn paths() -> Arc<TablePaths> {
        Arc::new(TablePaths {
            base: "crud".into(),
            api_dir: "api".into(),
            public_base: "/admin/".into(),
        })
    }

    fn aliases(value: serde_json::Value) -> BTreeMap<String, AliasSpec> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_derived_paths() {
        let table = Table::new(
            "products",
            Arc::new(decl(json!({ "name": "products", "primaryKey": "id" }))),
            paths(),
        );
        assert_eq!(table.api_path(), "crud/products");
        assert_eq!(table.api_base(), "/admin/api/crud/products");
        assert_eq!(table.api_file(), "api/crud/products/index.ts");
    }

    #[test]
    fn test_alias_fan_out_bypasses_filter() {
        let declarations = vec![decl(json!({ "name": "products", "schema": "public", "primaryKey": "id" }))];
        let filter: TableFilter = Arc::new(|_: &TableDeclaration| false);
        let aliases = aliases(json!({ "products": ["a", "b"] }));

        let tables = resolve_tables(&declarations, Some(&filter), &aliases, &paths());
        let basenames: Vec<_> = tables.iter().map(|t| t.basename.as_str()).collect();
        assert_eq!(basenames, vec!["a", "b"]);

        for table in &tables {
            assert_eq!(table.name(), "products");
            assert_eq!(table.schema(), "public");
            assert!(table.is_alias());
        }
    }

    #[test]
    fn test_primary_key_gate() {
        let declarations = vec![decl(json!({ "name": "logs" }))];
        let tables = resolve_tables(&declarations, None, &BTreeMap::new(), &paths());
        assert!(tables.is_empty());
    }

    #[test]
    fn test_alias_of_keyless_table_is_kept() {
        let declarations = vec![decl(json!({ "name": "logs" }))];
        let aliases = aliases(json!({ "logs": "journal" }));
        let tables = resolve_tables(&declarations, None, &aliases, &paths());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].basename, "journal");
    }

    #[test]
    fn test_malformed_alias_is_ignored() {
        let declarations = vec![decl(json!({ "name": "products", "primaryKey": "id" }))];
        let aliases = aliases(json!({ "products": { "name": "goods" } }));
        let tables = resolve_tables(&declarations, None, &aliases, &paths());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].basename, "products");
    }

    #[test]
    fn test_duplicate_api_path_rejected() {
        let declarations = vec![
            decl(json!({ "name": "products", "primaryKey": "id" })),
            decl(json!({ "name": "orders", "primaryKey": "id" })),
        ];
        let aliases = aliases(json!({ "orders": "products" }));
        let tables = resolve_tables(&declarations, None, &aliases, &paths());

        let err = ensure_unique_api_paths(&tables).unwrap_err();
        match err {
            GeneratorError::DuplicateApiPath { api_path, first, second } => {
                assert_eq!(api_path, "crud/products");
                assert_eq!(first, "products");
                assert_eq!(second, "products (alias of orders)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_table_serializes_derived_fields() {
        let table = Table::new(
            "goods",
            Arc::new(decl(json!({ "name": "products", "primaryKey": "id", "comment": "x" }))),
            paths(),
        );
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["name"], "products");
        assert_eq!(value["basename"], "goods");
        assert_eq!(value["apiPath"], "crud/goods");
        assert_eq!(value["apiFile"], "api/crud/goods/index.ts");
        assert_eq!(value["comment"], "x");
    }
}
