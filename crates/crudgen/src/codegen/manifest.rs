//! Routes manifest: one YAML entry per table, consumed by the api
//! generator.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::diagnostic::GeneratorError;
use crate::render::BANNER;
use crate::resolve::{ensure_unique_api_paths, Table};

/// Computes a table's route metadata, replacing the configured `meta`.
pub type MetaFn = Arc<dyn Fn(&Table) -> Map<String, Value> + Send + Sync>;

/// Key of the metadata shared by every table.
pub const META_DEFAULTS: &str = "*";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub name: String,
    pub basename: String,
    pub file: String,
    pub template: String,
    pub meta: Map<String, Value>,
}

/// Metadata of one table: the meta function's output when installed,
/// otherwise `meta["*"]` overlaid with `meta[basename]`.
pub fn table_meta(
    table: &Table,
    meta_fn: Option<&MetaFn>,
    config: &BTreeMap<String, Map<String, Value>>,
) -> Map<String, Value> {
    if let Some(meta_fn) = meta_fn {
        return meta_fn(table);
    }

    let mut meta = config.get(META_DEFAULTS).cloned().unwrap_or_default();
    if let Some(own) = config.get(&table.basename) {
        for (key, value) in own {
            meta.insert(key.clone(), value.clone());
        }
    }
    meta
}

/// Builds the manifest entries keyed by api path.
pub fn route_entries(
    tables: &[Table],
    template: &Path,
    meta_fn: Option<&MetaFn>,
    config: &BTreeMap<String, Map<String, Value>>,
) -> Result<BTreeMap<String, RouteEntry>, GeneratorError> {
    ensure_unique_api_paths(tables)?;

    let template = template.to_string_lossy().into_owned();
    Ok(tables
        .iter()
        .map(|table| {
            let api_path = table.api_path();
            let entry = RouteEntry {
                name: api_path.clone(),
                basename: table.basename.clone(),
                file: table.api_file(),
                template: template.clone(),
                meta: table_meta(table, meta_fn, config),
            };
            (api_path, entry)
        })
        .collect())
}

/// Renders the manifest: the banner as `#` comments, then the entries.
pub fn render_routes_manifest(entries: &BTreeMap<String, RouteEntry>) -> Result<String, GeneratorError> {
    let yaml = serde_yaml::to_string(entries).map_err(|e| GeneratorError::ManifestFailed {
        message: e.to_string(),
    })?;

    let banner: Vec<String> = BANNER.trim().lines().map(|line| format!("#{}", line)).collect();
    Ok(format!("{}\n{}", banner.join("\n"), yaml))
}

/// Manifest file name for a base, e.g. `_000_crud_routes.yml`.
pub fn manifest_file_name(base: &str) -> String {
    format!("_000_{}_routes.yml", base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::TablePaths;
    use crate::schema::TableDeclaration;
    use serde_json::json;

    fn tables(basenames: &[&str]) -> Vec<Table> {
        let paths = Arc::new(TablePaths {
            base: "crud".into(),
            api_dir: "api".into(),
            public_base: "/".into(),
        });
        basenames
            .iter()
            .map(|basename| {
                let declaration: TableDeclaration =
                    serde_json::from_value(json!({ "name": "products", "primaryKey": "id" })).unwrap();
                Table::new(*basename, Arc::new(declaration), paths.clone())
            })
            .collect()
    }

    fn meta(value: serde_json::Value) -> BTreeMap<String, Map<String, Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_one_entry_per_table() {
        let tables = tables(&["products", "goods"]);
        let entries = route_entries(&tables, Path::new("/p/var/.cache/crud/route.ts.tpl"), None, &BTreeMap::new())
            .unwrap();

        let keys: Vec<_> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["crud/goods", "crud/products"]);

        let goods = &entries["crud/goods"];
        assert_eq!(goods.name, "crud/goods");
        assert_eq!(goods.basename, "goods");
        assert_eq!(goods.file, "api/crud/goods/index.ts");
        assert_eq!(goods.template, "/p/var/.cache/crud/route.ts.tpl");
    }

    #[test]
    fn test_duplicate_api_path() {
        let tables = tables(&["products", "products"]);
        let err = route_entries(&tables, Path::new("t"), None, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, GeneratorError::DuplicateApiPath { .. }));
    }

    #[test]
    fn test_meta_merge() {
        let tables = tables(&["products", "goods"]);
        let config = meta(json!({
            "*": { "auth": true, "group": "catalog" },
            "goods": { "group": "store" }
        }));

        assert_eq!(Value::Object(table_meta(&tables[0], None, &config)), json!({ "auth": true, "group": "catalog" }));
        assert_eq!(Value::Object(table_meta(&tables[1], None, &config)), json!({ "auth": true, "group": "store" }));
    }

    #[test]
    fn test_meta_fn_takes_precedence() {
        let tables = tables(&["products"]);
        let config = meta(json!({ "*": { "auth": true } }));
        let meta_fn: MetaFn = Arc::new(|table: &Table| {
            let mut meta = Map::new();
            meta.insert("title".into(), Value::String(table.basename.to_uppercase()));
            meta
        });

        assert_eq!(Value::Object(table_meta(&tables[0], Some(&meta_fn), &config)), json!({ "title": "PRODUCTS" }));
    }

    #[test]
    fn test_render_manifest() {
        let tables = tables(&["products"]);
        let entries = route_entries(&tables, Path::new("/tpl"), None, &BTreeMap::new()).unwrap();
        let yaml = render_routes_manifest(&entries).unwrap();

        assert!(yaml.starts_with("#/**\n#* @generated file, do not modify manually!\n#*/\n"));
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["crud/products"]["file"].as_str(), Some("api/crud/products/index.ts"));
        assert_eq!(parsed["crud/products"]["template"].as_str(), Some("/tpl"));
    }

    #[test]
    fn test_manifest_file_name() {
        assert_eq!(manifest_file_name("crud"), "_000_crud_routes.yml");
    }
}
