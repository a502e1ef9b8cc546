//! Server-side api artefacts: the per-base api bundle and the handler
//! stubs created for newly discovered tables.

use std::path::Path;

use serde::Serialize;

use super::naming::api_const_name;
use crate::diagnostic::GeneratorError;
use crate::render::{render, BANNER};
use crate::resolve::Table;
use crate::schema::PrimaryKey;
use crate::templates::{API_BUNDLE_TEMPLATE, ROUTE_TEMPLATE};

/// One table's api constructor in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub name: String,
    pub schema: String,
    pub basename: String,
    pub api_path: String,
    pub const_name: String,
    pub primary_key: Option<PrimaryKey>,
    pub columns: Vec<String>,
}

impl BundleEntry {
    pub fn new(table: &Table) -> Self {
        Self {
            name: table.name().to_string(),
            schema: table.schema().to_string(),
            basename: table.basename.clone(),
            api_path: table.api_path(),
            const_name: api_const_name(&table.basename),
            primary_key: table.declaration.primary_key().cloned(),
            columns: table.declaration.columns.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

#[derive(Serialize)]
struct BundleContext<'a> {
    banner: &'static str,
    tables: &'a [BundleEntry],
}

/// Renders the api bundle for every table, ordered by table name then
/// basename.
pub fn render_api_bundle(tables: &[Table]) -> Result<String, GeneratorError> {
    let mut entries: Vec<BundleEntry> = tables.iter().map(BundleEntry::new).collect();
    entries.sort_by(|a, b| (&a.name, &a.basename).cmp(&(&b.name, &b.basename)));

    render(
        "bundle.ts",
        API_BUNDLE_TEMPLATE,
        &BundleContext {
            banner: BANNER,
            tables: &entries,
        },
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StubContext<'a> {
    #[serde(flatten)]
    table: &'a Table,
    const_name: String,
    bundle_import: String,
}

/// Renders the initial handler file of a table.
///
/// `api_file` and `bundle` are absolute; the stub imports the bundle
/// through a relative specifier.
pub fn render_api_stub(table: &Table, api_file: &Path, bundle: &Path) -> Result<String, GeneratorError> {
    render(
        "route.ts",
        ROUTE_TEMPLATE,
        &StubContext {
            table,
            const_name: api_const_name(&table.basename),
            bundle_import: bundle_import(api_file, bundle),
        },
    )
}

/// Relative, extension-less import specifier from `api_file` to `bundle`.
pub fn bundle_import(api_file: &Path, bundle: &Path) -> String {
    let bundle = bundle.with_extension("");
    let relative = api_file
        .parent()
        .and_then(|dir| pathdiff::diff_paths(&bundle, dir))
        .unwrap_or(bundle);

    let specifier = relative.to_string_lossy().replace('\\', "/");
    if specifier.starts_with("../") || specifier.starts_with("./") {
        specifier
    } else {
        format!("./{}", specifier)
    }
}
