//! Table declarations produced by schema introspection.
//!
//! Declarations are immutable once loaded; one retrieval happens per
//! regeneration wave.

mod introspect;

pub use introspect::{Introspector, JsonIntrospector};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema-qualified table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDeclaration {
    /// Table name as declared in the database.
    pub name: String,

    /// Schema the table lives in. Defaults to the declaration file stem.
    #[serde(default)]
    pub schema: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Any other introspection output, passed through to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Single or composite primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Key column names.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(name) => vec![name.as_str()],
            PrimaryKey::Composite(names) => names.iter().map(String::as_str).collect(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            PrimaryKey::Single(name) => name.is_empty(),
            PrimaryKey::Composite(names) => names.iter().all(String::is_empty),
        }
    }
}

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,

    /// Database type, e.g. `integer` or `character varying`.
    #[serde(rename = "type", default)]
    pub data_type: String,

    /// TypeScript type the introspector mapped the column to.
    #[serde(default = "unknown_ts_type")]
    pub ts_type: String,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_ts_type() -> String {
    "unknown".to_string()
}

impl TableDeclaration {
    /// The primary key, treating empty names as absent.
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref().filter(|pk| !pk.is_empty())
    }

    /// Columns that are not part of the primary key.
    pub fn regular_columns(&self) -> Vec<&Column> {
        let key_columns = self
            .primary_key()
            .map(|pk| pk.columns())
            .unwrap_or_default();

        self.columns
            .iter()
            .filter(|c| !key_columns.contains(&c.name.as_str()))
            .collect()
    }
}
