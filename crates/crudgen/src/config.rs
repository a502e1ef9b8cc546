//! Generator configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::diagnostic::GeneratorError;
use crate::resolve::TableFilter;
use crate::schema::TableDeclaration;

/// Configuration for one generator (one plugin instance).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Instance name. Namespaces module ids (`<base>:<table>/...`),
    /// api paths and generated artefacts.
    pub base: String,

    /// Project root. Relative paths below resolve against it.
    pub root: Option<PathBuf>,

    /// Folder holding `api_dir` and `tsconfig.json`.
    pub source_folder: PathBuf,

    /// Api directory inside `source_folder`.
    pub api_dir: String,

    /// Generated artefacts go to `<cache_dir>/<base>`.
    pub cache_dir: PathBuf,

    /// Root that relative type imports are rewritten against.
    pub import_base: String,

    pub schema_source: SchemaSourceConfig,

    /// Custom template files keyed by template name, e.g. `"Layout.vue"`.
    pub templates: BTreeMap<String, PathBuf>,

    /// Extra generation units per table name.
    pub alias: BTreeMap<String, AliasSpec>,

    /// Route metadata: `"*"` applies to every table, other keys to one basename.
    pub meta: BTreeMap<String, Map<String, Value>>,

    pub tables: TableSelection,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base: "crud".to_string(),
            root: None,
            source_folder: PathBuf::from("src"),
            api_dir: "api".to_string(),
            cache_dir: PathBuf::from("var/.cache"),
            import_base: "@".to_string(),
            schema_source: SchemaSourceConfig::default(),
            templates: BTreeMap::new(),
            alias: BTreeMap::new(),
            meta: BTreeMap::new(),
            tables: TableSelection::default(),
        }
    }
}

/// Where table declarations come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaSourceConfig {
    /// Directory of `<schema>.json` declaration files.
    pub dir: PathBuf,

    /// Only generate for these schemas.
    pub schemas: Option<Vec<String>>,
}

impl Default for SchemaSourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("var/schema"),
            schemas: None,
        }
    }
}

/// Alias value for a table: one name or a list of names.
///
/// Anything else is accepted and treated as no aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AliasSpec {
    One(String),
    Many(Vec<String>),
    Ignored(IgnoredAny),
}

impl AliasSpec {
    pub fn names(&self) -> &[String] {
        match self {
            AliasSpec::One(name) => std::slice::from_ref(name),
            AliasSpec::Many(names) => names,
            AliasSpec::Ignored(_) => &[],
        }
    }
}

/// Config-file form of the table filter predicate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableSelection {
    /// When non-empty, only these tables pass.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TableSelection {
    /// Builds a predicate, or `None` when nothing is filtered.
    pub fn to_filter(&self) -> Option<TableFilter> {
        if self.include.is_empty() && self.exclude.is_empty() {
            return None;
        }

        let include = self.include.clone();
        let exclude = self.exclude.clone();
        Some(Arc::new(move |table: &TableDeclaration| {
            (include.is_empty() || include.contains(&table.name)) && !exclude.contains(&table.name)
        }))
    }
}

/// Values a bundler supplies once its own config is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerConfig {
    /// Public base URL, e.g. `/admin/`.
    pub base: String,

    /// Overrides the configured project root.
    pub root: Option<PathBuf>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            root: None,
        }
    }
}

impl GeneratorConfig {
    /// Loads a TOML config file.
    ///
    /// Without an explicit `root`, the file's directory becomes the root.
    pub fn load_from_path(path: &Path) -> Result<Self, GeneratorError> {
        let text = std::fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))?;

        let mut config: Self = toml::from_str(&text).map_err(|e| GeneratorError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.root.is_none() {
            config.root = path.parent().map(Path::to_path_buf);
        }

        Ok(config)
    }

    /// Absolute project root.
    pub fn root_dir(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_default();
        match self.root {
            Some(ref root) if root.is_absolute() => root.clone(),
            Some(ref root) => cwd.join(root),
            None => cwd,
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root_dir().join(&self.source_folder)
    }

    /// Per-base artefact directory.
    pub fn base_cache_dir(&self) -> PathBuf {
        self.root_dir().join(&self.cache_dir).join(&self.base)
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.root_dir().join(&self.schema_source.dir)
    }

    /// Absolute path of a custom template file.
    pub fn template_path(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root_dir().join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn decl(name: &str) -> TableDeclaration {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crudgen.toml");
        fs::write(
            &path,
            r#"
base = "admin"
api_dir = "api"

[schema_source]
dir = "var/schema"
schemas = ["public"]

[templates]
"Layout.vue" = "templates/Layout.vue"

[alias]
products = ["goods", "items"]
orders = "purchases"
users = 42

[meta."*"]
auth = true

[meta.products]
menu = "Catalog"
"#,
        )
        .unwrap();

        let config = GeneratorConfig::load_from_path(&path).unwrap();
        assert_eq!(config.base, "admin");
        assert_eq!(config.root.as_deref(), Some(dir.path()));
        assert_eq!(config.schema_source.schemas, Some(vec!["public".to_string()]));
        assert_eq!(config.alias["products"].names(), ["goods", "items"]);
        assert_eq!(config.alias["orders"].names(), ["purchases"]);
        assert!(config.alias["users"].names().is_empty());
        assert_eq!(config.meta["products"]["menu"], "Catalog");
        assert_eq!(config.base_cache_dir(), dir.path().join("var/.cache/admin"));
    }

    #[test]
    fn test_malformed_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crudgen.toml");
        fs::write(&path, "base = [").unwrap();
        let err = GeneratorConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, GeneratorError::ConfigError { .. }));
    }

    #[test]
    fn test_table_selection_filter() {
        assert!(TableSelection::default().to_filter().is_none());

        let selection = TableSelection {
            include: vec![],
            exclude: vec!["migrations".into()],
        };
        let filter = selection.to_filter().unwrap();
        assert!(filter(&decl("products")));
        assert!(!filter(&decl("migrations")));

        let selection = TableSelection {
            include: vec!["products".into()],
            exclude: vec![],
        };
        let filter = selection.to_filter().unwrap();
        assert!(filter(&decl("products")));
        assert!(!filter(&decl("orders")));
    }
}
