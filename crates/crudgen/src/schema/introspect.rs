//! Introspection boundary.
//!
//! Turning a live database into table declarations is done by an external
//! tool; the generator only needs the resulting declarations and the file
//! that changes whenever a schema is re-introspected.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::TableDeclaration;
use crate::diagnostic::GeneratorError;

/// Source of table declarations.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Schemas available for generation, in a stable order.
    async fn schemas(&self) -> Result<Vec<String>, GeneratorError>;

    /// Loads declarations for one schema, or for every schema when `None`.
    async fn introspect(&self, schema: Option<&str>) -> Result<Vec<TableDeclaration>, GeneratorError>;

    /// File whose changes signal that `schema` has new declarations.
    fn schema_file(&self, schema: &str) -> PathBuf;
}

/// Reads declarations from `<dir>/<schema>.json` files, each holding an
/// array of [`TableDeclaration`]s.
#[derive(Debug, Clone)]
pub struct JsonIntrospector {
    dir: PathBuf,
    schemas: Option<Vec<String>>,
}

impl JsonIntrospector {
    /// Creates an introspector over `dir`, optionally limited to `schemas`.
    pub fn new(dir: impl Into<PathBuf>, schemas: Option<Vec<String>>) -> Self {
        Self {
            dir: dir.into(),
            schemas,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load_schema(&self, schema: &str) -> Result<Vec<TableDeclaration>, GeneratorError> {
        let path = self.schema_file(schema);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GeneratorError::io(&path, e))?;

        let mut tables: Vec<TableDeclaration> =
            serde_json::from_str(&content).map_err(|e| GeneratorError::IntrospectionFailed {
                message: format!("{}: {}", path.display(), e),
            })?;

        for table in &mut tables {
            if table.schema.is_empty() {
                table.schema = schema.to_string();
            }
        }

        Ok(tables)
    }
}

#[async_trait]
impl Introspector for JsonIntrospector {
    async fn schemas(&self) -> Result<Vec<String>, GeneratorError> {
        if let Some(ref schemas) = self.schemas {
            return Ok(schemas.clone());
        }

        if !self.dir.is_dir() {
            return Err(GeneratorError::io(&self.dir, "schema directory does not exist"));
        }

        let mut schemas = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    schemas.push(stem.to_string_lossy().to_string());
                }
            }
        }

        schemas.sort();
        Ok(schemas)
    }

    async fn introspect(&self, schema: Option<&str>) -> Result<Vec<TableDeclaration>, GeneratorError> {
        let schemas = match schema {
            Some(schema) => vec![schema.to_string()],
            None => self.schemas().await?,
        };

        let mut tables = Vec::new();
        for schema in &schemas {
            tables.extend(self.load_schema(schema).await?);
        }
        Ok(tables)
    }

    fn schema_file(&self, schema: &str) -> PathBuf {
        self.dir.join(format!("{}.json", schema))
    }
}
