//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crudgen::{GeneratorConfig, GeneratorError, Generator, Introspector, TableDeclaration, WatchCategory, HandlerRun};
use serde_json::json;
use tempfile::TempDir;

/// In-memory introspector recording every `introspect` call.
#[derive(Clone)]
pub struct RecordingIntrospector {
    dir: PathBuf,
    declarations: Arc<Mutex<BTreeMap<String, Vec<TableDeclaration>>>>,
    calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl RecordingIntrospector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            declarations: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn set_schema(&self, schema: &str, tables: serde_json::Value) {
        let tables: Vec<TableDeclaration> = serde_json::from_value(tables).unwrap();
        self.declarations.lock().unwrap().insert(schema.to_string(), tables);
    }

    pub fn remove_schema(&self, schema: &str) {
        self.declarations.lock().unwrap().remove(schema);
    }

    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Introspector for RecordingIntrospector {
    async fn schemas(&self) -> Result<Vec<String>, GeneratorError> {
        Ok(self.declarations.lock().unwrap().keys().cloned().collect())
    }

    async fn introspect(&self, schema: Option<&str>) -> Result<Vec<TableDeclaration>, GeneratorError> {
        self.calls.lock().unwrap().push(schema.map(str::to_string));
        let declarations = self.declarations.lock().unwrap();
        let tables = match schema {
            Some(schema) => declarations.get(schema).cloned().unwrap_or_default(),
            None => declarations.values().flatten().cloned().collect(),
        };
        Ok(tables)
    }

    fn schema_file(&self, schema: &str) -> PathBuf {
        self.dir.join(format!("{}.json", schema))
    }
}

pub fn products() -> serde_json::Value {
    json!({
        "name": "products",
        "schema": "public",
        "primaryKey": "id",
        "columns": [
            { "name": "id", "type": "integer", "tsType": "number" },
            { "name": "title", "type": "text", "tsType": "string" },
            { "name": "price", "type": "numeric", "tsType": "number", "nullable": true }
        ]
    })
}

pub fn brands() -> serde_json::Value {
    json!({
        "name": "brands",
        "schema": "public",
        "primaryKey": "id",
        "columns": [{ "name": "id", "tsType": "number" }, { "name": "name", "tsType": "string" }]
    })
}

pub fn events() -> serde_json::Value {
    json!({
        "name": "events",
        "schema": "audit",
        "primaryKey": "id",
        "columns": [{ "name": "id", "tsType": "number" }, { "name": "payload", "tsType": "unknown" }]
    })
}

/// A project directory with two schemas: `public` (products) and
/// `audit` (events).
pub struct Fixture {
    pub dir: TempDir,
    pub introspector: RecordingIntrospector,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let introspector = RecordingIntrospector::new(dir.path().join("var/schema"));
        introspector.set_schema("public", json!([products()]));
        introspector.set_schema("audit", json!([events()]));
        Self { dir, introspector }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig {
            root: Some(self.root().to_path_buf()),
            ..Default::default()
        }
    }

    pub fn generator(&self) -> Generator {
        self.generator_with(self.config())
    }

    pub fn generator_with(&self, config: GeneratorConfig) -> Generator {
        Generator::new(config, Box::new(self.introspector.clone())).unwrap()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }
}

pub fn categories(runs: &[HandlerRun]) -> Vec<WatchCategory> {
    runs.iter().map(|run| run.category).collect()
}

/// An api file annotating `env` and `list` assets.
pub const TYPED_API_FILE: &str = r#"import { productsApi } from "../base";
import type { Brand } from "../brands/types";

interface Env { currency: string }

const { env, list, retrieve } = productsApi;

export default [
  env(async (ctx): Promise<Env> => ({ currency: "EUR" })),
  list({
    assets: async (ctx): Promise<{ brands: Brand[] }> => ({ brands: [] }),
  }),
  retrieve(),
];
"#;
