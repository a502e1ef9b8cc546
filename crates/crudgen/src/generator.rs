//! The regeneration engine.
//!
//! A [`Generator`] owns everything one base generates: the template
//! registry, the resolved tables, the module map and the watch map.
//! Handlers run one at a time in a fixed order: templates, then schemas,
//! then api files. Schema handlers only touch server-side artefacts; client
//! modules are (re)built by the api file handlers, once the api file they
//! read types from exists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::codegen::api_bundle::{render_api_bundle, render_api_stub};
use crate::codegen::manifest::{manifest_file_name, render_routes_manifest, route_entries, MetaFn};
use crate::codegen::tsconfig::sync_tsconfig;
use crate::codegen::{module_prefix, table_modules, ModuleContext, ModuleMap};
use crate::config::{BundlerConfig, GeneratorConfig};
use crate::diagnostic::GeneratorError;
use crate::frontend::typescript::{extract_types_with, ImportContext, TypeScriptParser};
use crate::paths;
use crate::render::{FileGenerator, OutputKind, WriteOutcome};
use crate::resolve::{ensure_unique_api_paths, resolve_tables, Table, TableFilter, TablePaths};
use crate::schema::{Introspector, JsonIntrospector};
use crate::templates::{TemplateName, TemplateRegistry, ROUTE_TEMPLATE};
use crate::watch::{WatchCategory, WatchHandler, WatchMap};

/// One executed handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRun {
    pub category: WatchCategory,
    /// The watched path the handler is bound to.
    pub path: PathBuf,
}

impl fmt::Display for HandlerRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category, self.path.display())
    }
}

pub struct Generator {
    config: GeneratorConfig,
    bundler: BundlerConfig,
    introspector: Box<dyn Introspector>,
    table_filter: Option<TableFilter>,
    meta_fn: Option<MetaFn>,
    templates: TemplateRegistry,
    /// Resolved tables per schema.
    tables: BTreeMap<String, Vec<Table>>,
    modules: ModuleMap,
    watch: WatchMap,
    files: FileGenerator,
    parser: TypeScriptParser,
}

impl Generator {
    pub fn new(config: GeneratorConfig, introspector: Box<dyn Introspector>) -> Result<Self, GeneratorError> {
        let table_filter = config.tables.to_filter();
        Ok(Self {
            config,
            bundler: BundlerConfig::default(),
            introspector,
            table_filter,
            meta_fn: None,
            templates: TemplateRegistry::new(),
            tables: BTreeMap::new(),
            modules: ModuleMap::new(),
            watch: WatchMap::new(),
            files: FileGenerator::new(),
            parser: TypeScriptParser::new()?,
        })
    }

    /// Creates a generator reading declarations from the configured
    /// schema directory.
    pub fn from_config(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let introspector = JsonIntrospector::new(config.schema_dir(), config.schema_source.schemas.clone());
        Self::new(config, Box::new(introspector))
    }

    /// Replaces the configured `tables` selection.
    pub fn with_table_filter(mut self, filter: TableFilter) -> Self {
        self.table_filter = Some(filter);
        self
    }

    /// Replaces the configured `meta` tables.
    pub fn with_meta_fn(mut self, meta_fn: MetaFn) -> Self {
        self.meta_fn = Some(meta_fn);
        self
    }

    pub fn base(&self) -> &str {
        &self.config.base
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn bundler_config(&self) -> &BundlerConfig {
        &self.bundler
    }

    /// Handle to the module map, shared with whoever serves the modules.
    pub fn modules(&self) -> ModuleMap {
        self.modules.clone()
    }

    pub fn watch_map(&self) -> &WatchMap {
        &self.watch
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watch.paths()
    }

    /// Every resolved table, grouped by schema.
    pub fn tables(&self) -> Vec<Table> {
        self.tables.values().flatten().cloned().collect()
    }

    /// Applies the bundler's resolved config. The bundler root, when
    /// given, replaces the configured one.
    pub fn config_resolved(&mut self, bundler: BundlerConfig) {
        if let Some(ref root) = bundler.root {
            self.config.root = Some(root.clone());
        }
        self.bundler = bundler;
    }

    // =========================================================================
    // Paths
    // =========================================================================

    fn table_paths(&self) -> Arc<TablePaths> {
        Arc::new(TablePaths {
            base: self.config.base.clone(),
            api_dir: self.config.api_dir.clone(),
            public_base: self.bundler.base.clone(),
        })
    }

    pub fn api_file_path(&self, table: &Table) -> PathBuf {
        self.config.source_dir().join(table.api_file())
    }

    pub fn routes_manifest_path(&self) -> PathBuf {
        self.config
            .source_dir()
            .join(&self.config.api_dir)
            .join(manifest_file_name(&self.config.base))
    }

    pub fn api_bundle_path(&self) -> PathBuf {
        self.config
            .source_dir()
            .join(&self.config.api_dir)
            .join(&self.config.base)
            .join("base.ts")
    }

    pub fn ambient_bundle_path(&self) -> PathBuf {
        self.config.base_cache_dir().join("env.d.ts")
    }

    pub fn route_template_path(&self) -> PathBuf {
        self.config.base_cache_dir().join("route.ts.tpl")
    }

    pub fn generated_files_path(&self) -> PathBuf {
        self.config.base_cache_dir().join("generated-files.txt")
    }

    pub fn tsconfig_path(&self) -> PathBuf {
        self.config.source_dir().join("tsconfig.json")
    }

    // =========================================================================
    // Waves
    // =========================================================================

    /// Initial generation: binds template and schema files, runs every
    /// handler, then syncs tsconfig and records the generated files.
    pub async fn bootstrap(&mut self) -> Result<Vec<HandlerRun>, GeneratorError> {
        let route_template = self.route_template_path();
        self.files
            .generate_file(&route_template, OutputKind::RouteTemplate, ROUTE_TEMPLATE)
            .await?;

        self.watch.clear(WatchCategory::Template);
        for (name, file) in &self.config.templates {
            let name: TemplateName = name.parse()?;
            let file = self.config.template_path(file);
            self.watch.bind(file.clone(), WatchHandler::Template { name, file })?;
        }

        self.watch.clear(WatchCategory::Schema);
        let schemas = self.introspector.schemas().await?;
        for schema in &schemas {
            let file = self.introspector.schema_file(schema);
            self.watch.bind(file, WatchHandler::Schema { schema: schema.clone() })?;
        }
        self.drop_unlisted_schemas(&schemas).await?;

        let runs = self.regenerate_all().await?;

        sync_tsconfig(&self.tsconfig_path(), &self.ambient_bundle_path()).await?;

        let root = self.config.root_dir();
        self.files.persist(&self.generated_files_path(), &root).await?;

        info!(
            "{}: {} tables, {} modules",
            self.config.base,
            self.tables.values().map(Vec::len).sum::<usize>(),
            self.modules.len()
        );
        Ok(runs)
    }

    /// Dispatches a file change to its handler.
    ///
    /// A template change cascades into every schema and api file handler,
    /// a schema change into the api file handlers of every table of that
    /// schema. Unwatched paths run nothing.
    pub async fn file_changed(&mut self, path: &Path) -> Result<Vec<HandlerRun>, GeneratorError> {
        let Some(handler) = self.watch.lookup(path).cloned() else {
            debug!("{} is not watched", path.display());
            return Ok(Vec::new());
        };

        let mut runs = Vec::new();
        match handler {
            WatchHandler::Template { name, ref file } => {
                self.reload_template(name, file).await?;
                runs.push(run(WatchCategory::Template, path));
                runs.extend(self.run_schema_handlers().await?);
                runs.extend(self.run_api_handlers().await?);
            }
            WatchHandler::Schema { ref schema } => {
                let tables = self.refresh_schema(schema).await?;
                runs.push(run(WatchCategory::Schema, path));
                for table in tables {
                    let api_file = self.api_file_path(&table);
                    self.regenerate_table(&table).await?;
                    runs.push(run(WatchCategory::ApiFile, &api_file));
                }
            }
            WatchHandler::ApiFile { ref table } => {
                self.regenerate_table(table).await?;
                runs.push(run(WatchCategory::ApiFile, path));
            }
        }

        Ok(runs)
    }

    async fn regenerate_all(&mut self) -> Result<Vec<HandlerRun>, GeneratorError> {
        let mut runs = Vec::new();
        for (path, handler) in self.watch.handlers(WatchCategory::Template) {
            if let WatchHandler::Template { name, file } = handler {
                self.reload_template(name, &file).await?;
                runs.push(run(WatchCategory::Template, &path));
            }
        }
        runs.extend(self.run_schema_handlers().await?);
        runs.extend(self.run_api_handlers().await?);
        Ok(runs)
    }

    async fn run_schema_handlers(&mut self) -> Result<Vec<HandlerRun>, GeneratorError> {
        let mut runs = Vec::new();
        for (path, handler) in self.watch.handlers(WatchCategory::Schema) {
            if let WatchHandler::Schema { schema } = handler {
                self.refresh_schema(&schema).await?;
                runs.push(run(WatchCategory::Schema, &path));
            }
        }
        Ok(runs)
    }

    async fn run_api_handlers(&mut self) -> Result<Vec<HandlerRun>, GeneratorError> {
        let mut runs = Vec::new();
        for (path, handler) in self.watch.handlers(WatchCategory::ApiFile) {
            if let WatchHandler::ApiFile { table } = handler {
                self.regenerate_table(&table).await?;
                runs.push(run(WatchCategory::ApiFile, &path));
            }
        }
        Ok(runs)
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    async fn reload_template(&mut self, name: TemplateName, file: &Path) -> Result<(), GeneratorError> {
        let text = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| GeneratorError::io(file, e))?;
        debug!("loaded custom {} template from {}", name, file.display());
        self.templates.set_custom(name, text);
        Ok(())
    }

    /// Re-resolves one schema's tables and rewrites the server-side
    /// artefacts. Returns the schema's tables.
    async fn refresh_schema(&mut self, schema: &str) -> Result<Vec<Table>, GeneratorError> {
        let declarations = self.introspector.introspect(Some(schema)).await?;
        let resolved = resolve_tables(
            &declarations,
            self.table_filter.as_ref(),
            &self.config.alias,
            &self.table_paths(),
        );

        let mut all: Vec<Table> = self
            .tables
            .iter()
            .filter(|(name, _)| name.as_str() != schema)
            .flat_map(|(_, tables)| tables.iter().cloned())
            .collect();
        all.extend(resolved.iter().cloned());
        ensure_unique_api_paths(&all)?;

        let previous = self.tables.insert(schema.to_string(), resolved.clone()).unwrap_or_default();
        let current: BTreeSet<&str> = resolved.iter().map(|t| t.basename.as_str()).collect();

        let mut pruned = false;
        for table in previous.iter().filter(|t| !current.contains(t.basename.as_str())) {
            self.drop_table(table);
            pruned = true;
        }

        let bundle = self.api_bundle_path();
        for table in &resolved {
            let api_file = self.api_file_path(table);
            let stub = render_api_stub(table, &api_file, &bundle)?;
            if self.files.generate_file(&api_file, OutputKind::ApiStub, &stub).await? == WriteOutcome::Written {
                info!("created {}", api_file.display());
            }
            self.watch
                .bind(api_file, WatchHandler::ApiFile { table: table.clone() })?;
        }

        self.write_server_artefacts(&all).await?;
        if pruned {
            self.write_ambient_bundle().await?;
        }

        Ok(resolved)
    }

    /// Forgets the tables of schemas the introspector no longer lists.
    async fn drop_unlisted_schemas(&mut self, schemas: &[String]) -> Result<(), GeneratorError> {
        let unlisted: Vec<String> = self
            .tables
            .keys()
            .filter(|schema| !schemas.contains(*schema))
            .cloned()
            .collect();
        if unlisted.is_empty() {
            return Ok(());
        }

        for schema in unlisted {
            for table in self.tables.remove(&schema).unwrap_or_default() {
                self.drop_table(&table);
            }
            info!("schema {} is gone", schema);
        }

        let remaining = self.tables();
        self.write_server_artefacts(&remaining).await?;
        self.write_ambient_bundle().await
    }

    /// Removes a table's modules and its api file binding. The api file
    /// itself stays.
    fn drop_table(&mut self, table: &Table) {
        let removed = self
            .modules
            .remove_prefix(&module_prefix(&table.paths.base, &table.basename));
        let api_file = self.api_file_path(table);
        self.watch.unbind(&api_file);
        debug!("dropped {} ({} modules)", table.describe(), removed.len());
    }

    async fn write_server_artefacts(&mut self, tables: &[Table]) -> Result<(), GeneratorError> {
        let entries = route_entries(
            tables,
            &self.route_template_path(),
            self.meta_fn.as_ref(),
            &self.config.meta,
        )?;
        let manifest = render_routes_manifest(&entries)?;
        let manifest_path = self.routes_manifest_path();
        self.files
            .generate_file(&manifest_path, OutputKind::RoutesManifest, &manifest)
            .await?;

        let bundle = render_api_bundle(tables)?;
        let bundle_path = self.api_bundle_path();
        self.files
            .generate_file(&bundle_path, OutputKind::ApiBundle, &bundle)
            .await?;
        Ok(())
    }

    /// Analyzes a table's api file and regenerates all of its modules.
    async fn regenerate_table(&mut self, table: &Table) -> Result<(), GeneratorError> {
        let api_file = self.api_file_path(table);
        let source = tokio::fs::read_to_string(&api_file)
            .await
            .map_err(|e| GeneratorError::io(&api_file, e))?;

        let import_context = ImportContext {
            root: self.config.import_base.clone(),
            base: paths::dirname(&table.api_file()),
        };
        let api_types = extract_types_with(&mut self.parser, &api_file, &source, &import_context)?;
        debug!("{}: {:?}", table.describe(), api_types.api_types);

        let context = ModuleContext {
            table,
            api_types: &api_types,
            templates: &self.templates,
        };
        for module in table_modules(&context)? {
            self.modules.insert(module);
        }

        self.write_ambient_bundle().await
    }

    async fn write_ambient_bundle(&mut self) -> Result<(), GeneratorError> {
        let path = self.ambient_bundle_path();
        let bundle = self.modules.ambient_bundle();
        self.files
            .generate_file(&path, OutputKind::AmbientBundle, &bundle)
            .await?;
        Ok(())
    }
}

fn run(category: WatchCategory, path: &Path) -> HandlerRun {
    HandlerRun {
        category,
        path: path.to_path_buf(),
    }
}
