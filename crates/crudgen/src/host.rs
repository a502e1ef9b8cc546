//! Bundler-facing plugin surface.
//!
//! The host reads the shared module map directly for `resolve_id`, `load`
//! and `transform`; lifecycle and change events go through the task queue.

use std::path::{Path, PathBuf};

use log::info;

use crate::codegen::ModuleMap;
use crate::config::BundlerConfig;
use crate::diagnostic::GeneratorError;
use crate::frontend::typescript::{strip_types_with, TypeScriptParser};
use crate::generator::HandlerRun;
use crate::worker::PoolHandle;

/// The bundler's file watcher.
pub trait FileWatcher {
    fn add(&mut self, paths: &[PathBuf]) -> Result<(), GeneratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub code: String,
    /// Generated modules carry no source map.
    pub map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub code: String,
}

pub struct ModuleHost {
    pool: PoolHandle,
    modules: ModuleMap,
    parser: TypeScriptParser,
}

impl ModuleHost {
    /// Connects to a pool and takes a handle to its module map.
    pub async fn connect(pool: PoolHandle) -> Result<Self, GeneratorError> {
        let modules = pool.modules().await?;
        Ok(Self {
            pool,
            modules,
            parser: TypeScriptParser::new()?,
        })
    }

    pub fn modules(&self) -> &ModuleMap {
        &self.modules
    }

    /// Claims ids of known modules.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        self.modules.contains(id).then(|| id.to_string())
    }

    pub fn load(&self, id: &str) -> Option<LoadResult> {
        self.modules
            .virtual_code(id)
            .map(|code| LoadResult { code, map: None })
    }

    /// Strips types from owned TypeScript modules. Vue modules are left
    /// to the Vue compiler.
    pub fn transform(&mut self, code: &str, id: &str) -> Result<Option<TransformResult>, GeneratorError> {
        if !self.modules.contains(id) || id.ends_with(".vue") {
            return Ok(None);
        }
        let code = strip_types_with(&mut self.parser, code, id)?;
        Ok(Some(TransformResult { code }))
    }

    /// Applies the bundler config and runs the initial generation.
    pub async fn config_resolved(&self, config: BundlerConfig) -> Result<Vec<HandlerRun>, GeneratorError> {
        self.pool.config_resolved(config).await?;
        let runs = self.pool.bootstrap().await?;
        info!("{}: {} modules ready", self.pool.pool(), self.modules.len());
        Ok(runs)
    }

    /// Registers every watched path with the bundler's watcher.
    pub async fn configure_server<W: FileWatcher>(&self, watcher: &mut W) -> Result<(), GeneratorError> {
        let paths = self.pool.watched_paths().await?;
        watcher.add(&paths)
    }

    /// Handles a watcher `change` event, then re-registers watched paths so
    /// api files of newly discovered tables get watched too.
    pub async fn on_change<W: FileWatcher>(
        &self,
        watcher: &mut W,
        path: &Path,
    ) -> Result<Vec<HandlerRun>, GeneratorError> {
        let runs = self.pool.file_changed(path).await?;
        if !runs.is_empty() {
            self.configure_server(watcher).await?;
        }
        Ok(runs)
    }
}
