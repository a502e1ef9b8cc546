//! Watch map: which regeneration handler a changed file triggers.
//!
//! Three path-keyed categories, each path bound in at most one of them.
//! Handlers carry everything needed to rerun them, so dispatch is a plain
//! lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::diagnostic::GeneratorError;
use crate::resolve::Table;
use crate::templates::TemplateName;

/// Handler categories, in regeneration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchCategory {
    Template,
    Schema,
    ApiFile,
}

impl WatchCategory {
    pub const ALL: [WatchCategory; 3] = [WatchCategory::Template, WatchCategory::Schema, WatchCategory::ApiFile];
}

impl fmt::Display for WatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchCategory::Template => "template",
            WatchCategory::Schema => "schema",
            WatchCategory::ApiFile => "api",
        })
    }
}

#[derive(Debug, Clone)]
pub enum WatchHandler {
    /// Re-reads a custom template file.
    Template { name: TemplateName, file: PathBuf },
    /// Re-introspects one schema.
    Schema { schema: String },
    /// Re-analyzes one table's api file and regenerates its modules.
    ApiFile { table: Table },
}

impl WatchHandler {
    pub fn category(&self) -> WatchCategory {
        match self {
            WatchHandler::Template { .. } => WatchCategory::Template,
            WatchHandler::Schema { .. } => WatchCategory::Schema,
            WatchHandler::ApiFile { .. } => WatchCategory::ApiFile,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchMap {
    categories: BTreeMap<WatchCategory, BTreeMap<PathBuf, WatchHandler>>,
}

impl WatchMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `path` to `handler`, replacing a binding of the same category.
    pub fn bind(&mut self, path: impl Into<PathBuf>, handler: WatchHandler) -> Result<(), GeneratorError> {
        let path = path.into();
        let requested = handler.category();

        if let Some(existing) = self.category_of(&path) {
            if existing != requested {
                return Err(GeneratorError::WatchConflict {
                    path,
                    existing: existing.to_string(),
                    requested: requested.to_string(),
                });
            }
        }

        self.categories.entry(requested).or_default().insert(path, handler);
        Ok(())
    }

    pub fn unbind(&mut self, path: &Path) -> Option<WatchHandler> {
        self.categories.values_mut().find_map(|handlers| handlers.remove(path))
    }

    /// Drops every binding of one category.
    pub fn clear(&mut self, category: WatchCategory) {
        self.categories.remove(&category);
    }

    pub fn lookup(&self, path: &Path) -> Option<&WatchHandler> {
        self.categories.values().find_map(|handlers| handlers.get(path))
    }

    pub fn category_of(&self, path: &Path) -> Option<WatchCategory> {
        self.lookup(path).map(WatchHandler::category)
    }

    /// Bindings of one category, ordered by path.
    pub fn handlers(&self, category: WatchCategory) -> Vec<(PathBuf, WatchHandler)> {
        self.categories
            .get(&category)
            .map(|handlers| handlers.iter().map(|(p, h)| (p.clone(), h.clone())).collect())
            .unwrap_or_default()
    }

    /// Every watched path, in category order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.categories.values().flat_map(|handlers| handlers.keys().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
