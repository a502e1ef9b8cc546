//! Client module generation.
//!
//! Each table gets one module per template, addressed as
//! `<base>:<basename>/<name>` (the index module is addressed by the bare
//! prefix). Modules live in memory and are served to the bundler; only
//! their declaration projections reach the disk, through the ambient
//! bundle.

pub mod api_bundle;
pub mod manifest;
pub mod naming;
pub mod tsconfig;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::diagnostic::GeneratorError;
use crate::frontend::typescript::ExtractedTypes;
use crate::render::{render, BANNER};
use crate::resolve::Table;
use crate::templates::{TemplateName, TemplateRegistry, PLACEHOLDER};

/// An ambient/virtual module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvModule {
    pub id: String,
    /// Module name within the table namespace, e.g. `store` or `Layout.vue`.
    pub name: String,
    /// Declaration-facing code, aggregated into the ambient bundle.
    pub ambient_code: String,
    /// Code served to the bundler.
    pub virtual_code: String,
}

/// Namespace of a table's modules.
pub fn module_prefix(base: &str, basename: &str) -> String {
    format!("{}:{}", base, basename)
}

pub fn module_id(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Inputs for generating one table's modules.
pub struct ModuleContext<'a> {
    pub table: &'a Table,
    pub api_types: &'a ExtractedTypes,
    pub templates: &'a TemplateRegistry,
}

impl ModuleContext<'_> {
    pub fn prefix(&self) -> String {
        module_prefix(&self.table.paths.base, &self.table.basename)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderContext<'a> {
    #[serde(flatten)]
    table: &'a Table,
    banner: &'static str,
    prefix: &'a str,
    regular_columns: Vec<&'a str>,
    api_types: &'a ExtractedTypes,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_types_literal: Option<String>,
}

/// Builds the module for one template.
///
/// Only the two data templates go through the renderer; every other
/// template just gets its placeholder replaced.
pub fn module_factory(context: &ModuleContext, name: TemplateName) -> Result<AvModule, GeneratorError> {
    let prefix = context.prefix();
    let mut code = context.templates.get(name).replace(PLACEHOLDER, &prefix);

    if name.is_data_template() {
        let api_types_literal = if name.emits_flags() {
            let literal = serde_json::to_string(&context.api_types.api_types.literal()).map_err(|e| {
                GeneratorError::RenderFailed {
                    template: name.to_string(),
                    message: e.to_string(),
                }
            })?;
            Some(literal)
        } else {
            None
        };

        let render_context = RenderContext {
            table: context.table,
            banner: BANNER,
            prefix: &prefix,
            regular_columns: context
                .table
                .declaration
                .regular_columns()
                .into_iter()
                .map(|c| c.name.as_str())
                .collect(),
            api_types: context.api_types,
            api_types_literal,
        };

        code = render(name.file_name(), &code, &render_context)?;
    }

    let ambient_code = if name.is_vue() {
        format!("export {{ default }} from \"{}/{}.d.ts\";", prefix, name.file_name())
    } else {
        code.clone()
    };

    Ok(AvModule {
        id: module_id(&prefix, name.module_name()),
        name: name.module_name().to_string(),
        ambient_code,
        virtual_code: code,
    })
}

/// Builds every module of one table.
pub fn table_modules(context: &ModuleContext) -> Result<Vec<AvModule>, GeneratorError> {
    TemplateName::ALL
        .into_iter()
        .map(|name| module_factory(context, name))
        .collect()
}

/// Shared, id-keyed module map.
///
/// The generator writes entries in place; the module host reads them.
/// Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    inner: Arc<RwLock<BTreeMap<String, AvModule>>>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, AvModule>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, AvModule>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a module. Returns whether the entry changed.
    pub fn insert(&self, module: AvModule) -> bool {
        let mut modules = self.write();
        match modules.get(&module.id) {
            Some(existing) if *existing == module => false,
            _ => {
                modules.insert(module.id.clone(), module);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<AvModule> {
        self.read().get(id).cloned()
    }

    pub fn virtual_code(&self, id: &str) -> Option<String> {
        self.read().get(id).map(|m| m.virtual_code.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, AvModule> {
        self.read().clone()
    }

    /// Removes every module of one table namespace, returning the removed ids.
    pub fn remove_prefix(&self, prefix: &str) -> Vec<String> {
        let nested = format!("{}/", prefix);
        let mut modules = self.write();
        let removed: Vec<String> = modules
            .keys()
            .filter(|id| id.as_str() == prefix || id.starts_with(&nested))
            .cloned()
            .collect();
        for id in &removed {
            modules.remove(id);
        }
        removed
    }

    /// One `declare module` block per module, in id order.
    pub fn ambient_bundle(&self) -> String {
        let modules = self.read();
        let mut out = String::from(BANNER);
        out.push('\n');
        for module in modules.values() {
            out.push_str(&format!(
                "\ndeclare module \"{}\" {{\n{}\n}}\n",
                module.id,
                module.ambient_code.trim_end()
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::typescript::ApiTypes;
    use crate::resolve::TablePaths;
    use crate::schema::TableDeclaration;
    use serde_json::json;

    fn table(basename: &str) -> Table {
        let declaration: TableDeclaration = serde_json::from_value(json!({
            "name": "products",
            "schema": "public",
            "primaryKey": "id",
            "columns": [
                { "name": "id", "type": "integer", "tsType": "number" },
                { "name": "title", "type": "text", "tsType": "string", "nullable": true }
            ]
        }))
        .unwrap();
        Table::new(
            basename,
            Arc::new(declaration),
            Arc::new(TablePaths {
                base: "crud".into(),
                api_dir: "api".into(),
                public_base: "/admin/".into(),
            }),
        )
    }

    fn api_types() -> ExtractedTypes {
        ExtractedTypes {
            type_declarations: vec!["interface Env { currency: string }".into()],
            api_types: ApiTypes {
                env_t: Some("Env".into()),
                list_assets_t: None,
                item_assets_t: None,
            },
        }
    }

    #[test]
    fn test_module_factory_is_idempotent() {
        let table = table("products");
        let types = api_types();
        let templates = TemplateRegistry::new();
        let context = ModuleContext {
            table: &table,
            api_types: &types,
            templates: &templates,
        };

        for name in TemplateName::ALL {
            assert_eq!(module_factory(&context, name).unwrap(), module_factory(&context, name).unwrap());
        }
    }

    #[test]
    fn test_vue_ambient_indirection() {
        let table = table("products");
        let types = api_types();
        let templates = TemplateRegistry::new();
        let context = ModuleContext {
            table: &table,
            api_types: &types,
            templates: &templates,
        };

        let module = module_factory(&context, TemplateName::LayoutVue).unwrap();
        assert_eq!(module.id, "crud:products/Layout.vue");
        assert_eq!(module.ambient_code, "export { default } from \"crud:products/Layout.vue.d.ts\";");
        assert_ne!(module.ambient_code, module.virtual_code);
        // vue templates are never rendered
        assert!(module.virtual_code.contains("{{ item[primaryKey] }}"));
        assert!(module.virtual_code.contains("crud:products/base"));
        assert!(!module.virtual_code.contains(PLACEHOLDER));
    }

    #[test]
    fn test_index_module_id_is_prefix() {
        let table = table("goods");
        let types = ExtractedTypes::default();
        let templates = TemplateRegistry::new();
        let context = ModuleContext {
            table: &table,
            api_types: &types,
            templates: &templates,
        };

        let module = module_factory(&context, TemplateName::Index).unwrap();
        assert_eq!(module.id, "crud:goods");
        assert_eq!(module.name, "");
        assert_eq!(module.ambient_code, module.virtual_code);
    }

    #[test]
    fn test_data_templates_rendered() {
        let table = table("products");
        let types = api_types();
        let templates = TemplateRegistry::new();
        let context = ModuleContext {
            table: &table,
            api_types: &types,
            templates: &templates,
        };

        let assets = module_factory(&context, TemplateName::Assets).unwrap();
        assert!(assets.virtual_code.starts_with(BANNER));
        assert!(assets.virtual_code.contains(r#"export const primaryKey = "id";"#));
        assert!(assets.virtual_code.contains(r#"export const apiBase = "/admin/api/crud/products";"#));
        assert!(assets
            .virtual_code
            .contains(r#"export const apiTypes: ApiTypesLiteral = {"EnvT":true,"ListAssetsT":false,"ItemAssetsT":false};"#));
        assert!(assets.virtual_code.contains(r#"export const regularColumns: (keyof ItemT)[] = ["title"];"#));

        let api_types = module_factory(&context, TemplateName::ApiTypes).unwrap();
        assert!(api_types.virtual_code.contains("interface Env { currency: string }"));
        assert!(api_types.virtual_code.contains("export type EnvT = Env;"));
        assert!(api_types.virtual_code.contains("export type ListAssetsT = unknown;"));
        assert!(api_types.virtual_code.contains(r#"  "title"?: string;"#));
    }

    #[test]
    fn test_custom_template_substitution() {
        let table = table("products");
        let types = ExtractedTypes::default();
        let mut templates = TemplateRegistry::new();
        templates.set_custom(TemplateName::Store, format!("export * from \"{}/assets\";\n", PLACEHOLDER));
        let context = ModuleContext {
            table: &table,
            api_types: &types,
            templates: &templates,
        };

        let module = module_factory(&context, TemplateName::Store).unwrap();
        assert_eq!(module.virtual_code, "export * from \"crud:products/assets\";\n");
    }

    #[test]
    fn test_module_map_remove_prefix() {
        let map = ModuleMap::new();
        for id in ["crud:products", "crud:products/store", "crud:products2/store"] {
            map.insert(AvModule {
                id: id.into(),
                name: String::new(),
                ambient_code: String::new(),
                virtual_code: String::new(),
            });
        }

        let mut removed = map.remove_prefix("crud:products");
        removed.sort();
        assert_eq!(removed, vec!["crud:products", "crud:products/store"]);
        assert_eq!(map.ids(), vec!["crud:products2/store"]);
    }

    #[test]
    fn test_insert_reports_changes() {
        let map = ModuleMap::new();
        let module = AvModule {
            id: "crud:products/api".into(),
            name: "api".into(),
            ambient_code: "a".into(),
            virtual_code: "a".into(),
        };
        assert!(map.insert(module.clone()));
        assert!(!map.insert(module.clone()));
        assert!(map.insert(AvModule {
            virtual_code: "b".into(),
            ..module
        }));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_ambient_bundle() {
        let map = ModuleMap::new();
        map.insert(AvModule {
            id: "crud:products/api".into(),
            name: "api".into(),
            ambient_code: "export const api = 1;\n".into(),
            virtual_code: String::new(),
        });

        let bundle = map.ambient_bundle();
        assert!(bundle.starts_with(BANNER));
        assert!(bundle.contains("declare module \"crud:products/api\" {\nexport const api = 1;\n}\n"));
    }
}
