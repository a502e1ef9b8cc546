//! Template registry.
//!
//! Every client module is produced from one named template. Built-in
//! templates are compiled in; a project may override any of them with its
//! own file, which is re-read whenever it changes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::diagnostic::GeneratorError;

/// Token replaced with the table prefix (`<base>:<basename>`) in every template.
pub const PLACEHOLDER: &str = "@crud:virtual-module-placeholder";

/// Route template handed to the api generator through the routes manifest,
/// and used to create missing api handler files.
pub const ROUTE_TEMPLATE: &str = include_str!("../../templates/api/route.tpl");

/// Template of the per-base api bundle.
pub const API_BUNDLE_TEMPLATE: &str = include_str!("../../templates/api/bundle.tpl");

/// The closed set of client templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateName {
    Assets,
    ApiTypes,
    Api,
    Base,
    Handlers,
    Index,
    Setup,
    Store,
    ControlButtonsVue,
    ControlButtonsVueDts,
    CreateDialogVue,
    CreateDialogVueDts,
    EditorPlaceholderVue,
    EditorPlaceholderVueDts,
    LayoutVue,
    LayoutVueDts,
    OverlayVue,
    OverlayVueDts,
    PagerVue,
    PagerVueDts,
}

impl TemplateName {
    pub const ALL: [TemplateName; 20] = [
        TemplateName::Assets,
        TemplateName::ApiTypes,
        TemplateName::Api,
        TemplateName::Base,
        TemplateName::Handlers,
        TemplateName::Index,
        TemplateName::Setup,
        TemplateName::Store,
        TemplateName::ControlButtonsVue,
        TemplateName::ControlButtonsVueDts,
        TemplateName::CreateDialogVue,
        TemplateName::CreateDialogVueDts,
        TemplateName::EditorPlaceholderVue,
        TemplateName::EditorPlaceholderVueDts,
        TemplateName::LayoutVue,
        TemplateName::LayoutVueDts,
        TemplateName::OverlayVue,
        TemplateName::OverlayVueDts,
        TemplateName::PagerVue,
        TemplateName::PagerVueDts,
    ];

    /// Template file name, e.g. `store.ts` or `Layout.vue.d.ts`.
    pub fn file_name(self) -> &'static str {
        match self {
            TemplateName::Assets => "assets.ts",
            TemplateName::ApiTypes => "apiTypes.ts",
            TemplateName::Api => "api.ts",
            TemplateName::Base => "base.ts",
            TemplateName::Handlers => "handlers.ts",
            TemplateName::Index => "index.ts",
            TemplateName::Setup => "setup.ts",
            TemplateName::Store => "store.ts",
            TemplateName::ControlButtonsVue => "ControlButtons.vue",
            TemplateName::ControlButtonsVueDts => "ControlButtons.vue.d.ts",
            TemplateName::CreateDialogVue => "CreateDialog.vue",
            TemplateName::CreateDialogVueDts => "CreateDialog.vue.d.ts",
            TemplateName::EditorPlaceholderVue => "EditorPlaceholder.vue",
            TemplateName::EditorPlaceholderVueDts => "EditorPlaceholder.vue.d.ts",
            TemplateName::LayoutVue => "Layout.vue",
            TemplateName::LayoutVueDts => "Layout.vue.d.ts",
            TemplateName::OverlayVue => "Overlay.vue",
            TemplateName::OverlayVueDts => "Overlay.vue.d.ts",
            TemplateName::PagerVue => "Pager.vue",
            TemplateName::PagerVueDts => "Pager.vue.d.ts",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.file_name() == name)
    }

    /// Module name within a table's namespace: empty for the index,
    /// `.ts` templates lose their extension, Vue files keep theirs.
    pub fn module_name(self) -> &'static str {
        let file_name = self.file_name();
        match self {
            TemplateName::Index => "",
            _ if self.is_vue() || self.is_vue_declaration() => file_name,
            _ => file_name.strip_suffix(".ts").unwrap_or(file_name),
        }
    }

    /// Single-file component templates.
    pub fn is_vue(self) -> bool {
        self.file_name().ends_with(".vue")
    }

    pub fn is_vue_declaration(self) -> bool {
        self.file_name().ends_with(".vue.d.ts")
    }

    /// The declaration-only sibling of a Vue template.
    pub fn declaration(self) -> Option<Self> {
        match self {
            TemplateName::ControlButtonsVue => Some(TemplateName::ControlButtonsVueDts),
            TemplateName::CreateDialogVue => Some(TemplateName::CreateDialogVueDts),
            TemplateName::EditorPlaceholderVue => Some(TemplateName::EditorPlaceholderVueDts),
            TemplateName::LayoutVue => Some(TemplateName::LayoutVueDts),
            TemplateName::OverlayVue => Some(TemplateName::OverlayVueDts),
            TemplateName::PagerVue => Some(TemplateName::PagerVueDts),
            _ => None,
        }
    }

    /// Templates rendered with table and api type context. All others only
    /// get the placeholder substituted.
    pub fn is_data_template(self) -> bool {
        matches!(self, TemplateName::Assets | TemplateName::ApiTypes)
    }

    /// The data template that also receives the JSON presence flags.
    pub fn emits_flags(self) -> bool {
        self == TemplateName::Assets
    }

    /// Compiled-in template text.
    pub fn builtin(self) -> &'static str {
        match self {
            TemplateName::Assets => include_str!("../../templates/client/assets.ts.tpl"),
            TemplateName::ApiTypes => include_str!("../../templates/client/apiTypes.ts.tpl"),
            TemplateName::Api => include_str!("../../templates/client/api.ts.tpl"),
            TemplateName::Base => include_str!("../../templates/client/base.ts.tpl"),
            TemplateName::Handlers => include_str!("../../templates/client/handlers.ts.tpl"),
            TemplateName::Index => include_str!("../../templates/client/index.ts.tpl"),
            TemplateName::Setup => include_str!("../../templates/client/setup.ts.tpl"),
            TemplateName::Store => include_str!("../../templates/client/store.ts.tpl"),
            TemplateName::ControlButtonsVue => include_str!("../../templates/client/ControlButtons.vue.tpl"),
            TemplateName::ControlButtonsVueDts => {
                include_str!("../../templates/client/ControlButtons.vue.d.ts.tpl")
            }
            TemplateName::CreateDialogVue => include_str!("../../templates/client/CreateDialog.vue.tpl"),
            TemplateName::CreateDialogVueDts => include_str!("../../templates/client/CreateDialog.vue.d.ts.tpl"),
            TemplateName::EditorPlaceholderVue => {
                include_str!("../../templates/client/EditorPlaceholder.vue.tpl")
            }
            TemplateName::EditorPlaceholderVueDts => {
                include_str!("../../templates/client/EditorPlaceholder.vue.d.ts.tpl")
            }
            TemplateName::LayoutVue => include_str!("../../templates/client/Layout.vue.tpl"),
            TemplateName::LayoutVueDts => include_str!("../../templates/client/Layout.vue.d.ts.tpl"),
            TemplateName::OverlayVue => include_str!("../../templates/client/Overlay.vue.tpl"),
            TemplateName::OverlayVueDts => include_str!("../../templates/client/Overlay.vue.d.ts.tpl"),
            TemplateName::PagerVue => include_str!("../../templates/client/Pager.vue.tpl"),
            TemplateName::PagerVueDts => include_str!("../../templates/client/Pager.vue.d.ts.tpl"),
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for TemplateName {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_file_name(s).ok_or_else(|| GeneratorError::UnknownTemplate { name: s.to_string() })
    }
}

/// Current text of every template: custom overrides over built-ins.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    custom: HashMap<TemplateName, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: TemplateName) -> &str {
        self.custom
            .get(&name)
            .map(String::as_str)
            .unwrap_or_else(|| name.builtin())
    }

    /// Installs (or replaces) a custom template.
    pub fn set_custom(&mut self, name: TemplateName, text: String) {
        self.custom.insert(name, text);
    }

    pub fn is_custom(&self, name: TemplateName) -> bool {
        self.custom.contains_key(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names() {
        assert_eq!(TemplateName::Index.module_name(), "");
        assert_eq!(TemplateName::Store.module_name(), "store");
        assert_eq!(TemplateName::ApiTypes.module_name(), "apiTypes");
        assert_eq!(TemplateName::LayoutVue.module_name(), "Layout.vue");
        assert_eq!(TemplateName::LayoutVueDts.module_name(), "Layout.vue.d.ts");
    }

    #[test]
    fn test_file_name_round_trip() {
        for name in TemplateName::ALL {
            assert_eq!(name.file_name().parse::<TemplateName>().unwrap(), name);
        }
        assert!(matches!(
            "Missing.vue".parse::<TemplateName>(),
            Err(GeneratorError::UnknownTemplate { .. })
        ));
    }

    #[test]
    fn test_vue_classification() {
        let vue: Vec<_> = TemplateName::ALL.into_iter().filter(|t| t.is_vue()).collect();
        assert_eq!(vue.len(), 6);
        for name in vue {
            let declaration = name.declaration().unwrap();
            assert!(declaration.is_vue_declaration());
            assert!(!declaration.is_vue());
        }
    }

    #[test]
    fn test_exactly_two_data_templates() {
        let data: Vec<_> = TemplateName::ALL.into_iter().filter(|t| t.is_data_template()).collect();
        assert_eq!(data, vec![TemplateName::Assets, TemplateName::ApiTypes]);
        assert!(TemplateName::Assets.emits_flags());
        assert!(!TemplateName::ApiTypes.emits_flags());
    }

    #[test]
    fn test_builtins_use_placeholder() {
        for name in [TemplateName::Store, TemplateName::Index, TemplateName::LayoutVue] {
            assert!(name.builtin().contains(PLACEHOLDER), "{name} lacks placeholder");
        }
    }

    #[test]
    fn test_custom_overrides_builtin() {
        let mut registry = TemplateRegistry::new();
        assert_eq!(registry.get(TemplateName::PagerVue), TemplateName::PagerVue.builtin());
        registry.set_custom(TemplateName::PagerVue, "<template />".into());
        assert!(registry.is_custom(TemplateName::PagerVue));
        assert_eq!(registry.get(TemplateName::PagerVue), "<template />");
    }
}
