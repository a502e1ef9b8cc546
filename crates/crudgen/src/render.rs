//! Template rendering and generated file output.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::debug;
use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::diagnostic::GeneratorError;

/// Header of every generated file.
pub const BANNER: &str = "/**\n* @generated file, do not modify manually!\n*/";

/// Renders `template` against `context`.
///
/// Output is source code, so nothing is HTML-escaped. `tojson` turns any
/// context value into a JSON (and thus TypeScript) literal.
pub fn render<S: Serialize>(name: &str, template: &str, context: &S) -> Result<String, GeneratorError> {
    let render_error = |e: minijinja::Error| GeneratorError::RenderFailed {
        template: name.to_string(),
        message: e.to_string(),
    };

    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);

    env.add_filter("tojson", |value: minijinja::Value| -> Result<String, minijinja::Error> {
        serde_json::to_string(&value)
            .map_err(|e| minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string()))
    });

    env.add_template(name, template).map_err(render_error)?;
    let tpl = env.get_template(name).map_err(render_error)?;
    tpl.render(minijinja::Value::from_serialize(context)).map_err(render_error)
}

/// Whether an existing file may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Always,
    /// Written once, then owned by the user.
    Never,
}

/// Every kind of file the generator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    RoutesManifest,
    ApiBundle,
    AmbientBundle,
    RouteTemplate,
    /// Api handler file created for a newly discovered table.
    ApiStub,
    GeneratedFilesList,
}

impl OutputKind {
    pub fn overwrite(self) -> Overwrite {
        match self {
            OutputKind::ApiStub => Overwrite::Never,
            OutputKind::RoutesManifest
            | OutputKind::ApiBundle
            | OutputKind::AmbientBundle
            | OutputKind::RouteTemplate
            | OutputKind::GeneratedFilesList => Overwrite::Always,
        }
    }
}

/// Outcome of [`FileGenerator::generate_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A write-once file already existed.
    Kept,
}

/// Writes generated files and remembers which ones it wrote.
#[derive(Debug, Default)]
pub struct FileGenerator {
    generated: BTreeSet<PathBuf>,
}

impl FileGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `content` to `path`, creating parent directories, unless the
    /// kind is write-once and the file exists.
    pub async fn generate_file(
        &mut self,
        path: &Path,
        kind: OutputKind,
        content: &str,
    ) -> Result<WriteOutcome, GeneratorError> {
        if kind.overwrite() == Overwrite::Never
            && tokio::fs::try_exists(path).await.map_err(|e| GeneratorError::io(path, e))?
        {
            debug!("keeping existing {}", path.display());
            return Ok(WriteOutcome::Kept);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GeneratorError::io(parent, e))?;
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GeneratorError::io(path, e))?;

        if kind != OutputKind::GeneratedFilesList {
            self.generated.insert(path.to_path_buf());
        }

        Ok(WriteOutcome::Written)
    }

    /// Files written so far, sorted.
    pub fn generated_files(&self) -> impl Iterator<Item = &Path> {
        self.generated.iter().map(PathBuf::as_path)
    }

    /// Writes the list of generated files to `path`, one per line,
    /// relative to `root`.
    pub async fn persist(&mut self, path: &Path, root: &Path) -> Result<(), GeneratorError> {
        let mut content = String::new();
        for file in &self.generated {
            let relative = pathdiff::diff_paths(file, root).unwrap_or_else(|| file.clone());
            content.push_str(&relative.to_string_lossy());
            content.push('\n');
        }

        self.generate_file(path, OutputKind::GeneratedFilesList, &content).await?;
        Ok(())
    }
}
