//! Generator error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while generating or serving modules.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum GeneratorError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error on '{}': {message}", path.display())]
    #[diagnostic(code(crudgen::io::failed))]
    IoError {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration in '{}': {message}", path.display())]
    #[diagnostic(code(crudgen::config::invalid))]
    ConfigError {
        path: PathBuf,
        message: String,
    },

    #[error("Unknown template: {name}")]
    #[diagnostic(
        code(crudgen::config::unknown_template),
        help("Custom templates must use one of the built-in names, e.g. \"Layout.vue\" or \"store.ts\"")
    )]
    UnknownTemplate {
        name: String,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Failed to initialize parser")]
    #[diagnostic(code(crudgen::parse::init_failed))]
    ParserInitFailed,

    #[error("Failed to parse file: {}", path.display())]
    #[diagnostic(code(crudgen::parse::parse_failed))]
    ParseFailed {
        path: PathBuf,
    },

    // =========================================================================
    // Schema Errors
    // =========================================================================
    #[error("Schema introspection failed: {message}")]
    #[diagnostic(code(crudgen::schema::introspection_failed))]
    IntrospectionFailed {
        message: String,
    },

    #[error("API path '{api_path}' is produced by both '{first}' and '{second}'")]
    #[diagnostic(
        code(crudgen::schema::duplicate_api_path),
        help("Two tables (or aliases) resolve to the same basename. Rename one of the aliases.")
    )]
    DuplicateApiPath {
        api_path: String,
        first: String,
        second: String,
    },

    // =========================================================================
    // Code Generation Errors
    // =========================================================================
    #[error("Failed to render template '{template}': {message}")]
    #[diagnostic(code(crudgen::codegen::render_failed))]
    RenderFailed {
        template: String,
        message: String,
    },

    #[error("Failed to serialize routes manifest: {message}")]
    #[diagnostic(code(crudgen::codegen::manifest_failed))]
    ManifestFailed {
        message: String,
    },

    #[error("Failed to update '{}': {message}", path.display())]
    #[diagnostic(code(crudgen::codegen::tsconfig_failed))]
    TsconfigFailed {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to transform module '{id}': {message}")]
    #[diagnostic(code(crudgen::host::transform_failed))]
    TransformFailed {
        id: String,
        message: String,
    },

    // =========================================================================
    // Watch / Worker Errors
    // =========================================================================
    #[error("'{}' is already watched as a {existing} file, cannot watch it as a {requested} file", path.display())]
    #[diagnostic(code(crudgen::watch::conflict))]
    WatchConflict {
        path: PathBuf,
        existing: String,
        requested: String,
    },

    #[error("No generator registered for pool '{pool}'")]
    #[diagnostic(code(crudgen::worker::unknown_pool))]
    UnknownPool {
        pool: String,
    },

    #[error("Generation worker is no longer running")]
    #[diagnostic(code(crudgen::worker::unavailable))]
    WorkerUnavailable,
}

impl GeneratorError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
