//! Keeps the ambient bundle visible to the TypeScript compiler.

use std::path::Path;

use log::debug;
use serde_json::Value;

use crate::diagnostic::GeneratorError;

/// Adds `bundle` to the `include` array of `tsconfig`.
///
/// Returns whether the file was rewritten. A missing tsconfig is not an
/// error; nothing is done.
pub async fn sync_tsconfig(tsconfig: &Path, bundle: &Path) -> Result<bool, GeneratorError> {
    if !tokio::fs::try_exists(tsconfig)
        .await
        .map_err(|e| GeneratorError::io(tsconfig, e))?
    {
        debug!("{} not found, skipping include sync", tsconfig.display());
        return Ok(false);
    }

    let content = tokio::fs::read_to_string(tsconfig)
        .await
        .map_err(|e| GeneratorError::io(tsconfig, e))?;

    let failed = |message: String| GeneratorError::TsconfigFailed {
        path: tsconfig.to_path_buf(),
        message,
    };

    let mut config: Value = serde_json::from_str(&content).map_err(|e| failed(e.to_string()))?;
    let entry = include_entry(tsconfig, bundle);

    let Some(object) = config.as_object_mut() else {
        return Err(failed("expected a JSON object".to_string()));
    };

    let include = object
        .entry("include")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(include) = include.as_array_mut() else {
        return Err(failed("\"include\" must be an array".to_string()));
    };

    if include.iter().any(|v| v.as_str() == Some(entry.as_str())) {
        return Ok(false);
    }
    include.push(Value::String(entry));

    let mut output = serde_json::to_string_pretty(&config).map_err(|e| failed(e.to_string()))?;
    output.push('\n');
    tokio::fs::write(tsconfig, output)
        .await
        .map_err(|e| GeneratorError::io(tsconfig, e))?;

    debug!("added {} to {}", bundle.display(), tsconfig.display());
    Ok(true)
}

/// Bundle path relative to the tsconfig directory, with forward slashes.
fn include_entry(tsconfig: &Path, bundle: &Path) -> String {
    tsconfig
        .parent()
        .and_then(|dir| pathdiff::diff_paths(bundle, dir))
        .unwrap_or_else(|| bundle.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/")
}
