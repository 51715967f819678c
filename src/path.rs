//! Discovery of pipeline directories.

use std::path::{Path, PathBuf};

use crate::error::{AppResult, config_error};

/// Find every directory under `root` that contains `pipeline_file_name`.
///
/// The root itself counts when it holds the definition file. Results are
/// sorted so reports are stable across runs.
pub fn get_pipeline_paths(root: &Path, pipeline_file_name: &str) -> AppResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(config_error(format!(
            "Path '{}' does not exist",
            root.display()
        )));
    }

    let pattern = format!(
        "{}/**/{}",
        glob::Pattern::escape(&root.display().to_string()),
        glob::Pattern::escape(pipeline_file_name)
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| config_error(format!("Invalid search pattern '{}': {}", pattern, e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let file = entry.map_err(|e| config_error(e.to_string()))?;
        if !file.is_file() {
            continue;
        }
        if let Some(dir) = file.parent() {
            paths.push(dir.to_path_buf());
        }
    }
    paths.sort();
    paths.dedup();

    tracing::debug!(root = %root.display(), found = paths.len(), "Discovered pipelines");
    Ok(paths)
}
