//! Optional write-out of raw upstream responses, for debugging.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Write `body` to `dir/file_name`, pretty-printed when it is JSON.
pub fn save_raw(dir: &Path, file_name: &str, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dump directory: {}", dir.display()))?;

    let contents = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    };

    let path = dir.join(file_name);
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write dump file: {}", path.display()))?;

    Ok(path)
}

/// Like [`save_raw`], but a failure is only logged.
pub(crate) fn dump_if_enabled(dir: Option<&Path>, file_name: &str, body: &str) {
    let Some(dir) = dir else {
        return;
    };

    match save_raw(dir, file_name, body) {
        Ok(path) => tracing::debug!("Dumped raw response to {}", path.display()),
        Err(e) => tracing::warn!("{e:#}"),
    }
}
