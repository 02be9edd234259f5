//
// paths.rs
// Oct-Tools-rs
//
// Derives result locations from input paths and prepares clean output directories.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// `<result_root>/<parent folder name>/<file stem>` for a single vendor file.
pub fn derive_output_dir(result_root: &Path, input_file: &Path) -> PathBuf {
    let mut dir = result_root.to_path_buf();
    if let Some(parent_name) = input_file
        .parent()
        .and_then(|p| p.file_name())
        .filter(|n| !n.is_empty())
    {
        dir.push(parent_name);
    }
    let stem = input_file
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    dir.push(stem);
    dir
}

/// Result file for a whole series directory, named after the acquisition folder one level up.
pub fn series_output_path(result_root: &Path, input_dir: &Path, extension: &str) -> PathBuf {
    let name = input_dir
        .parent()
        .and_then(|p| p.file_name())
        .or_else(|| input_dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string());
    result_root.join(format!("{name}.{extension}"))
}

/// Remove `dir` (if present) and recreate it empty.
pub fn remove_and_create_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!("Removing previous results in {:?}", dir);
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {:?}", dir))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    Ok(())
}

pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    Ok(())
}
