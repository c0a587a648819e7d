//! Data directory and catalog path resolution.
//!
//! Serenade keeps the listener store in the platform-standard data
//! directory (`~/.local/share/serenade/` on Linux). The catalog corpus is
//! looked up next to the working directory unless an explicit path is
//! given.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name of the tagged corpus.
pub const CATALOG_FILE: &str = "raw.tsv";

/// Returns the serenade data directory, creating it if needed.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine the system data directory")?;
    let dir = base.join("serenade");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory at {}", dir.display()))?;
    Ok(dir)
}

/// Path of the SQLite listener store.
pub fn store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("listener.db"))
}

/// Resolves the catalog corpus path.
///
/// An explicit path wins. Otherwise `raw.tsv` is looked up in the working
/// directory first and its parent second.
pub fn resolve_catalog_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().context("Could not determine the working directory")?;
    let local = cwd.join(CATALOG_FILE);
    if local.exists() {
        return Ok(local);
    }
    if let Some(parent) = cwd.parent() {
        let above = parent.join(CATALOG_FILE);
        if above.exists() {
            return Ok(above);
        }
    }

    bail!(
        "No {CATALOG_FILE} found in {} or its parent; pass --catalog <path>",
        cwd.display()
    );
}
