use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn default_pages_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("unable to resolve cache directory")?;
    Ok(base.join("podcastr").join("pages"))
}
