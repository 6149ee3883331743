//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::api::types::Post;
use crate::download::DownloadConfig;
use crate::error::Result;
use crate::fs::naming::indexed_filename;

/// Destination of item `index` of a post.
pub fn destination_path(config: &DownloadConfig, post: &Post, index: usize) -> PathBuf {
    let filename = match config.filename() {
        Some(fixed) => indexed_filename(fixed, index),
        None => config.format_filename(post, index),
    };

    config.directory().join(filename)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
