//! Filesystem module.
//!
//! Provides:
//! - Destination paths and directory management
//! - Filename generation and sanitizing

pub mod naming;
pub mod paths;

pub use naming::{format_filename, indexed_filename, sanitize_filename, sanitize_path_component};
pub use paths::{destination_path, ensure_dir};
