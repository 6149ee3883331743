//! Configuration module for the tikwm-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Mode and quality definitions
//! - Configuration and input validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{ApiConfig, Config, DownloadOptions, ProfileOptions};
pub use modes::{FallbackMode, Quality, RunMode, ValidateMode};
pub use validation::{
    parse_post_input, parse_until, parse_user_input, validate_config, UserRef,
};
