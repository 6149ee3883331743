//! Configuration structures and loading logic.

use crate::config::modes::{FallbackMode, Quality, ValidateMode};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default tikwm API base URL.
pub const DEFAULT_API_URL: &str = "https://tikwm.com/api";

/// Browser user agent sent to the API and media hosts.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.1";

/// Configuration file name looked up in the working and platform config directories.
pub const CONFIG_FILE_NAME: &str = "tikwm.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub download: DownloadOptions,

    #[serde(default)]
    pub profile: ProfileOptions,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the tikwm API.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Cooldown after each API request, in milliseconds.
    #[serde(default = "default_request_spacing")]
    pub request_spacing_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent for API and media requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Mirror raw API responses to the debug log.
    #[serde(default)]
    pub debug: bool,
}

/// Download behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Directory to save files into.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Fixed filename instead of the generated one.
    #[serde(default)]
    pub filename: Option<String>,

    /// Delay between items of the same post, in milliseconds.
    #[serde(default = "default_inter_item_delay")]
    pub inter_item_delay_ms: u64,

    /// Delay before each retry, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Retries per item after the first attempt.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default)]
    pub quality: Quality,

    /// Allow concurrent downloads (disables the single-flight gate).
    #[serde(default)]
    pub no_sync: bool,

    #[serde(default)]
    pub fallback: FallbackMode,

    #[serde(default)]
    pub validate: ValidateMode,

    /// Explicit ffprobe binary; looked up on PATH when unset.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Profile (feed) enumeration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Skip posts created before this time ("YYYY-MM-DD HH:MM:SS", UTC).
    #[serde(default = "default_until")]
    pub until: String,

    /// Only download posts smaller than this many megabytes.
    #[serde(default = "default_max_size")]
    pub max_size_mb: u64,

    /// Keep going when a post fails to download.
    #[serde(default)]
    pub ignore_errors: bool,

    /// Posts requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_spacing_ms: default_request_spacing(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            debug: false,
        }
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            directory: None,
            filename: None,
            inter_item_delay_ms: default_inter_item_delay(),
            retry_delay_ms: default_retry_delay(),
            retries: default_retries(),
            quality: Quality::default(),
            no_sync: false,
            fallback: FallbackMode::default(),
            validate: ValidateMode::default(),
            ffprobe_path: None,
        }
    }
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            until: default_until(),
            max_size_mb: default_max_size(),
            ignore_errors: false,
            page_size: default_page_size(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_spacing() -> u64 {
    1100
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_inter_item_delay() -> u64 {
    1000
}

fn default_retry_delay() -> u64 {
    15_000
}

fn default_retries() -> u32 {
    2
}

fn default_until() -> String {
    "1970-01-01 00:00:00".to_string()
}

fn default_max_size() -> u64 {
    4096
}

fn default_page_size() -> u32 {
    33
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find the configuration file to use.
    ///
    /// An explicit path always wins; otherwise `./tikwm.toml`, then the platform
    /// config directory. Returns `None` when nothing exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        ProjectDirs::from("", "", "tikwm-downloader")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    /// Get the effective download directory.
    pub fn download_directory(&self) -> PathBuf {
        self.download
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn request_spacing(&self) -> Duration {
        Duration::from_millis(self.api.request_spacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Size limit for profile downloads in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.profile.max_size_mb.saturating_mul(1 << 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.request_spacing(), Duration::from_millis(1100));
        assert_eq!(config.download.retries, 2);
        assert_eq!(config.download.quality, Quality::Hd);
        assert_eq!(config.download.fallback, FallbackMode::Sd);
        assert_eq!(config.profile.page_size, 33);
        assert_eq!(config.download_directory(), PathBuf::from("."));
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [api]
            request_spacing_ms = 250

            [download]
            directory = "/media/tt"
            quality = "sd"
            fallback = "none"
            validate = "ffprobe"

            [profile]
            max_size_mb = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.api.request_spacing_ms, 250);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.download_directory(), PathBuf::from("/media/tt"));
        assert_eq!(config.download.quality, Quality::Sd);
        assert_eq!(config.download.fallback, FallbackMode::None);
        assert_eq!(config.download.validate, ValidateMode::Ffprobe);
        assert_eq!(config.max_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[download]\nretries = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.download.retries, 5);
        assert_eq!(Config::locate(Some(&path)), Some(path.clone()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/tikwm.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
