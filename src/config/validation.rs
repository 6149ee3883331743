//! Configuration and input validation logic.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::api::MAX_FEED_PAGE_SIZE;
use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Upper bound on per-item retries.
const MAX_RETRIES: u32 = 100;

/// Format accepted by `--until`.
pub const UNTIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A user reference, either numeric id or handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(String),
    Handle(String),
}

impl UserRef {
    /// Query parameter name for `user/posts`.
    pub fn query_key(&self) -> &'static str {
        match self {
            UserRef::Id(_) => "user_id",
            UserRef::Handle(_) => "unique_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            UserRef::Id(v) | UserRef::Handle(v) => v,
        }
    }
}

fn handle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]{1,64}$").expect("valid regex"))
}

fn profile_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/@([A-Za-z0-9_.]+)").expect("valid regex"))
}

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_base_url(&config.api.base_url)?;
    validate_page_size(config.profile.page_size)?;
    validate_retries(config.download.retries)?;
    parse_until(&config.profile.until)?;

    Ok(())
}

/// Validate the API base URL.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    if base_url.trim().is_empty() {
        return Err(Error::ConfigValidation {
            field: "base_url".to_string(),
            message: "API base URL must not be empty".to_string(),
        });
    }

    let parsed = url::Url::parse(base_url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "base_url".to_string(),
            message: format!("Unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(())
}

/// Validate the feed page size.
pub fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 || page_size > MAX_FEED_PAGE_SIZE {
        return Err(Error::ConfigValidation {
            field: "page_size".to_string(),
            message: format!(
                "Page size must be between 1 and {} (got {})",
                MAX_FEED_PAGE_SIZE, page_size
            ),
        });
    }

    Ok(())
}

/// Validate the retry count.
pub fn validate_retries(retries: u32) -> Result<()> {
    if retries > MAX_RETRIES {
        return Err(Error::ConfigValidation {
            field: "retries".to_string(),
            message: format!("At most {} retries allowed (got {})", MAX_RETRIES, retries),
        });
    }

    Ok(())
}

/// Parse a cutoff time in `YYYY-MM-DD HH:MM:SS` form, interpreted as UTC.
pub fn parse_until(input: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input.trim(), UNTIL_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::ConfigValidation {
            field: "until".to_string(),
            message: format!("Could not parse '{}': {}", input, e),
        })
}

/// Check a post reference: either a full URL or a bare numeric id.
pub fn parse_post_input(input: &str) -> Result<String> {
    let input = input.trim();

    if input.starts_with("http://") || input.starts_with("https://") {
        url::Url::parse(input)?;
        return Ok(input.to_string());
    }

    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Ok(input.to_string());
    }

    Err(Error::InvalidInput(format!(
        "'{}' is neither a post URL nor a numeric post id",
        input
    )))
}

/// Classify a user reference as numeric id or handle.
///
/// Accepts `123456`, `alice`, `@alice` and profile URLs like
/// `https://www.tiktok.com/@alice`.
pub fn parse_user_input(input: &str) -> Result<UserRef> {
    let input = input.trim();

    if input.starts_with("http://") || input.starts_with("https://") {
        if let Some(captures) = profile_url_pattern().captures(input) {
            if let Some(handle) = captures.get(1) {
                return Ok(UserRef::Handle(handle.as_str().to_string()));
            }
        }

        return Err(Error::InvalidInput(format!(
            "Could not extract a user handle from URL: {}",
            input
        )));
    }

    if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
        return Ok(UserRef::Id(input.to_string()));
    }

    let handle = input.trim_start_matches('@');
    if handle_pattern().is_match(handle) {
        return Ok(UserRef::Handle(handle.to_string()));
    }

    Err(Error::InvalidInput(format!("Invalid user handle: '{}'", input)))
}
