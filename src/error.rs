//! Error types for the tikwm-downloader application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Upstream errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("tikwm error: {message} ({code}) [{method}, query: {query}]")]
    Upstream {
        code: i64,
        message: String,
        method: String,
        query: String,
    },

    #[error("Malformed response: {0}")]
    Decode(String),

    // Download errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Item {index} of post {post_id} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        post_id: String,
        index: usize,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Fallback for post {post_id} failed: {source}")]
    FallbackExhausted {
        post_id: String,
        #[source]
        source: Box<Error>,
    },

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Whether this error came from the network rather than from the API itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Http(_))
    }

    /// Upstream status code, if the API rejected the request.
    pub fn upstream_code(&self) -> Option<i64> {
        match self {
            Error::Upstream { code, .. } => Some(*code),
            Error::RetriesExhausted { source, .. } | Error::FallbackExhausted { source, .. } => {
                source.upstream_code()
            }
            _ => None,
        }
    }
}

impl Error {
    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::ConfigValidation { .. }
            | Error::InvalidInput(_)
            | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
            Error::Transport(_)
            | Error::Http(_)
            | Error::Upstream { .. }
            | Error::Decode(_)
            | Error::Json(_) => exit_codes::API_ERROR,
            Error::Validation(_)
            | Error::RetriesExhausted { .. }
            | Error::FallbackExhausted { .. }
            | Error::InvalidFilename(_) => exit_codes::DOWNLOAD_ERROR,
            Error::Io(_) | Error::UrlParse(_) => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_INPUTS_FAILED: i32 = 6;
}
