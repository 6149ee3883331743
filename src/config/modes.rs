//! Mode and quality definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the CLI does with each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Resolve a single post and download it (default).
    #[default]
    Post,
    /// Print user info as JSON.
    Info,
    /// Enumerate and download a whole profile.
    Profile,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Post => write!(f, "post"),
            RunMode::Info => write!(f, "info"),
            RunMode::Profile => write!(f, "profile"),
        }
    }
}

/// Media quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Hd,
    Sd,
}

impl Quality {
    pub fn is_hd(self) -> bool {
        self == Quality::Hd
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Hd => write!(f, "hd"),
            Quality::Sd => write!(f, "sd"),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hd" => Ok(Quality::Hd),
            "sd" => Ok(Quality::Sd),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

/// Fallback selected in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    None,
    /// Retry the whole post in SD.
    #[default]
    Sd,
}

/// Post-download validation selected in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateMode {
    #[default]
    None,
    Ffprobe,
}
