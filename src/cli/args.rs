//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{parse_until, Config, Quality, RunMode, ValidateMode};
use crate::error::Result;
use crate::fs::sanitize_filename;

/// Retries used when neither a config file nor `--retries` sets them.
pub const DEFAULT_CLI_RETRIES: u32 = 3;

/// tikwm post and profile downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "tikwm-downloader",
    version,
    about = "Download posts and profiles through the tikwm API",
    long_about = "Download videos and image galleries through the tikwm API.\n\n\
                  Inputs are post URLs or ids by default, usernames or user ids with --profile or --info."
)]
pub struct Args {
    /// Post URLs/ids, or usernames/ids with --profile and --info.
    pub inputs: Vec<String>,

    /// Download or scan whole profiles.
    #[arg(long, conflicts_with = "info")]
    pub profile: bool,

    /// Print information about profiles.
    #[arg(long)]
    pub info: bool,

    /// Don't download posts created before this time (UTC).
    #[arg(long, value_name = "YYYY-MM-DD HH:MM:SS")]
    pub until: Option<String>,

    /// Don't request HD sources of videos (fewer requests, notably faster).
    #[arg(long)]
    pub sd: bool,

    /// Directory to save files.
    #[arg(short = 'd', long = "dir")]
    pub directory: Option<PathBuf>,

    /// Filename to save the post to (generated by default).
    #[arg(long, conflicts_with = "profile")]
    pub to: Option<String>,

    /// Download only posts smaller than this many MB.
    #[arg(long, value_name = "MB")]
    pub max_size: Option<u64>,

    /// Retries per item if something goes wrong [default: 3].
    #[arg(long)]
    pub retries: Option<u32>,

    /// Print post info as JSON instead of downloading.
    #[arg(long)]
    pub json: bool,

    /// Log debug info, including raw API responses.
    #[arg(long)]
    pub debug: bool,

    /// Print only errors.
    #[arg(long, short)]
    pub quiet: bool,

    /// Keep downloading a profile when a post fails.
    #[arg(long)]
    pub ignore: bool,

    /// Allow downloads to run concurrently.
    #[arg(long)]
    pub no_sync: bool,

    /// Check downloaded files with ffprobe.
    #[arg(long)]
    pub validate: bool,

    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// tikwm API base URL.
    #[arg(long, env = "TIKWM_API_URL")]
    pub api_url: Option<String>,
}

impl Args {
    pub fn mode(&self) -> RunMode {
        if self.info {
            RunMode::Info
        } else if self.profile {
            RunMode::Profile
        } else {
            RunMode::Post
        }
    }

    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }

        if self.debug {
            config.api.debug = true;
        }

        if let Some(dir) = &self.directory {
            config.download.directory = Some(dir.clone());
        }

        if let Some(to) = &self.to {
            config.download.filename = Some(sanitize_filename(to)?);
        }

        if let Some(retries) = self.retries {
            config.download.retries = retries;
        }

        // Boolean flags (only override if set to non-default)
        if self.sd {
            config.download.quality = Quality::Sd;
        }

        if self.no_sync {
            config.download.no_sync = true;
        }

        if self.validate {
            config.download.validate = ValidateMode::Ffprobe;
        }

        if let Some(until) = &self.until {
            parse_until(until)?;
            config.profile.until = until.clone();
        }

        if let Some(max_size) = self.max_size {
            config.profile.max_size_mb = max_size;
        }

        if self.ignore {
            config.profile.ignore_errors = true;
        }

        Ok(())
    }
}
