//! tikwm-downloader - post and profile downloader for the tikwm API
//!
//! This library provides a rate-limited client for the tikwm REST API and the
//! machinery to download videos and image galleries from it.
//!
//! # Features
//!
//! - Resolve single posts by URL or id, in HD or SD
//! - Enumerate a user's posts through a cursor-driven feed
//! - Bounded retries with post re-resolution and cleanup on failure
//! - Fallback to SD when an HD download cannot be completed
//! - Optional ffprobe validation of downloaded files
//! - Process-wide request spacing and single-flight downloads
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tikwm_downloader::{Config, DownloadConfig, DownloadGate, Downloader, TikwmApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let api = Arc::new(TikwmApi::from_config(&config)?);
//!     let downloader = Downloader::new(api, Arc::new(DownloadGate::new()));
//!
//!     let (post, files) = downloader
//!         .resolve_and_download("https://www.tiktok.com/@alice/video/123", &DownloadConfig::from_config(&config)?)
//!         .await?;
//!     println!("{} -> {:?}", post.id, files);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

// Re-exports for convenience
pub use api::{ContentApi, Post, TikwmApi};
pub use config::{Config, Quality};
pub use download::{
    enumerate, DownloadConfig, DownloadGate, Downloader, Fallback, Feed, FeedOptions,
};
pub use error::{Error, Result};
pub use media::MediaType;
