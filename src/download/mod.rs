//! Download module for content downloading.
//!
//! This module provides:
//! - Feed enumeration of a user's posts
//! - Post downloading with retry, cleanup and fallback
//! - The single-flight download gate
//! - Pluggable transport and validation
//! - Download statistics

pub mod fallback;
pub mod feed;
pub mod gate;
pub mod options;
pub mod post;
pub mod state;
pub mod transport;
pub mod validate;

#[cfg(test)]
pub(crate) mod stubs;

pub use fallback::{Fallback, FallbackStrategy};
pub use feed::{enumerate, max_size, while_after, Feed, FeedControl, FeedOptions};
pub use gate::DownloadGate;
pub use options::{DownloadConfig, DownloadConfigBuilder, FilenameFormat};
pub use post::Downloader;
pub use state::{GlobalState, ProfileState};
pub use transport::{HttpTransport, Transport};
pub use validate::{AcceptAll, FfprobeValidator, Validator};
