//! tikwm API module.
//!
//! This module provides:
//! - Rate-limited HTTP client for the tikwm REST API
//! - Request throttling shared by every upstream call
//! - API response types
//! - The [`ContentApi`] seam used by the feed and download layers

pub mod client;
pub mod throttle;
pub mod types;

use async_trait::async_trait;

use crate::config::{Quality, UserRef};
use crate::error::Result;

pub use client::{Query, TikwmApi, MAX_FEED_PAGE_SIZE};
pub use throttle::RequestThrottle;
pub use types::*;

/// Upstream operations the feed and download layers depend on.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Resolve a post by URL or numeric id.
    async fn get_post(&self, url_or_id: &str, quality: Quality) -> Result<Post>;

    /// Fetch one page of a user's posts.
    async fn get_user_feed(&self, user: &UserRef, count: u32, cursor: &str) -> Result<FeedPage>;

    /// Get a user's profile and counters.
    async fn get_user_detail(&self, handle: &str) -> Result<UserDetail>;
}
