//! Download statistics.

use crate::api::types::Post;
use crate::media::MediaType;

/// Per-profile download state.
#[derive(Debug, Default)]
pub struct ProfileState {
    pub user: String,

    /// Post count announced by the feed.
    pub expected_count: u64,

    // Statistics
    pub posts_seen: u64,
    pub videos: u64,
    pub galleries: u64,
    pub files: u64,
    pub failed_posts: Vec<String>,
}

impl ProfileState {
    pub fn new(user: impl Into<String>, expected_count: u64) -> Self {
        Self {
            user: user.into(),
            expected_count,
            ..Default::default()
        }
    }

    /// Count a post taken from the feed. Returns its 1-based position.
    pub fn next_post(&mut self) -> u64 {
        self.posts_seen += 1;
        self.posts_seen
    }

    pub fn record_download(&mut self, post: &Post, files: usize) {
        match post.media_type() {
            MediaType::Video => self.videos += 1,
            MediaType::Image => self.galleries += 1,
        }
        self.files += files as u64;
    }

    pub fn record_failure(&mut self, post_id: &str) {
        self.failed_posts.push(post_id.to_string());
    }

    /// Posts downloaded successfully.
    pub fn total_downloaded(&self) -> u64 {
        self.videos + self.galleries
    }
}

/// Statistics across all inputs of one run.
#[derive(Debug, Default)]
pub struct GlobalState {
    pub videos: u64,
    pub galleries: u64,
    pub files: u64,
    pub posts_failed: u64,
    pub inputs_processed: u64,
    pub inputs_failed: u64,
}

impl GlobalState {
    /// Add statistics from a finished profile.
    pub fn add_profile_stats(&mut self, state: &ProfileState) {
        self.videos += state.videos;
        self.galleries += state.galleries;
        self.files += state.files;
        self.posts_failed += state.failed_posts.len() as u64;
        self.inputs_processed += 1;
    }

    /// Record a single post downloaded outside of a profile.
    pub fn add_post(&mut self, post: &Post, files: usize) {
        match post.media_type() {
            MediaType::Video => self.videos += 1,
            MediaType::Image => self.galleries += 1,
        }
        self.files += files as u64;
        self.inputs_processed += 1;
    }

    /// Mark an input (post or profile) as failed.
    pub fn mark_input_failed(&mut self) {
        self.inputs_failed += 1;
    }

    pub fn total_downloaded(&self) -> u64 {
        self.videos + self.galleries
    }
}
