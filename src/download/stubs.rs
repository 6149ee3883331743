//! In-memory stand-ins for the upstream API and the transport.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::types::{Author, FeedPage, Post, UserDetail};
use crate::api::ContentApi;
use crate::config::{Quality, UserRef};
use crate::download::transport::Transport;
use crate::download::validate::Validator;
use crate::error::{Error, Result};

// 2022-12-21T00:00:00Z
pub const CREATED: i64 = 1_671_580_800;

pub fn video(id: &str) -> Post {
    Post {
        id: id.to_string(),
        create_time: CREATED,
        author: Author {
            unique_id: "alice".to_string(),
            ..Default::default()
        },
        play: format!("https://cdn.test/{}/sd.mp4", id),
        hdplay: format!("https://cdn.test/{}/hd.mp4", id),
        ..Default::default()
    }
}

pub fn gallery(id: &str, images: usize) -> Post {
    Post {
        images: (0..images)
            .map(|i| format!("https://cdn.test/{}/{}.jpg", id, i))
            .collect(),
        play: String::new(),
        hdplay: String::new(),
        ..video(id)
    }
}

pub fn upstream_error(code: i64) -> Error {
    Error::Upstream {
        code,
        message: "stub".to_string(),
        method: "stub".to_string(),
        query: String::new(),
    }
}

/// Scripted [`ContentApi`].
#[derive(Default)]
pub struct StubApi {
    pub hd: Option<Post>,
    pub sd: Option<Post>,
    pub detail: Option<UserDetail>,
    pages: Mutex<VecDeque<Result<FeedPage>>>,
    pub post_calls: Mutex<Vec<(String, Quality)>>,
    pub feed_calls: Mutex<Vec<(String, u32, String)>>,
}

impl StubApi {
    pub fn with_post(post: Post) -> Self {
        Self {
            hd: Some(post.clone()),
            sd: Some(Post {
                hdplay: String::new(),
                ..post
            }),
            ..Default::default()
        }
    }

    pub fn with_pages(pages: Vec<Result<FeedPage>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Default::default()
        }
    }

    pub fn post_calls(&self) -> Vec<(String, Quality)> {
        self.post_calls.lock().unwrap().clone()
    }

    pub fn feed_cursors(&self) -> Vec<String> {
        self.feed_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, cursor)| cursor.clone())
            .collect()
    }
}

#[async_trait]
impl ContentApi for StubApi {
    async fn get_post(&self, url_or_id: &str, quality: Quality) -> Result<Post> {
        self.post_calls
            .lock()
            .unwrap()
            .push((url_or_id.to_string(), quality));

        let post = match quality {
            Quality::Hd => self.hd.clone(),
            Quality::Sd => self.sd.clone(),
        };
        post.ok_or_else(|| upstream_error(-1))
    }

    async fn get_user_feed(&self, user: &UserRef, count: u32, cursor: &str) -> Result<FeedPage> {
        self.feed_calls
            .lock()
            .unwrap()
            .push((user.value().to_string(), count, cursor.to_string()));

        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FeedPage::default()))
    }

    async fn get_user_detail(&self, _handle: &str) -> Result<UserDetail> {
        self.detail.clone().ok_or_else(|| upstream_error(-1))
    }
}

/// Transport that writes the URL into the file, failing on scripted calls.
#[derive(Default)]
pub struct StubTransport {
    /// `false` entries fail the corresponding call; calls past the end succeed.
    outcomes: Mutex<VecDeque<bool>>,
    /// Fail every call for URLs containing this marker.
    fail_marker: Option<String>,
    delay: Duration,
    pub calls: Mutex<Vec<(String, PathBuf)>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl StubTransport {
    pub fn scripted(outcomes: &[bool]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, url: &str, path: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        // Partial file either way, so cleanup has something to remove.
        tokio::fs::write(path, url.as_bytes()).await?;

        let scripted = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
        let marked = self
            .fail_marker
            .as_deref()
            .map(|marker| url.contains(marker))
            .unwrap_or(false);

        if scripted && !marked {
            Ok(())
        } else {
            Err(Error::Transport(format!("GET {}: connection reset", url)))
        }
    }
}

/// Validator that rejects the first `rejections` files it sees.
#[derive(Default)]
pub struct RejectFirst {
    rejections: AtomicUsize,
}

impl RejectFirst {
    pub fn new(rejections: usize) -> Self {
        Self {
            rejections: AtomicUsize::new(rejections),
        }
    }
}

#[async_trait]
impl Validator for RejectFirst {
    async fn validate(&self, _path: &Path) -> Result<bool> {
        let remaining = self.rejections.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(true);
        }
        self.rejections.store(remaining - 1, Ordering::SeqCst);
        Ok(false)
    }
}
