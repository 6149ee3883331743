//! Enumeration of a user's posts.
//!
//! [`enumerate`] spawns a producer task that walks the `user/posts` cursor
//! and hands posts over a capacity-1 channel. The producer runs at most one
//! post ahead of the consumer and stops as soon as the [`Feed`] is dropped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::api::types::Post;
use crate::api::{ContentApi, MAX_FEED_PAGE_SIZE};
use crate::config::{parse_user_input, Quality, UserRef};
use crate::error::{Error, Result};

pub type PostPredicate = Arc<dyn Fn(&Post) -> bool + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&Error) -> FeedControl + Send + Sync>;

/// Decision of the error handler for a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedControl {
    /// End the feed with the error as its last item.
    Abort,
    /// Wait and repeat the same call.
    Retry,
}

/// Options for [`enumerate`].
#[derive(Clone)]
pub struct FeedOptions {
    while_: PostPredicate,
    filter: PostPredicate,
    quality: Quality,
    on_error: ErrorHandler,
    page_size: u32,
    retry_delay: Duration,
    max_page_retries: u32,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            while_: Arc::new(|_| true),
            filter: Arc::new(|_| true),
            quality: Quality::default(),
            on_error: Arc::new(|_| FeedControl::Abort),
            page_size: MAX_FEED_PAGE_SIZE,
            retry_delay: Duration::from_secs(15),
            max_page_retries: 3,
        }
    }
}

impl FeedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep going while this holds; the first post failing it ends the feed.
    pub fn while_<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Post) -> bool + Send + Sync + 'static,
    {
        self.while_ = Arc::new(predicate);
        self
    }

    /// Skip posts failing this predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Post) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(predicate);
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error) -> FeedControl + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }

    /// Posts per page, capped at [`MAX_FEED_PAGE_SIZE`].
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_FEED_PAGE_SIZE);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Consecutive [`FeedControl::Retry`] decisions honoured per call.
    pub fn max_page_retries(mut self, retries: u32) -> Self {
        self.max_page_retries = retries;
        self
    }
}

impl fmt::Debug for FeedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedOptions")
            .field("quality", &self.quality)
            .field("page_size", &self.page_size)
            .field("retry_delay", &self.retry_delay)
            .field("max_page_retries", &self.max_page_retries)
            .finish_non_exhaustive()
    }
}

/// Continue while the post was created at or after `cutoff`.
pub fn while_after(cutoff: DateTime<Utc>) -> impl Fn(&Post) -> bool + Send + Sync + 'static {
    let cutoff = cutoff.timestamp();
    move |post| post.create_time >= cutoff
}

/// Accept posts smaller than `bytes`.
pub fn max_size(bytes: u64) -> impl Fn(&Post) -> bool + Send + Sync + 'static {
    move |post| post.size < bytes
}

/// A running enumeration.
pub struct Feed {
    rx: mpsc::Receiver<Result<Post>>,
    expected_count: u64,
    count_is_total: bool,
    producer: JoinHandle<()>,
}

impl Feed {
    /// Expected number of posts, for progress display.
    ///
    /// For a handle this is the post count of the user's profile. Otherwise,
    /// or when the profile has no count, it is the size of the first page
    /// and only a lower bound (see [`Feed::count_is_total`]). Filtering and
    /// early termination mean the feed may yield fewer.
    pub fn expected_count(&self) -> u64 {
        self.expected_count
    }

    /// Whether [`Feed::expected_count`] is the profile's post count rather
    /// than the first page's size.
    pub fn count_is_total(&self) -> bool {
        self.count_is_total
    }

    /// Next post, `None` once the feed is exhausted.
    pub async fn next(&mut self) -> Option<Result<Post>> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Post>> {
        futures::stream::unfold(self, |mut feed| async move {
            feed.next().await.map(|item| (item, feed))
        })
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

/// Start enumerating the posts of `user` (handle, `@handle`, profile URL or numeric id).
///
/// Returns once the expected count is known; posts then arrive through [`Feed::next`].
pub async fn enumerate(api: Arc<dyn ContentApi>, user: &str, options: FeedOptions) -> Result<Feed> {
    let user = parse_user_input(user)?;
    let (tx, rx) = mpsc::channel(1);
    let (count_tx, count_rx) = oneshot::channel();

    let producer = Producer {
        api,
        user,
        options,
        tx,
    };
    let producer = tokio::spawn(producer.run(count_tx));

    let (expected_count, count_is_total) = count_rx.await.unwrap_or((0, false));

    Ok(Feed {
        rx,
        expected_count,
        count_is_total,
        producer,
    })
}

struct Producer {
    api: Arc<dyn ContentApi>,
    user: UserRef,
    options: FeedOptions,
    tx: mpsc::Sender<Result<Post>>,
}

impl Producer {
    async fn run(self, count_tx: oneshot::Sender<(u64, bool)>) {
        let mut count_tx = Some(count_tx);
        let hint = self.count_hint().await;
        let mut cursor = "0".to_string();
        let mut page_number = 0u32;

        loop {
            page_number += 1;
            let page = match self
                .call(|| {
                    self.api
                        .get_user_feed(&self.user, self.options.page_size, &cursor)
                })
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    if let Some(tx) = count_tx.take() {
                        let _ = tx.send((hint.unwrap_or(0), hint.is_some()));
                    }
                    let _ = self.tx.send(Err(e)).await;
                    return;
                }
            };

            if let Some(tx) = count_tx.take() {
                let count = match hint {
                    Some(total) => (total, true),
                    None => (page.posts.len() as u64, false),
                };
                let _ = tx.send(count);
            }

            tracing::debug!(
                "Page {} of {}: {} post(s), has_more={}",
                page_number,
                self.user.value(),
                page.posts.len(),
                page.has_more
            );

            if page.posts.is_empty() {
                break;
            }

            for post in page.posts {
                if !(self.options.while_)(&post) {
                    tracing::debug!("Stopping feed at post {}", post.id);
                    return;
                }
                if !(self.options.filter)(&post) {
                    tracing::debug!("Skipping post {}", post.id);
                    continue;
                }

                let post = match self.upgrade(post).await {
                    Ok(post) => post,
                    Err(e) => {
                        let _ = self.tx.send(Err(e)).await;
                        return;
                    }
                };

                if self.tx.send(Ok(post)).await.is_err() {
                    tracing::debug!("Feed consumer went away");
                    return;
                }
            }

            if !page.has_more {
                break;
            }
            cursor = page.cursor;
        }
    }

    /// Post count from the user's profile, when the feed is keyed by handle.
    async fn count_hint(&self) -> Option<u64> {
        let UserRef::Handle(handle) = &self.user else {
            return None;
        };

        match self.api.get_user_detail(handle).await {
            Ok(detail) if detail.stats.video_count > 0 => Some(detail.stats.video_count),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("No post count for {}: {}", handle, e);
                None
            }
        }
    }

    /// Feed entries carry SD links only; resolve videos again for HD.
    async fn upgrade(&self, post: Post) -> Result<Post> {
        if !self.options.quality.is_hd() || !post.is_video() || !post.hdplay.is_empty() {
            return Ok(post);
        }

        self.call(|| self.api.get_post(&post.id, Quality::Hd)).await
    }

    /// Run an upstream call, consulting the error handler on failure.
    async fn call<T, F, Fut>(&self, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;

        loop {
            let error = match request().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match (self.options.on_error)(&error) {
                FeedControl::Retry if retries < self.options.max_page_retries => {
                    retries += 1;
                    tracing::warn!(
                        "Feed request failed, retrying in {:?} ({}/{}): {}",
                        self.options.retry_delay,
                        retries,
                        self.options.max_page_retries,
                        error
                    );
                    sleep(self.options.retry_delay).await;
                }
                _ => return Err(error),
            }
        }
    }
}
