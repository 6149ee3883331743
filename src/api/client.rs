//! tikwm API HTTP client.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::api::throttle::RequestThrottle;
use crate::api::types::*;
use crate::api::ContentApi;
use crate::config::{Config, Quality, UserRef};
use crate::error::{Error, Result};

/// Largest page the `user/posts` endpoint serves.
pub const MAX_FEED_PAGE_SIZE: u32 = 33;

/// Query parameters of a call, kept sorted so diagnostics are stable.
pub type Query = BTreeMap<String, String>;

/// Rate-limited tikwm API client.
pub struct TikwmApi {
    client: Client,
    base_url: String,
    throttle: Arc<RequestThrottle>,
    debug: bool,
}

impl TikwmApi {
    /// Create a new API client sharing the given throttle.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        throttle: Arc<RequestThrottle>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            throttle,
            debug: false,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let throttle = Arc::new(RequestThrottle::new(config.request_spacing()));
        let api = Self::new(
            config.api.base_url.clone(),
            &config.api.user_agent,
            config.request_timeout(),
            throttle,
        )?;
        Ok(api.with_debug(config.api.debug))
    }

    /// Mirror raw response bodies to the debug log.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Make a throttled GET request and return the raw body.
    async fn raw(&self, method: &str, query: &Query) -> Result<String> {
        let url = format!("{}/{}", self.base_url, method);

        self.throttle
            .run(async {
                tracing::debug!("GET {} {:?}", url, query);

                let response = self
                    .client
                    .get(&url)
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| Error::Transport(format!("GET {}: {}", url, e)))?;

                tracing::debug!("Response status: {}", response.status());

                response
                    .text()
                    .await
                    .map_err(|e| Error::Transport(format!("Reading body of {}: {}", url, e)))
            })
            .await
    }

    /// Call an API method and decode the response envelope.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, query: Query) -> Result<T> {
        let text = self.raw(method, &query).await?;

        if self.debug {
            tracing::debug!(target: "tikwm::raw", "{}", text);
        }

        decode_envelope(method, &query, &text)
    }

    /// Resolve a post by URL or numeric id.
    pub async fn get_post(&self, url_or_id: &str, quality: Quality) -> Result<Post> {
        let mut query = Query::new();
        query.insert("url".to_string(), url_or_id.to_string());
        if quality.is_hd() {
            query.insert("hd".to_string(), "1".to_string());
        }

        let post: Post = self.call("", query).await?;

        if post.content_urls(quality).is_empty() {
            return Err(Error::Decode(format!(
                "Post {} has no downloadable content",
                post.id
            )));
        }

        Ok(post)
    }

    /// Fetch one page of a user's posts.
    pub async fn get_user_feed(&self, user: &UserRef, count: u32, cursor: &str) -> Result<FeedPage> {
        let mut query = Query::new();
        query.insert(user.query_key().to_string(), user.value().to_string());
        query.insert("count".to_string(), count.min(MAX_FEED_PAGE_SIZE).to_string());
        query.insert("cursor".to_string(), cursor.to_string());

        self.call("user/posts", query).await
    }

    /// Get a user's profile and counters.
    pub async fn get_user_detail(&self, handle: &str) -> Result<UserDetail> {
        let mut query = Query::new();
        query.insert(
            "unique_id".to_string(),
            handle.trim_start_matches('@').to_string(),
        );

        self.call("user/info", query).await
    }
}

#[async_trait]
impl ContentApi for TikwmApi {
    async fn get_post(&self, url_or_id: &str, quality: Quality) -> Result<Post> {
        TikwmApi::get_post(self, url_or_id, quality).await
    }

    async fn get_user_feed(&self, user: &UserRef, count: u32, cursor: &str) -> Result<FeedPage> {
        TikwmApi::get_user_feed(self, user, count, cursor).await
    }

    async fn get_user_detail(&self, handle: &str) -> Result<UserDetail> {
        TikwmApi::get_user_detail(self, handle).await
    }
}

/// Decode `{code, msg, processed_time, data}`; a non-zero code is an upstream error.
fn decode_envelope<T: DeserializeOwned>(method: &str, query: &Query, text: &str) -> Result<T> {
    let envelope: ApiResponse<T> = serde_json::from_str(text).map_err(|e| {
        let preview: String = text.chars().take(500).collect();
        Error::Decode(format!("{} - Response: {}", e, preview))
    })?;

    if envelope.code != 0 {
        let query = serde_json::to_string(query).unwrap_or_else(|_| "???".to_string());
        return Err(Error::Upstream {
            code: envelope.code,
            message: envelope.msg,
            method: method.to_string(),
            query,
        });
    }

    tracing::debug!("{} processed in {:.3}s", method, envelope.processed_time);

    envelope
        .data
        .ok_or_else(|| Error::Decode(format!("Response to '{}' has no data", method)))
}
