//! API response type definitions.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Quality;
use crate::media::{content_urls, MediaType};

/// Generic API response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub processed_time: f64,
    pub data: Option<T>,
}

/// Post author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: String,
    pub unique_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
}

/// Background music of a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub play: String,
    #[serde(default)]
    pub author: String,
}

/// A single post: a video or an image gallery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub duration: u64,

    /// SD video without watermark.
    #[serde(default)]
    pub play: String,
    #[serde(default)]
    pub wmplay: String,
    /// HD video, only present when requested with `hd=1`.
    #[serde(default)]
    pub hdplay: String,

    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub wm_size: u64,
    #[serde(default)]
    pub hd_size: u64,

    /// Gallery images, empty for videos.
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub music_info: Option<MusicInfo>,

    #[serde(default)]
    pub play_count: u64,
    #[serde(default)]
    pub digg_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub download_count: u64,

    /// Unix timestamp in seconds.
    #[serde(default)]
    pub create_time: i64,

    #[serde(default)]
    pub author: Author,
}

impl Post {
    pub fn is_video(&self) -> bool {
        self.images.is_empty()
    }

    pub fn media_type(&self) -> MediaType {
        if self.is_video() {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    /// Download URLs in item order for the given quality.
    pub fn content_urls(&self, quality: Quality) -> Vec<String> {
        content_urls(self, quality)
    }
}

/// One page of `user/posts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPage {
    #[serde(default, deserialize_with = "deserialize_cursor")]
    pub cursor: String,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
    #[serde(default, rename = "videos")]
    pub posts: Vec<Post>,
}

/// `user/info` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(default)]
    pub user: UserInfo,
    #[serde(default)]
    pub stats: UserStats,
}

/// Profile of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar_thumb: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub verified: bool,
    /// Fields not modelled above, kept for JSON output.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Counters of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub heart_count: u64,
    #[serde(default)]
    pub video_count: u64,
    #[serde(default)]
    pub digg_count: u64,
}

/// The upstream sends the cursor as a string or a number depending on endpoint version.
fn deserialize_cursor<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCursor {
        Text(String),
        Number(i64),
        Null,
    }

    Ok(match RawCursor::deserialize(deserializer)? {
        RawCursor::Text(s) => s,
        RawCursor::Number(n) => n.to_string(),
        RawCursor::Null => String::new(),
    })
}
