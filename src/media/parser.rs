//! Content URL selection.

use crate::api::types::Post;
use crate::config::Quality;

/// Select the download URLs of a post.
///
/// A video yields exactly one URL: `hdplay` when HD is requested and the
/// upstream provided it, `play` otherwise. A gallery yields one URL per image
/// in upstream order. Empty entries are dropped.
pub fn content_urls(post: &Post, quality: Quality) -> Vec<String> {
    if !post.is_video() {
        return post
            .images
            .iter()
            .filter(|url| !url.is_empty())
            .cloned()
            .collect();
    }

    let url = match quality {
        Quality::Hd if !post.hdplay.is_empty() => &post.hdplay,
        _ => &post.play,
    };

    if url.is_empty() {
        Vec::new()
    } else {
        vec![url.clone()]
    }
}
