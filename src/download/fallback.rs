//! What to do when a post cannot be downloaded.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::types::Post;
use crate::config::Quality;
use crate::download::options::DownloadConfig;
use crate::download::post::Downloader;
use crate::error::{Error, Result};

/// Custom recovery for a failed post.
///
/// Called at most once per `download` call, after the files of the failed
/// attempt are removed. `config` has the fallback cleared and the gate
/// bypassed, since the caller still holds it.
#[async_trait]
pub trait FallbackStrategy: Send + Sync {
    async fn recover(
        &self,
        downloader: &Downloader,
        post: &Post,
        config: &DownloadConfig,
        error: Error,
    ) -> Result<Vec<PathBuf>>;
}

/// Fallback policy of a download.
#[derive(Clone, Default)]
pub enum Fallback {
    /// Return the failure as is.
    #[default]
    None,
    /// Re-resolve the post in SD and download that.
    DowngradeQuality,
    Custom(Arc<dyn FallbackStrategy>),
}

impl Fallback {
    pub(crate) async fn apply(
        &self,
        downloader: &Downloader,
        post: &Post,
        config: &DownloadConfig,
        error: Error,
    ) -> Result<Vec<PathBuf>> {
        match self {
            Fallback::None => Err(error),
            Fallback::DowngradeQuality => downgrade_quality(downloader, post, config, error).await,
            Fallback::Custom(strategy) => strategy.recover(downloader, post, config, error).await,
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::None => f.write_str("None"),
            Fallback::DowngradeQuality => f.write_str("DowngradeQuality"),
            Fallback::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

async fn downgrade_quality(
    downloader: &Downloader,
    post: &Post,
    config: &DownloadConfig,
    error: Error,
) -> Result<Vec<PathBuf>> {
    tracing::warn!("Post {} failed ({}), falling back to SD", post.id, error);

    let wrap = |source: Error| Error::FallbackExhausted {
        post_id: post.id.clone(),
        source: Box::new(source),
    };

    let sd = downloader
        .api()
        .get_post(&post.id, Quality::Sd)
        .await
        .map_err(wrap)?;

    downloader
        .download_boxed(&sd, &config.with_quality(Quality::Sd))
        .await
        .map_err(wrap)
}
