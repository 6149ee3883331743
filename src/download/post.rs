//! Downloading the items of a single post.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::sleep;

use crate::api::types::Post;
use crate::api::ContentApi;
use crate::download::gate::DownloadGate;
use crate::download::options::DownloadConfig;
use crate::error::{Error, Result};
use crate::fs::destination_path;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Downloads posts with retry, cleanup and fallback.
#[derive(Clone)]
pub struct Downloader {
    api: Arc<dyn ContentApi>,
    gate: Arc<DownloadGate>,
}

impl Downloader {
    pub fn new(api: Arc<dyn ContentApi>, gate: Arc<DownloadGate>) -> Self {
        Self { api, gate }
    }

    pub fn api(&self) -> &Arc<dyn ContentApi> {
        &self.api
    }

    /// Resolve `input` (URL or id) at the configured quality and download it.
    pub async fn resolve_and_download(
        &self,
        input: &str,
        config: &DownloadConfig,
    ) -> Result<(Post, Vec<PathBuf>)> {
        let post = self.api.get_post(input, config.quality()).await?;
        let files = self.download(&post, config).await?;
        Ok((post, files))
    }

    /// Download every item of `post`.
    ///
    /// Returns the written paths in item order. On failure, files written by
    /// this call are removed and the configured fallback gets one chance.
    pub async fn download(&self, post: &Post, config: &DownloadConfig) -> Result<Vec<PathBuf>> {
        let _guard = if config.no_sync() {
            None
        } else {
            Some(self.gate.acquire().await)
        };

        let item_count = post.content_urls(config.quality()).len();
        if item_count == 0 {
            return Err(Error::Decode(format!(
                "Post {} has no downloadable content",
                post.id
            )));
        }

        tracing::debug!(
            "Downloading post {} ({} {} item(s))",
            post.id,
            item_count,
            post.media_type().label()
        );

        let mut post = post.clone();
        let mut files = Vec::with_capacity(item_count);

        for index in 0..item_count {
            if index > 0 {
                sleep(config.inter_item_delay()).await;
            }

            let path = destination_path(config, &post, index);

            match self.download_item(&mut post, index, &path, config).await {
                Ok(()) => {
                    tracing::debug!("Saved {}", path.display());
                    files.push(path);
                }
                Err(error) => {
                    remove_files(files.iter().chain(std::iter::once(&path))).await;
                    return config
                        .fallback()
                        .apply(self, &post, &config.for_fallback(), error)
                        .await;
                }
            }
        }

        Ok(files)
    }

    /// Boxed [`download`](Self::download) for calls from inside a fallback.
    pub(crate) fn download_boxed<'a>(
        &'a self,
        post: &'a Post,
        config: &'a DownloadConfig,
    ) -> BoxFuture<'a, Result<Vec<PathBuf>>> {
        Box::pin(self.download(post, config))
    }

    /// One item with bounded retries.
    ///
    /// Before each retry the post is re-resolved, since media URLs expire. The
    /// refreshed post replaces `post` for the remaining items.
    async fn download_item(
        &self,
        post: &mut Post,
        index: usize,
        path: &Path,
        config: &DownloadConfig,
    ) -> Result<()> {
        let mut attempts: u32 = 0;

        loop {
            let error = match self.attempt_item(post, index, path, config).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };
            attempts += 1;

            if attempts > config.max_retries() {
                return Err(Error::RetriesExhausted {
                    post_id: post.id.clone(),
                    index,
                    attempts,
                    source: Box::new(error),
                });
            }

            tracing::warn!(
                "Item {} of post {} failed (attempt {}/{}): {}",
                index + 1,
                post.id,
                attempts,
                config.max_retries() + 1,
                error
            );
            sleep(config.retry_delay()).await;

            match self.api.get_post(&post.id, config.quality()).await {
                Ok(fresh) => *post = fresh,
                Err(e) => tracing::warn!("Could not refresh post {}: {}", post.id, e),
            }
        }
    }

    async fn attempt_item(
        &self,
        post: &Post,
        index: usize,
        path: &Path,
        config: &DownloadConfig,
    ) -> Result<()> {
        let url = post
            .content_urls(config.quality())
            .into_iter()
            .nth(index)
            .ok_or_else(|| {
                Error::Decode(format!("Post {} has no item {}", post.id, index + 1))
            })?;

        config.transport().fetch(&url, path).await?;

        if !config.validator().validate(path).await? {
            return Err(Error::Validation(format!(
                "{} did not pass validation",
                path.display()
            )));
        }

        Ok(())
    }
}

async fn remove_files<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::download::fallback::{Fallback, FallbackStrategy};
    use crate::download::stubs::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    const RETRY: Duration = Duration::from_secs(15);
    const GAP: Duration = Duration::from_secs(1);

    fn downloader(api: StubApi) -> (Downloader, Arc<StubApi>) {
        let api = Arc::new(api);
        let downloader = Downloader::new(api.clone(), Arc::new(DownloadGate::new()));
        (downloader, api)
    }

    fn config(dir: &Path, transport: Arc<StubTransport>) -> crate::download::DownloadConfigBuilder {
        DownloadConfig::builder()
            .directory(dir)
            .transport(transport)
            .retry_delay(RETRY)
            .inter_item_delay(GAP)
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_downloads_hd() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, api) = downloader(StubApi::with_post(video("123")));

        let files = downloader
            .download(&video("123"), &config(dir.path(), transport.clone()).build())
            .await
            .unwrap();

        assert_eq!(files, vec![dir.path().join("alice_2022-12-21_123.mp4")]);
        assert_eq!(transport.urls(), vec!["https://cdn.test/123/hd.mp4"]);
        assert!(files[0].exists());
        assert!(api.post_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gallery_items_are_spaced() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, _) = downloader(StubApi::default());
        let start = Instant::now();

        let files = downloader
            .download(&gallery("9", 3), &config(dir.path(), transport).build())
            .await
            .unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "alice_2022-12-21_9_1.jpg",
                "alice_2022-12-21_9_2.jpg",
                "alice_2022-12-21_9_3.jpg"
            ]
        );
        assert_eq!(start.elapsed(), GAP * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false, false, true]));
        let (downloader, api) = downloader(StubApi::with_post(video("123")));
        let start = Instant::now();

        let files = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone()).max_retries(2).build(),
            )
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(start.elapsed(), RETRY * 2);
        assert_eq!(
            api.post_calls(),
            vec![
                ("123".to_string(), Quality::Hd),
                ("123".to_string(), Quality::Hd)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_single_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false]));
        let (downloader, _) = downloader(StubApi::with_post(video("123")));
        let start = Instant::now();

        let err = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone()).max_retries(0).build(),
            )
            .await
            .unwrap_err();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(
            err,
            Error::RetriesExhausted { attempts: 1, index: 0, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_post_used_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false]));
        let mut fresh = video("123");
        fresh.hdplay = "https://cdn.test/123/fresh.mp4".to_string();
        let (downloader, _) = downloader(StubApi::with_post(fresh));

        downloader
            .download(&video("123"), &config(dir.path(), transport.clone()).build())
            .await
            .unwrap();

        assert_eq!(
            transport.urls(),
            vec!["https://cdn.test/123/hd.mp4", "https://cdn.test/123/fresh.mp4"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_current_post() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false]));
        let (downloader, _) = downloader(StubApi::default());

        downloader
            .download(&video("123"), &config(dir.path(), transport.clone()).build())
            .await
            .unwrap();

        assert_eq!(
            transport.urls(),
            vec!["https://cdn.test/123/hd.mp4", "https://cdn.test/123/hd.mp4"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, _) = downloader(StubApi::with_post(video("123")));

        let files = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone())
                    .validator(Arc::new(RejectFirst::new(1)))
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::failing_on("/2.jpg"));
        let (downloader, _) = downloader(StubApi::with_post(gallery("9", 3)));

        let err = downloader
            .download(
                &gallery("9", 3),
                &config(dir.path(), transport.clone()).max_retries(1).build(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RetriesExhausted { index: 2, attempts: 2, .. }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_leaves_other_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let unrelated = dir.path().join("keep.mp4");
        std::fs::write(&unrelated, b"x").unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false]));
        let (downloader, _) = downloader(StubApi::default());

        downloader
            .download(
                &video("123"),
                &config(dir.path(), transport).max_retries(0).build(),
            )
            .await
            .unwrap_err();

        assert!(unrelated.exists());
        assert!(!dir.path().join("alice_2022-12-21_123.mp4").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_downgrade_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::failing_on("hd.mp4"));
        let (downloader, api) = downloader(StubApi::with_post(video("123")));

        let files = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone())
                    .max_retries(1)
                    .fallback(Fallback::DowngradeQuality)
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(files, vec![dir.path().join("alice_2022-12-21_123.mp4")]);
        assert_eq!(
            transport.urls().last().map(String::as_str),
            Some("https://cdn.test/123/sd.mp4")
        );
        assert_eq!(api.post_calls().last().unwrap().1, Quality::Sd);
    }

    #[tokio::test(start_paused = true)]
    async fn test_downgrade_failure_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::failing_on("cdn.test"));
        let (downloader, _) = downloader(StubApi::with_post(video("123")));

        let err = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone())
                    .max_retries(0)
                    .fallback(Fallback::DowngradeQuality)
                    .build(),
            )
            .await
            .unwrap_err();

        match err {
            Error::FallbackExhausted { post_id, source } => {
                assert_eq!(post_id, "123");
                assert!(matches!(*source, Error::RetriesExhausted { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        // One HD attempt and one SD attempt, no further fallback.
        assert_eq!(transport.call_count(), 2);
    }

    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
        seen: Mutex<Vec<(bool, bool)>>,
    }

    #[async_trait]
    impl FallbackStrategy for Recording {
        async fn recover(
            &self,
            _downloader: &Downloader,
            _post: &Post,
            config: &DownloadConfig,
            error: Error,
        ) -> Result<Vec<PathBuf>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                matches!(config.fallback(), Fallback::None),
                config.no_sync(),
            ));
            Err(error)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_fallback_invoked_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::scripted(&[false, false, false]));
        let strategy = Arc::new(Recording::default());
        let (downloader, _) = downloader(StubApi::with_post(video("123")));

        let err = downloader
            .download(
                &video("123"),
                &config(dir.path(), transport.clone())
                    .fallback(Fallback::Custom(strategy.clone()))
                    .build(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(strategy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*strategy.seen.lock().unwrap(), vec![(true, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_filename_for_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, _) = downloader(StubApi::default());

        let files = downloader
            .download(
                &gallery("9", 2),
                &config(dir.path(), transport).filename("set.jpg").build(),
            )
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("set.jpg"), dir.path().join("set_2.jpg")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_without_content() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, _) = downloader(StubApi::default());
        let empty = Post {
            id: "1".to_string(),
            ..Default::default()
        };

        let err = downloader
            .download(&empty, &config(dir.path(), transport.clone()).build())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_serializes_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::slow(Duration::from_secs(2)));
        let (downloader, _) = downloader(StubApi::default());
        let config = config(dir.path(), transport.clone()).build();
        let start = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|i| {
                let downloader = downloader.clone();
                let config = config.clone();
                tokio::spawn(async move { downloader.download(&video(&i.to_string()), &config).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(transport.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sync_allows_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::slow(Duration::from_secs(2)));
        let (downloader, _) = downloader(StubApi::default());
        let config = config(dir.path(), transport.clone()).no_sync(true).build();

        let tasks: Vec<_> = (0..3)
            .map(|i| {
                let downloader = downloader.clone();
                let config = config.clone();
                tokio::spawn(async move { downloader.download(&video(&i.to_string()), &config).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(transport.max_active.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(StubTransport::default());
        let (downloader, api) = downloader(StubApi::with_post(video("77")));

        let (post, files) = downloader
            .resolve_and_download(
                "https://www.tiktok.com/@alice/video/77",
                &config(dir.path(), transport).quality(Quality::Sd).build(),
            )
            .await
            .unwrap();

        assert_eq!(post.id, "77");
        assert_eq!(files.len(), 1);
        assert_eq!(api.post_calls()[0].1, Quality::Sd);
    }
}
