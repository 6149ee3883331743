//! Media file transport.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::loader::DEFAULT_USER_AGENT;
use crate::error::{Error, Result};
use crate::output::progress::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches one URL into one local file.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write the body of `url` to `path`, replacing anything already there.
    async fn fetch(&self, url: &str, path: &Path) -> Result<()>;
}

/// Streaming HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    show_progress: bool,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            show_progress: false,
        })
    }

    /// Draw a progress bar for large files.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT).unwrap_or_else(|_| Self {
            client: Client::default(),
            show_progress: false,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, path: &Path) -> Result<()> {
        tracing::debug!("Fetching {} -> {}", url, path.display());

        // reqwest errors carry the URL.
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("GET {}: HTTP {}", url, status)));
        }

        let content_length = response.content_length();
        let progress = match content_length {
            Some(total) if self.show_progress && total > PROGRESS_THRESHOLD => {
                Some(create_download_bar(total))
            }
            _ => None,
        };

        // Stream to file
        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref pb) = progress {
                pb.set_position(downloaded);
            }
        }

        file.flush().await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if let Some(expected) = content_length {
            if downloaded != expected {
                return Err(Error::Transport(format!(
                    "GET {}: body truncated ({} of {} bytes)",
                    url, downloaded, expected
                )));
            }
        }

        Ok(())
    }
}
