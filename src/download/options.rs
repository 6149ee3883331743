//! Per-call download configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::types::Post;
use crate::config::{Config, FallbackMode, Quality, ValidateMode};
use crate::download::fallback::Fallback;
use crate::download::transport::{HttpTransport, Transport};
use crate::download::validate::{AcceptAll, FfprobeValidator, Validator};
use crate::error::{Error, Result};
use crate::fs::format_filename;

/// Builds the filename for item `index` of a post.
pub type FilenameFormat = Arc<dyn Fn(&Post, usize) -> String + Send + Sync>;

/// Immutable settings for one `download` call.
///
/// Build with [`DownloadConfig::builder`]; anything left unset gets its default.
#[derive(Clone)]
pub struct DownloadConfig {
    directory: PathBuf,
    filename: Option<String>,
    filename_format: FilenameFormat,
    transport: Arc<dyn Transport>,
    validator: Arc<dyn Validator>,
    fallback: Fallback,
    inter_item_delay: Duration,
    retry_delay: Duration,
    max_retries: u32,
    quality: Quality,
    no_sync: bool,
}

impl DownloadConfig {
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder::default()
    }

    /// Build the download settings described by the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let options = &config.download;

        let transport = HttpTransport::new(&config.api.user_agent)?.with_progress(true);

        let validator: Arc<dyn Validator> = match options.validate {
            ValidateMode::None => Arc::new(AcceptAll),
            ValidateMode::Ffprobe => {
                let ffprobe = match &options.ffprobe_path {
                    Some(path) => FfprobeValidator::new(path.clone()),
                    None => FfprobeValidator::from_path().ok_or_else(|| {
                        Error::Config("ffprobe validation requested but ffprobe is not on PATH".into())
                    })?,
                };
                Arc::new(ffprobe)
            }
        };

        let fallback = match options.fallback {
            FallbackMode::None => Fallback::None,
            FallbackMode::Sd => Fallback::DowngradeQuality,
        };

        let mut builder = Self::builder()
            .directory(config.download_directory())
            .transport(Arc::new(transport))
            .validator(validator)
            .fallback(fallback)
            .inter_item_delay(Duration::from_millis(options.inter_item_delay_ms))
            .retry_delay(Duration::from_millis(options.retry_delay_ms))
            .max_retries(options.retries)
            .quality(options.quality)
            .no_sync(options.no_sync);

        if let Some(filename) = &options.filename {
            builder = builder.filename(filename.clone());
        }

        Ok(builder.build())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Generated filename for item `index` of `post`.
    pub fn format_filename(&self, post: &Post, index: usize) -> String {
        (self.filename_format)(post, index)
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }

    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    pub fn inter_item_delay(&self) -> Duration {
        self.inter_item_delay
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn no_sync(&self) -> bool {
        self.no_sync
    }

    /// Copy with a different quality.
    pub fn with_quality(&self, quality: Quality) -> Self {
        Self {
            quality,
            ..self.clone()
        }
    }

    /// Settings for a fallback invocation.
    ///
    /// The fallback runs inside the outer call, which already holds the gate,
    /// so it must not try to take it again. It also cannot chain another fallback.
    /// Copy of this config that always generates filenames.
    ///
    /// Used when several posts share one config, where a fixed filename
    /// would make every post overwrite the previous one.
    pub fn without_filename(&self) -> Self {
        Self {
            filename: None,
            ..self.clone()
        }
    }

    pub(crate) fn for_fallback(&self) -> Self {
        Self {
            fallback: Fallback::None,
            no_sync: true,
            ..self.clone()
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("directory", &self.directory)
            .field("filename", &self.filename)
            .field("fallback", &self.fallback)
            .field("inter_item_delay", &self.inter_item_delay)
            .field("retry_delay", &self.retry_delay)
            .field("max_retries", &self.max_retries)
            .field("quality", &self.quality)
            .field("no_sync", &self.no_sync)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DownloadConfig`].
#[derive(Default)]
pub struct DownloadConfigBuilder {
    directory: Option<PathBuf>,
    filename: Option<String>,
    filename_format: Option<FilenameFormat>,
    transport: Option<Arc<dyn Transport>>,
    validator: Option<Arc<dyn Validator>>,
    fallback: Option<Fallback>,
    inter_item_delay: Option<Duration>,
    retry_delay: Option<Duration>,
    max_retries: Option<u32>,
    quality: Option<Quality>,
    no_sync: bool,
}

impl DownloadConfigBuilder {
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Use a fixed filename instead of the generated one.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn filename_format<F>(mut self, format: F) -> Self
    where
        F: Fn(&Post, usize) -> String + Send + Sync + 'static,
    {
        self.filename_format = Some(Arc::new(format));
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = Some(delay);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Retries per item after the first attempt. Zero means a single attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Skip the process-wide single-flight gate.
    pub fn no_sync(mut self, no_sync: bool) -> Self {
        self.no_sync = no_sync;
        self
    }

    pub fn build(self) -> DownloadConfig {
        DownloadConfig {
            directory: self.directory.unwrap_or_else(|| PathBuf::from(".")),
            filename: self.filename,
            filename_format: self
                .filename_format
                .unwrap_or_else(|| Arc::new(format_filename)),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::default())),
            validator: self.validator.unwrap_or_else(|| Arc::new(AcceptAll)),
            fallback: self.fallback.unwrap_or_default(),
            inter_item_delay: self.inter_item_delay.unwrap_or(Duration::from_secs(1)),
            retry_delay: self.retry_delay.unwrap_or(Duration::from_secs(15)),
            max_retries: self.max_retries.unwrap_or(2),
            quality: self.quality.unwrap_or_default(),
            no_sync: self.no_sync,
        }
    }
}
