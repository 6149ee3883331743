//! Post-download validation of media files.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Checks a freshly downloaded file.
///
/// `Ok(false)` and `Err(_)` both fail the attempt; the error form carries a reason.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, path: &Path) -> Result<bool>;
}

/// Accepts every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl Validator for AcceptAll {
    async fn validate(&self, _path: &Path) -> Result<bool> {
        Ok(true)
    }
}

/// Probes the file with `ffprobe` and requires non-empty metadata.
///
/// Truncated or corrupt downloads make ffprobe fail or print an empty object.
#[derive(Debug, Clone)]
pub struct FfprobeValidator {
    binary: PathBuf,
}

impl FfprobeValidator {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Look up `ffprobe` on PATH.
    pub fn from_path() -> Option<Self> {
        which::which("ffprobe").ok().map(Self::new)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Validator for FfprobeValidator {
    async fn validate(&self, path: &Path) -> Result<bool> {
        let output = Command::new(&self.binary)
            .args([
                "-loglevel",
                "error",
                "-of",
                "json",
                "-show_entries",
                "stream_tags:format_tags",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Validation(format!("{} not found", self.binary.display()))
                } else {
                    Error::Validation(format!("Failed to run ffprobe: {}", e))
                }
            })?;

        if !output.status.success() {
            return Err(Error::Validation(format!(
                "ffprobe rejected {} ({}): {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        check_probe_output(&output.stdout)
            .map_err(|reason| Error::Validation(format!("{}: {}", path.display(), reason)))?;
        Ok(true)
    }
}

fn check_probe_output(stdout: &[u8]) -> std::result::Result<(), String> {
    let probe: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| format!("unreadable ffprobe output: {}", e))?;

    match probe.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err("ffprobe found no metadata".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_all() {
        assert!(AcceptAll.validate(Path::new("/nonexistent")).await.unwrap());
    }

    #[test]
    fn test_probe_output() {
        let ok = br#"{"streams":[{"tags":{"language":"und"}}],"format":{"tags":{"encoder":"Lavf"}}}"#;
        assert!(check_probe_output(ok).is_ok());
        assert!(check_probe_output(b"{}").is_err());
        assert!(check_probe_output(b"").is_err());
        assert!(check_probe_output(b"[]").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let validator = FfprobeValidator::new("/nonexistent/ffprobe-binary-xyz");
        let err = validator.validate(Path::new("clip.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_from_path_matches_which() {
        let found = which::which("ffprobe").ok();
        let validator = FfprobeValidator::from_path();
        assert_eq!(found.as_deref(), validator.as_ref().map(|v| v.binary()));
    }
}
