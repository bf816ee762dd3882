//! External extraction collaborator.
//!
//! The core treats media retrieval as an opaque operation: a URL goes in,
//! a [`DownloadResult`] or a typed [`DownloadError`] comes out. The shipped
//! implementation shells out to `yt-dlp`, but everything above the
//! [`MediaDownloader`] trait is backend-agnostic.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Patterns indicating fatal, unrecoverable extraction errors
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "copyright claim",
    "terminated account",
    "This video has been removed",
    "ERROR: Unsupported URL",
    "is not a valid URL",
    "Unable to extract video data",
    "HTTP Error 403",
    "HTTP Error 404",
];

/// Patterns indicating transient errors that might be resolved with retry
const RETRYABLE_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "network is unreachable",
    "Temporary failure in name resolution",
];

fn is_fatal_error(error_msg: &str) -> bool {
    FATAL_ERROR_PATTERNS.iter().any(|p| error_msg.contains(p))
}

fn is_retryable_error(error_msg: &str) -> bool {
    RETRYABLE_ERROR_PATTERNS
        .iter()
        .any(|p| error_msg.contains(p))
}

/// Failure modes of a download dispatch.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source rejected the request; retrying will not help.
    #[error("{0}")]
    Fatal(String),
    /// Transient failure; a later retry may succeed.
    #[error("{0}")]
    Retryable(String),
    /// The dispatch was cancelled before completion.
    #[error("download cancelled")]
    Cancelled,
    /// The global download timeout elapsed.
    #[error("download timed out")]
    Timeout,
}

impl DownloadError {
    fn classify(stderr: &str) -> Self {
        let line = stderr
            .lines()
            .find(|l| l.contains("ERROR"))
            .unwrap_or(stderr)
            .trim()
            .to_string();
        if is_fatal_error(&line) {
            Self::Fatal(line)
        } else if is_retryable_error(&line) {
            Self::Retryable(line)
        } else {
            // Unknown failures default to retryable
            Self::Retryable(line)
        }
    }
}

/// Bounds applied to a single download dispatch.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory files are written into.
    pub out_dir: PathBuf,
    /// Album/playlist item cap, from the chat's settings.
    pub max_items: u8,
    /// Per-file size ceiling in bytes.
    pub max_file_size: u64,
}

/// One delivered file of a download.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub path: PathBuf,
    /// "video", "audio" or "document".
    pub media_type: String,
    pub file_size: u64,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of a successful extraction.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub content_id: String,
    pub title: String,
    pub uploader: String,
    pub description: String,
    pub files: Vec<DownloadedFile>,
}

/// The opaque extraction collaborator.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Retrieve media for a URL.
    ///
    /// Must honor `cancel` promptly; a cancelled dispatch returns
    /// [`DownloadError::Cancelled`] and never a partial result.
    async fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, DownloadError>;
}

/// Follow HTTP redirects and return the final URL.
///
/// Used for short-link hosts before extractor dispatch.
///
/// # Errors
///
/// Returns an error if the request fails; callers fall back to the
/// original URL.
pub async fn resolve_redirect(url: &str) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let resp = client.get(url).send().await?;
    Ok(resp.url().to_string())
}

/// `yt-dlp` subprocess backend.
pub struct YtDlpDownloader {
    binary: String,
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }
}

impl YtDlpDownloader {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, DownloadError> {
        tokio::fs::create_dir_all(&opts.out_dir)
            .await
            .map_err(|e| DownloadError::Retryable(format!("cannot create downloads dir: {e}")))?;

        let template = opts.out_dir.join("%(id)s.%(ext)s");
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--dump-single-json")
            .arg("--no-simulate")
            .arg("--no-warnings")
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("--max-filesize")
            .arg(opts.max_file_size.to_string())
            .arg("--playlist-items")
            .arg(format!("1:{}", opts.max_items.max(1)))
            .arg("-o")
            .arg(&template)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("spawning {} for {url}", self.binary);
        let child = cmd
            .spawn()
            .map_err(|e| DownloadError::Retryable(format!("cannot spawn {}: {e}", self.binary)))?;

        let output = tokio::select! {
            out = child.wait_with_output() => {
                out.map_err(|e| DownloadError::Retryable(format!("subprocess wait failed: {e}")))?
            }
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::classify(&stderr));
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::Retryable(format!("unreadable extractor output: {e}")))?;
        build_result(&opts.out_dir, &info, opts.max_items).await
    }
}

fn str_field(info: &Value, key: &str) -> String {
    info.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u32_field(info: &Value, key: &str) -> u32 {
    info.get(key)
        .and_then(Value::as_f64)
        .map_or(0, |v| v.max(0.0) as u32)
}

/// Locate the downloaded file for an entry; extractors often remux, so the
/// declared extension may be stale.
async fn entry_path(out_dir: &Path, content_id: &str, ext: &str) -> Option<PathBuf> {
    let direct = out_dir.join(format!("{content_id}.{ext}"));
    if tokio::fs::try_exists(&direct).await.unwrap_or(false) {
        return Some(direct);
    }
    let remuxed = out_dir.join(format!("{content_id}.mp4"));
    if tokio::fs::try_exists(&remuxed).await.unwrap_or(false) {
        return Some(remuxed);
    }
    let prefix = format!("{content_id}.");
    let mut dir = tokio::fs::read_dir(out_dir).await.ok()?;
    while let Ok(Some(entry)) = dir.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Some(entry.path());
        }
    }
    None
}

async fn entry_file(out_dir: &Path, entry: &Value) -> Result<DownloadedFile, DownloadError> {
    let content_id = entry
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let ext = entry.get("ext").and_then(Value::as_str).unwrap_or("mp4");

    let path = entry_path(out_dir, content_id, ext)
        .await
        .ok_or_else(|| DownloadError::Fatal(format!("no file produced for {content_id}")))?;
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| DownloadError::Retryable(format!("cannot stat {}: {e}", path.display())))?;

    let requested = entry
        .get("requested_downloads")
        .and_then(Value::as_array)
        .and_then(|a| a.first());
    let fmt = requested.unwrap_or(entry);
    let vcodec = str_field(fmt, "vcodec");
    let acodec = str_field(fmt, "acodec");
    let has_video = !vcodec.is_empty() && vcodec != "none";
    let has_audio = !acodec.is_empty() && acodec != "none";
    let media_type = if has_video {
        "video"
    } else if has_audio {
        "audio"
    } else {
        "document"
    };

    Ok(DownloadedFile {
        path,
        media_type: media_type.to_string(),
        file_size: meta.len(),
        duration: u32_field(entry, "duration"),
        width: u32_field(fmt, "width").max(u32_field(entry, "width")),
        height: u32_field(fmt, "height").max(u32_field(entry, "height")),
    })
}

async fn build_result(
    out_dir: &Path,
    info: &Value,
    max_items: u8,
) -> Result<DownloadResult, DownloadError> {
    let is_playlist = matches!(
        info.get("_type").and_then(Value::as_str),
        Some("playlist" | "multi_video")
    );
    let entries: Vec<&Value> = if is_playlist {
        info.get("entries")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter(|e| !e.is_null())
                    .take(usize::from(max_items.max(1)))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        vec![info]
    };
    if entries.is_empty() {
        return Err(DownloadError::Fatal("extractor returned no items".into()));
    }

    let mut files = Vec::with_capacity(entries.len());
    for entry in &entries {
        files.push(entry_file(out_dir, entry).await?);
    }

    let uploader = {
        let u = str_field(info, "uploader");
        if u.is_empty() {
            str_field(info, "uploader_id")
        } else {
            u
        }
    };

    Ok(DownloadResult {
        content_id: str_field(info, "id"),
        title: str_field(info, "title"),
        uploader,
        description: str_field(info, "description"),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let err = DownloadError::classify("ERROR: Video unavailable");
        assert!(matches!(err, DownloadError::Fatal(_)));

        let err = DownloadError::classify("ERROR: HTTP Error 429: Too Many Requests");
        assert!(matches!(err, DownloadError::Retryable(_)));

        let err = DownloadError::classify("something odd happened");
        assert!(matches!(err, DownloadError::Retryable(_)));
    }

    #[tokio::test]
    async fn test_build_result_single_entry() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        tokio::fs::write(dir.path().join("abc.mp4"), b"data").await?;

        let info = serde_json::json!({
            "id": "abc",
            "ext": "webm",
            "title": "Clip",
            "uploader": "someone",
            "vcodec": "h264",
            "acodec": "aac",
            "duration": 12.5,
        });
        let res = build_result(dir.path(), &info, 10).await;
        let res = res.map_err(|e| anyhow::anyhow!(e.to_string()))?;
        assert_eq!(res.content_id, "abc");
        assert_eq!(res.files.len(), 1);
        assert_eq!(res.files[0].media_type, "video");
        // .webm is absent, the remuxed .mp4 is picked up
        assert!(res.files[0].path.ends_with("abc.mp4"));
        assert_eq!(res.files[0].duration, 12);
        Ok(())
    }

    #[tokio::test]
    async fn test_build_result_caps_playlist_items() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for id in ["a", "b", "c"] {
            tokio::fs::write(dir.path().join(format!("{id}.mp4")), b"x").await?;
        }
        let info = serde_json::json!({
            "_type": "playlist",
            "id": "list",
            "title": "Album",
            "entries": [
                {"id": "a", "ext": "mp4"},
                {"id": "b", "ext": "mp4"},
                {"id": "c", "ext": "mp4"},
            ],
        });
        let res = build_result(dir.path(), &info, 2)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        assert_eq!(res.files.len(), 2);
        Ok(())
    }
}
