use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

pub mod instagram;
pub mod session;
pub mod ytdlp;

use crate::source::SourceTag;

/// Why media could not be acquired
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Network failure while downloading: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No video content: {0}")]
    NoMediaContent(String),

    #[error("Platform rejected the request: {0}")]
    PlatformRejected(String),

    #[error("Downloader unavailable: {0}")]
    ToolUnavailable(String),
}

impl AcquisitionError {
    /// Stable identifier of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::Network(_) => "network",
            AcquisitionError::Auth(_) => "auth",
            AcquisitionError::NoMediaContent(_) => "no-media-content",
            AcquisitionError::PlatformRejected(_) => "platform-rejected",
            AcquisitionError::ToolUnavailable(_) => "tool-unavailable",
        }
    }
}

/// Container formats the speech engine accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaFormat {
    Mp3,
    Mp4,
    Wav,
    Flac,
    Ogg,
    Webm,
    Amr,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Wav => "wav",
            MediaFormat::Flac => "flac",
            MediaFormat::Ogg => "ogg",
            MediaFormat::Webm => "webm",
            MediaFormat::Amr => "amr",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(MediaFormat::Mp3),
            "mp4" | "m4a" | "m4v" | "mov" | "aac" => Some(MediaFormat::Mp4),
            "wav" => Some(MediaFormat::Wav),
            "flac" => Some(MediaFormat::Flac),
            "ogg" | "opus" => Some(MediaFormat::Ogg),
            "webm" => Some(MediaFormat::Webm),
            "amr" => Some(MediaFormat::Amr),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "audio/mpeg",
            MediaFormat::Mp4 => "video/mp4",
            MediaFormat::Wav => "audio/wav",
            MediaFormat::Flac => "audio/flac",
            MediaFormat::Ogg => "audio/ogg",
            MediaFormat::Webm => "video/webm",
            MediaFormat::Amr => "audio/amr",
        }
    }
}

/// A downloaded media file. Owned by one pipeline run and deleted when it ends.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaHandle {
    path: PathBuf,
    source: SourceTag,
    format: MediaFormat,
}

impl MediaHandle {
    /// Wrap a downloaded file; containers the speech engine cannot read are rejected
    pub fn new(path: PathBuf, source: SourceTag) -> Result<Self, AcquisitionError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaFormat::from_extension)
            .ok_or_else(|| {
                AcquisitionError::NoMediaContent(format!(
                    "unsupported media container: {}",
                    path.display()
                ))
            })?;

        Ok(Self { path, source, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> SourceTag {
        self.source
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }
}

/// One way of turning a URL into a local media file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Download the media behind `url` into `dest` and return the file path
    async fn acquire(&self, url: &str, tag: SourceTag, dest: &Path) -> Result<PathBuf, AcquisitionError>;

    /// Drop any transient per-run state kept under `dest`
    async fn release(&self, _dest: &Path) {}

    /// Get the name of this strategy
    fn name(&self) -> &'static str;
}

/// Dispatch table from source tag to acquisition strategy
pub struct AcquisitionTable {
    strategies: HashMap<SourceTag, Arc<dyn MediaAcquirer>>,
    fallback: Arc<dyn MediaAcquirer>,
}

impl AcquisitionTable {
    /// Table where every tag without an explicit entry uses `fallback`
    pub fn new(fallback: Arc<dyn MediaAcquirer>) -> Self {
        Self {
            strategies: HashMap::new(),
            fallback,
        }
    }

    /// Route `tag` to `strategy`
    pub fn register(mut self, tag: SourceTag, strategy: Arc<dyn MediaAcquirer>) -> Self {
        self.strategies.insert(tag, strategy);
        self
    }

    pub fn strategy_for(&self, tag: SourceTag) -> Arc<dyn MediaAcquirer> {
        self.strategies
            .get(&tag)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Strategy name per tag, used by `vidbrief platforms`
    pub fn routes(&self) -> Vec<(SourceTag, &'static str)> {
        SourceTag::ALL
            .into_iter()
            .map(|tag| (tag, self.strategy_for(tag).name()))
            .collect()
    }

    /// Acquire `url` with the strategy registered for `tag`
    pub async fn acquire(
        &self,
        url: &str,
        tag: SourceTag,
        dest: &Path,
    ) -> Result<MediaHandle, AcquisitionError> {
        let strategy = self.strategy_for(tag);
        tracing::info!(strategy = strategy.name(), source_type = %tag, "acquiring media");

        let path = strategy.acquire(url, tag, dest).await?;
        if !path.is_file() {
            return Err(AcquisitionError::NoMediaContent(format!(
                "downloader reported {} but no file exists there",
                path.display()
            )));
        }

        MediaHandle::new(path, tag)
    }
}

/// Reject anything that is not an http(s) URL before it reaches a subprocess
pub fn validate_url(url: &str) -> Result<Url, AcquisitionError> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| AcquisitionError::PlatformRejected(format!("Invalid URL format: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AcquisitionError::PlatformRejected(
            "URL must use HTTP or HTTPS protocol".to_string(),
        ));
    }

    Ok(parsed)
}

const NO_MEDIA_MARKERS: &[&str] = &[
    "no video in this post",
    "no video formats found",
    "does not contain a video",
    "there's no video",
    "requested format is not available",
];

const AUTH_MARKERS: &[&str] = &[
    "login required",
    "login_required",
    "log in to",
    "checkpoint_required",
    "sign in to confirm",
    "sign in if you've been granted access",
];

const NETWORK_MARKERS: &[&str] = &[
    "timed out",
    "connection refused",
    "connection reset",
    "connection aborted",
    "network is unreachable",
    "temporary failure in name resolution",
    "name or service not known",
    "getaddrinfo failed",
    "unable to download webpage",
];

/// Map a downloader's error output to a failure kind.
///
/// Only the last `ERROR:` line is inspected, so URLs echoed in progress
/// output and usage hints never influence the kind. An HTTP status in that
/// line decides before any text marker.
pub fn classify_failure(stderr: &str) -> AcquisitionError {
    let message: String = stderr.trim().chars().take(1000).collect();
    let error_line = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .last()
        .or_else(|| stderr.lines().map(str::trim).filter(|line| !line.is_empty()).last())
        .unwrap_or("");
    // yt-dlp appends "Use --cookies..." hints after the reason
    let reason = error_line
        .to_lowercase()
        .split(". use --cookies")
        .next()
        .unwrap_or_default()
        .to_string();

    if let Some(status) = http_status(&reason) {
        return match status {
            401 => AcquisitionError::Auth(message),
            500..=599 => AcquisitionError::Network(message),
            _ => AcquisitionError::PlatformRejected(message),
        };
    }

    let matches_any = |markers: &[&str]| markers.iter().any(|marker| reason.contains(marker));

    if matches_any(NO_MEDIA_MARKERS) {
        AcquisitionError::NoMediaContent(message)
    } else if matches_any(AUTH_MARKERS) {
        AcquisitionError::Auth(message)
    } else if matches_any(NETWORK_MARKERS) {
        AcquisitionError::Network(message)
    } else {
        AcquisitionError::PlatformRejected(message)
    }
}

/// Status code from an `HTTP Error NNN` fragment
fn http_status(line: &str) -> Option<u16> {
    let (_, rest) = line.split_once("http error ")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 3 {
        return None;
    }
    digits.parse().ok()
}

/// Ensure a reported download path lies inside the run directory
pub(crate) fn ensure_within(path: &Path, dir: &Path) -> Result<(), AcquisitionError> {
    let canonical_dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let canonical_path = path.canonicalize().unwrap_or_else(|_| {
        match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
            (Some(parent), Some(name)) => parent.join(name),
            _ => path.to_path_buf(),
        }
    });

    if canonical_path.starts_with(&canonical_dir) {
        Ok(())
    } else {
        tracing::warn!(
            path = %path.display(),
            expected_dir = %dir.display(),
            "downloaded file path outside run directory"
        );
        Err(AcquisitionError::PlatformRejected(
            "downloaded file path is outside the run directory".to_string(),
        ))
    }
}
