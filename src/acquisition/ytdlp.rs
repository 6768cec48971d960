use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{classify_failure, ensure_within, validate_url, AcquisitionError, MediaAcquirer};
use crate::config::DownloaderConfig;
use crate::source::SourceTag;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mov", "m4v", "m4a", "mp3", "ogg", "opus", "wav", "flac",
];

/// Fetches a URL into a directory with extra downloader arguments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path, extra_args: &[String]) -> Result<PathBuf, AcquisitionError>;
}

/// Generic multi-platform downloader backed by yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    yt_dlp_path: String,
    format: String,
    show_progress: bool,
}

impl YtDlpDownloader {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            format: config.format.clone(),
            show_progress: true,
        }
    }

    /// Hide the download spinner
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.show_progress = !quiet;
        self
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn build_args(&self, url: &str, dest: &Path, extra_args: &[String]) -> Vec<String> {
        let template = dest.join("%(id)s.%(ext)s");
        let mut args: Vec<String> = vec![
            "--format".into(),
            self.format.clone(),
            "--no-playlist".into(),
            "--no-exec".into(),
            "--no-progress".into(),
            // Speech engines read MP4 but not Matroska or Flash containers
            "--remux-video".into(),
            "mkv>mp4/flv>mp4".into(),
            "--output".into(),
            template.to_string_lossy().into_owned(),
            "--print".into(),
            "after_move:filepath".into(),
        ];
        args.extend(extra_args.iter().cloned());
        args.push("--".into());
        args.push(url.to_string());
        args
    }

    /// Download `url` into `dest`, passing `extra_args` before the URL.
    /// Returns the path yt-dlp reports for the finished file.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        extra_args: &[String],
    ) -> Result<PathBuf, AcquisitionError> {
        validate_url(url)?;

        if !self.check_availability().await {
            return Err(AcquisitionError::ToolUnavailable(format!(
                "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
                self.yt_dlp_path
            )));
        }

        let args = self.build_args(url, dest, extra_args);
        tracing::debug!(binary = %self.yt_dlp_path, dest = %dest.display(), "running yt-dlp");

        let progress = self.spinner();
        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;
        progress.finish_and_clear();

        let output = output.map_err(|e| {
            AcquisitionError::ToolUnavailable(format!("failed to run {}: {}", self.yt_dlp_path, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let reported = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from);

        let path = match reported {
            Some(path) => {
                ensure_within(&path, dest)?;
                path
            }
            None => newest_media_file(dest)?,
        };

        tracing::debug!(path = %path.display(), "media downloaded");
        Ok(path)
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message("Downloading media with yt-dlp...");
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn fetch(&self, url: &str, dest: &Path, extra_args: &[String]) -> Result<PathBuf, AcquisitionError> {
        self.download(url, dest, extra_args).await
    }
}

#[async_trait]
impl MediaAcquirer for YtDlpDownloader {
    async fn acquire(&self, url: &str, _tag: SourceTag, dest: &Path) -> Result<PathBuf, AcquisitionError> {
        self.download(url, dest, &[]).await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Most recently modified media file in `dir`
fn newest_media_file(dir: &Path) -> Result<PathBuf, AcquisitionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        AcquisitionError::NoMediaContent(format!("cannot read {}: {}", dir.display(), e))
    })?;

    let mut best: Option<(PathBuf, std::time::SystemTime)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_media = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_media {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) {
            if best.as_ref().map_or(true, |(_, time)| modified > *time) {
                best = Some((path, modified));
            }
        }
    }

    best.map(|(path, _)| path)
        .ok_or_else(|| AcquisitionError::NoMediaContent("no media file found after download".to_string()))
}
