use anyhow::{Context, Result};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::summary::{RankOptions, SummaryLimits, SummaryOptions};

pub const USERNAME_ENV: &str = "INSTAGRAM_USERNAME";
pub const PASSWORD_ENV: &str = "INSTAGRAM_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// Generic downloader settings
    pub downloader: DownloaderConfig,

    /// Instagram session settings
    pub instagram: InstagramConfig,

    /// AWS configuration
    pub aws: AwsConfig,

    /// Summariser settings
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Parent directory of per-run workspaces (system temp dir when unset)
    pub work_dir: Option<PathBuf>,

    /// Where processed results are stored
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// yt-dlp format selector
    pub format: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramConfig {
    pub username: Option<String>,

    pub password: Option<String>,

    /// Persisted session cookie jar (`<data_dir>/session-cookies.txt` when unset)
    pub cookie_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// S3 bucket for staging media during transcription
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,

    /// Transcription job settings
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Language code; automatic identification when unset
    pub default_language: Option<String>,

    /// Give up on a job after this many seconds
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub brief_sentences: usize,
    pub key_points: usize,
    pub short_transcript_threshold: usize,
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "best".to_string(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            s3_bucket: "".to_string(),
            s3_key_prefix: Some("vidbrief/".to_string()),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            default_language: None,
            poll_timeout_secs: 1800,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        let limits = SummaryLimits::default();
        let ranking = RankOptions::default();
        Self {
            brief_sentences: limits.brief_sentences,
            key_points: limits.key_points,
            short_transcript_threshold: limits.short_transcript_threshold,
            damping: ranking.damping,
            tolerance: ranking.tolerance,
            max_iterations: ranking.max_iterations,
        }
    }
}

impl std::fmt::Debug for InstagramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cookie_file", &self.cookie_file)
            .finish()
    }
}

impl AwsConfig {
    /// Checked only when a transcription engine is built
    pub fn validate(&self) -> Result<()> {
        if self.s3_bucket.is_empty() {
            anyhow::bail!("AWS S3 bucket must be configured (aws.s3_bucket)");
        }
        if self.region.trim().is_empty() {
            anyhow::bail!("AWS region must be configured (aws.region)");
        }
        Ok(())
    }

    /// Get AWS region
    pub fn region(&self) -> Region {
        Region::new(self.region.clone())
    }
}

impl SummaryConfig {
    pub fn options(&self) -> SummaryOptions {
        SummaryOptions {
            limits: SummaryLimits {
                brief_sentences: self.brief_sentences,
                key_points: self.key_points,
                short_transcript_threshold: self.short_transcript_threshold,
            },
            ranking: RankOptions {
                damping: self.damping,
                tolerance: self.tolerance,
                max_iterations: self.max_iterations,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            anyhow::bail!("summary.damping must be between 0 and 1, got {}", self.damping);
        }
        if !(self.tolerance > 0.0) {
            anyhow::bail!("summary.tolerance must be positive, got {}", self.tolerance);
        }
        if self.max_iterations == 0 {
            anyhow::bail!("summary.max_iterations must be at least 1");
        }
        if self.brief_sentences == 0 || self.key_points == 0 {
            anyhow::bail!("summary.brief_sentences and summary.key_points must be at least 1");
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from `path` (or the default location), creating it with defaults if missing
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            serde_yaml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            let config = Self::default();
            config.save(&config_path)?;
            tracing::info!(path = %config_path.display(), "wrote default configuration");
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("vidbrief").join("config.yaml"))
    }

    /// Credentials from the environment override the file
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup(USERNAME_ENV).filter(|v| !v.is_empty()) {
            self.instagram.username = Some(username);
        }
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.instagram.password = Some(password);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.downloader.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("downloader.yt_dlp_path must not be empty");
        }
        self.summary.validate()
    }

    pub fn work_dir(&self) -> PathBuf {
        self.app
            .work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vidbrief"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.app.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .context("Could not determine data directory")?
                .join("vidbrief")),
        }
    }

    pub fn cookie_file(&self) -> Result<PathBuf> {
        match &self.instagram.cookie_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.data_dir()?.join("session-cookies.txt")),
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Work Dir: {}", self.work_dir().display());
        match self.data_dir() {
            Ok(dir) => println!("  Data Dir: {}", dir.display()),
            Err(_) => println!("  Data Dir: <unavailable>"),
        }
        println!("  yt-dlp: {} (format {})", self.downloader.yt_dlp_path, self.downloader.format);
        println!(
            "  Instagram Login: {}",
            self.instagram.username.as_deref().unwrap_or("<none>")
        );
        println!("  AWS Region: {}", self.aws.region);
        println!("  S3 Bucket: {}", self.aws.s3_bucket);
        if let Some(prefix) = &self.aws.s3_key_prefix {
            println!("  S3 Prefix: {}", prefix);
        }
        println!(
            "  Summary: brief {} / key points {} / verbatim up to {} sentences",
            self.summary.brief_sentences, self.summary.key_points, self.summary.short_transcript_threshold
        );
    }
}
