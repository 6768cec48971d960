use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use super::session::{Session, SessionStore};
use super::ytdlp::Downloader;
use super::{validate_url, AcquisitionError, MediaAcquirer};
use crate::source::SourceTag;

const POST_KINDS: &[&str] = &["p", "reel", "reels", "tv"];
const SESSION_DIR: &str = ".session";
const NETRC_MACHINE: &str = "instagram";

/// Instagram post downloader that authenticates through a shared session
pub struct InstagramAcquirer {
    downloader: Arc<dyn Downloader>,
    sessions: Arc<SessionStore>,
}

impl InstagramAcquirer {
    pub fn new(downloader: Arc<dyn Downloader>, sessions: Arc<SessionStore>) -> Self {
        Self {
            downloader,
            sessions,
        }
    }

    /// yt-dlp arguments for the session. Every run reads and writes its own
    /// cookie jar under `dest`; the shared jar is only replaced by
    /// [`SessionStore::mark_established`]. Credentials go through a private
    /// netrc file, never the command line.
    async fn session_args(&self, session: &Session, dest: &Path) -> Result<Vec<String>, AcquisitionError> {
        let run_jar = transient_jar(dest);
        match session {
            Session::CookieJar(jar) => {
                prepare_session_dir(dest).await?;
                tokio::fs::copy(jar, &run_jar).await.map_err(|e| {
                    AcquisitionError::Auth(format!("cannot read cookie file {}: {}", jar.display(), e))
                })?;
                Ok(vec!["--cookies".into(), run_jar.to_string_lossy().into_owned()])
            }
            Session::Login { username, password, .. } => {
                prepare_session_dir(dest).await?;
                let netrc = dest.join(SESSION_DIR).join("netrc");
                write_private(&netrc, &netrc_entry(username, password))
                    .await
                    .map_err(|e| AcquisitionError::Auth(format!("cannot write login data: {}", e)))?;
                Ok(vec![
                    "--netrc".into(),
                    "--netrc-location".into(),
                    netrc.to_string_lossy().into_owned(),
                    "--cookies".into(),
                    run_jar.to_string_lossy().into_owned(),
                ])
            }
            Session::Anonymous => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaAcquirer for InstagramAcquirer {
    async fn acquire(&self, url: &str, _tag: SourceTag, dest: &Path) -> Result<PathBuf, AcquisitionError> {
        let post_url = canonical_post_url(url)?;
        tracing::info!(%post_url, "downloading Instagram post");

        let session = self.sessions.current().await;
        let args = self.session_args(&session, dest).await?;

        match self.downloader.fetch(&post_url, dest, &args).await {
            Ok(path) => {
                self.sessions.mark_established(&transient_jar(dest)).await;
                Ok(path)
            }
            Err(err @ AcquisitionError::Auth(_)) => {
                tracing::warn!(error = %err, "Instagram rejected the session");
                if self.sessions.has_credentials() {
                    if let Err(e) = self.sessions.invalidate().await {
                        tracing::warn!(error = %e, "failed to invalidate session");
                    }
                } else {
                    self.sessions.forget().await;
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn release(&self, dest: &Path) {
        let session_dir = dest.join(SESSION_DIR);
        if !session_dir.exists() {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&session_dir).await {
            tracing::warn!(path = %session_dir.display(), error = %e, "failed to release session copy");
        }
    }

    fn name(&self) -> &'static str {
        "instagram"
    }
}

fn transient_jar(dest: &Path) -> PathBuf {
    dest.join(SESSION_DIR).join("cookies.txt")
}

async fn prepare_session_dir(dest: &Path) -> Result<(), AcquisitionError> {
    tokio::fs::create_dir_all(dest.join(SESSION_DIR))
        .await
        .map_err(|e| AcquisitionError::Auth(format!("cannot prepare session directory: {}", e)))
}

fn netrc_entry(username: &str, password: &str) -> String {
    format!(
        "machine {} login {} password {}\n",
        NETRC_MACHINE,
        netrc_token(username),
        netrc_token(password)
    )
}

/// Quote values the netrc tokenizer would otherwise split
fn netrc_token(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Write a file readable only by the current user
async fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await
}

/// Canonical `https://www.instagram.com/p/<shortcode>/` for a post, reel or IGTV URL
pub fn canonical_post_url(url: &str) -> Result<String, AcquisitionError> {
    let parsed = validate_url(url)?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let shortcode = segments
        .windows(2)
        .find(|pair| POST_KINDS.contains(&pair[0]))
        .map(|pair| pair[1])
        .filter(|code| code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .ok_or_else(|| {
            AcquisitionError::PlatformRejected(format!("No post shortcode found in URL: {}", url))
        })?;

    Ok(format!("https://www.instagram.com/p/{}/", shortcode))
}
