//! Process-wide login state for platforms that need an authenticated session.
//!
//! The session is resolved lazily on first use: a persisted cookie jar wins,
//! otherwise configured credentials are used to log in (and the resulting jar
//! is persisted for later runs), otherwise access is anonymous.

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// How requests authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Session {
    /// Reuse a persisted cookie jar
    CookieJar(PathBuf),
    /// Log in with credentials and write the new cookie jar to `cookie_file`
    Login {
        username: String,
        password: String,
        cookie_file: PathBuf,
    },
    /// No credentials configured
    Anonymous,
}

impl Session {
    pub fn describe(&self) -> String {
        match self {
            Session::CookieJar(path) => format!("cookie jar at {}", path.display()),
            Session::Login { username, cookie_file, .. } => format!(
                "credential login as {} (session will be saved to {})",
                username,
                cookie_file.display()
            ),
            Session::Anonymous => "anonymous".to_string(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::CookieJar(path) => f.debug_tuple("CookieJar").field(path).finish(),
            Session::Login { username, cookie_file, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("cookie_file", cookie_file)
                .finish(),
            Session::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Shared, lazily initialised session state
pub struct SessionStore {
    username: Option<String>,
    password: Option<String>,
    cookie_file: PathBuf,
    state: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new(username: Option<String>, password: Option<String>, cookie_file: PathBuf) -> Self {
        Self {
            username: username.filter(|u| !u.trim().is_empty()),
            password: password.filter(|p| !p.is_empty()),
            cookie_file,
            state: Mutex::new(None),
        }
    }

    pub fn cookie_file(&self) -> &Path {
        &self.cookie_file
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Current session, establishing it on first use
    pub async fn current(&self) -> Session {
        let mut state = self.state.lock().await;
        if let Some(session) = state.as_ref() {
            return session.clone();
        }

        let session = self.establish();
        tracing::info!(session = %session.describe(), "session initialised");
        *state = Some(session.clone());
        session
    }

    fn establish(&self) -> Session {
        if self.cookie_file.is_file() {
            tracing::info!(path = %self.cookie_file.display(), "loading session from cookie file");
            return Session::CookieJar(self.cookie_file.clone());
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                tracing::info!(%username, "logging in with credentials");
                Session::Login {
                    username: username.clone(),
                    password: password.clone(),
                    cookie_file: self.cookie_file.clone(),
                }
            }
            _ => {
                tracing::warn!("No Instagram credentials provided. Some posts may be unavailable.");
                Session::Anonymous
            }
        }
    }

    /// Record that a login run finished and wrote `run_jar`. The jar is
    /// persisted to the shared cookie file so later runs reuse it.
    pub async fn mark_established(&self, run_jar: &Path) {
        let mut state = self.state.lock().await;
        if !matches!(state.as_ref(), Some(Session::Login { .. })) {
            return;
        }
        if !run_jar.is_file() {
            tracing::warn!(path = %run_jar.display(), "login run produced no cookie jar");
            return;
        }

        match persist_jar(run_jar, &self.cookie_file).await {
            Ok(()) => {
                tracing::info!(path = %self.cookie_file.display(), "session saved for reuse");
                *state = Some(Session::CookieJar(self.cookie_file.clone()));
            }
            Err(e) => {
                tracing::warn!(path = %self.cookie_file.display(), error = %e, "failed to save session");
            }
        }
    }

    /// Forget the in-memory session; the next use re-initialises it
    pub async fn forget(&self) {
        *self.state.lock().await = None;
    }

    /// Forget the session and delete the persisted cookie jar
    pub async fn invalidate(&self) -> std::io::Result<()> {
        let mut state = self.state.lock().await;
        *state = None;
        match tokio::fs::remove_file(&self.cookie_file).await {
            Ok(()) => {
                tracing::info!(path = %self.cookie_file.display(), "session cookie file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Invalidate and immediately re-establish
    pub async fn refresh(&self) -> std::io::Result<Session> {
        self.invalidate().await?;
        Ok(self.current().await)
    }
}

/// Copy `from` over `to` through a sibling temp file so readers never see a partial jar
async fn persist_jar(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = to.with_extension("tmp");
    tokio::fs::copy(from, &tmp).await?;
    tokio::fs::rename(&tmp, to).await
}
