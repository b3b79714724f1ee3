//! Session reuse and interactive login.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::CrawlerError;

/// Cookies of a logged-in (or anonymous) browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            cookies: BTreeMap::new(),
        }
    }

    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<String>>()
            .join("; ")
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.cookies.get("csrftoken").map(String::as_str)
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookies.contains_key("sessionid")
    }
}

/// Session files, one per username, stored as `session-<username>`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("session-{}", username))
    }

    pub fn load(&self, username: &str) -> Result<Session, CrawlerError> {
        let path = self.path_for(username);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CrawlerError::SessionNotFound(username.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "loaded session file");
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, session: &Session) -> Result<PathBuf, CrawlerError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.username);
        std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
        Ok(path)
    }
}

pub trait PasswordPrompt {
    fn prompt_password(&self, username: &str) -> io::Result<String>;
}

/// Reads the password from the controlling terminal without echo.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&self, username: &str) -> io::Result<String> {
        let prompt = format!("Enter Instagram password for {}: ", username);
        tokio::task::block_in_place(|| rpassword::prompt_password(prompt))
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Session, CrawlerError>;
}

/// Reuse the saved session for `username`, or log in interactively.
///
/// Status lines go to `out`. A failed login is returned as
/// [`CrawlerError::LoginFailed`]; there is no further fallback.
pub async fn acquire<A, P, W>(
    store: &SessionStore,
    authenticator: &A,
    prompt: &P,
    username: &str,
    out: &mut W,
) -> Result<Session, CrawlerError>
where
    A: Authenticator + ?Sized,
    P: PasswordPrompt + ?Sized,
    W: Write,
{
    match store.load(username) {
        Ok(session) => {
            writeln!(out, "Loaded existing session for {}", username)?;
            return Ok(session);
        }
        Err(CrawlerError::SessionNotFound(_)) => {
            writeln!(out, "No existing session found. Please login:")?;
        }
        Err(e) => return Err(e),
    }
    out.flush()?;

    let password = prompt
        .prompt_password(username)
        .map_err(|e| CrawlerError::LoginFailed(format!("could not read password: {}", e)))?;
    let session = authenticator
        .login(username, &password)
        .await
        .map_err(|e| match e {
            CrawlerError::LoginFailed(msg) => CrawlerError::LoginFailed(msg),
            other => CrawlerError::LoginFailed(other.to_string()),
        })?;
    writeln!(out, "Successfully logged in as {}", username)?;

    match store.save(&session) {
        Ok(path) => debug!(path = %path.display(), "saved session"),
        Err(e) => warn!(error = %e, "could not save session"),
    }
    Ok(session)
}
