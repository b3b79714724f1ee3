use reqwest::StatusCode;
use thiserror::Error;

/// How a failure should be treated by the fetch loop and the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network trouble or throttling. Worth waiting before the next request.
    Connectivity,
    /// A single item could not be handled. Safe to move on right away.
    Transient,
    /// Nothing further can succeed in this run.
    Fatal,
}

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Http { status: StatusCode, url: String },

    #[error("too many requests, please wait a few minutes before you try again")]
    RateLimited,

    #[error("login required")]
    LoginRequired,

    #[error("profile {0} does not exist")]
    ProfileNotFound(String),

    #[error("no saved session for {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    LoginFailed(String),

    #[error("two-factor authentication required for {0}")]
    TwoFactorRequired(String),

    #[error("checkpoint required: {0}")]
    Checkpoint(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("giving up after {0} failed attempts to fetch the same page")]
    TooManyFailures(u32),
}

impl CrawlerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlerError::Network(e) if e.is_decode() || e.is_builder() => ErrorKind::Transient,
            CrawlerError::Network(_) | CrawlerError::Http { .. } | CrawlerError::RateLimited => {
                ErrorKind::Connectivity
            }
            CrawlerError::Parse(_) | CrawlerError::Json(_) | CrawlerError::Io(_) => {
                ErrorKind::Transient
            }
            CrawlerError::LoginRequired
            | CrawlerError::ProfileNotFound(_)
            | CrawlerError::SessionNotFound(_)
            | CrawlerError::LoginFailed(_)
            | CrawlerError::TwoFactorRequired(_)
            | CrawlerError::Checkpoint(_)
            | CrawlerError::TooManyFailures(_) => ErrorKind::Fatal,
        }
    }
}
