use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_POSTS: usize = 10;
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_CONNECTION_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_PAGE_FAILURES: u32 = 5;
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

/// Settings for one `posts` run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Account whose posts are reported.
    pub target: String,
    /// Account used for login, when different from `target`.
    pub login: Option<String>,
    /// Upper bound on reported posts.
    pub max_posts: usize,
    /// Pause after each reported post.
    pub item_delay: Duration,
    /// Pause after a connectivity failure on a single post.
    pub connection_retry_delay: Duration,
    /// Failed fetches of the same page before the run is abandoned.
    pub max_page_failures: u32,
    /// Directory holding `session-<username>` files.
    pub session_dir: PathBuf,
    /// Skip session acquisition and browse without logging in.
    pub anonymous: bool,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            login: None,
            max_posts: DEFAULT_MAX_POSTS,
            item_delay: DEFAULT_ITEM_DELAY,
            connection_retry_delay: DEFAULT_CONNECTION_RETRY_DELAY,
            max_page_failures: DEFAULT_MAX_PAGE_FAILURES,
            session_dir: default_session_dir(),
            anonymous: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_max_posts(mut self, max_posts: usize) -> Self {
        self.max_posts = max_posts;
        self
    }

    pub fn with_item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub fn with_connection_retry_delay(mut self, delay: Duration) -> Self {
        self.connection_retry_delay = delay;
        self
    }

    pub fn with_max_page_failures(mut self, max: u32) -> Self {
        self.max_page_failures = max;
        self
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// The account to log in as. Falls back to the target account.
    pub fn login_username(&self) -> &str {
        self.login.as_deref().unwrap_or(&self.target)
    }
}

/// `$XDG_CONFIG_HOME/insta-crawler`, then `$HOME/.config/insta-crawler`, then `.`.
pub fn default_session_dir() -> PathBuf {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("insta-crawler");
    }
    match env::var_os("HOME").filter(|d| !d.is_empty()) {
        Some(home) => PathBuf::from(home).join(".config").join("insta-crawler"),
        None => PathBuf::from("."),
    }
}
