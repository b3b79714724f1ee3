//! CLI argument definitions for insta-crawler.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use insta_crawler::config::{
    default_session_dir, CrawlConfig, DEFAULT_MAX_PAGE_FAILURES, DEFAULT_USER_AGENT,
};
use insta_crawler::utils::DEFAULT_ASSUMED_YEAR;

/// Print the latest posts of an Instagram profile, or convert IST timestamps.
///
/// ## Examples
///
///   insta-crawler posts some_account --max-posts 5
///
///   insta-crawler convert-date "20 Jul, 19:48 ist" --year 2025
#[derive(Parser, Debug)]
#[command(name = "insta-crawler")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a profile and print its most recent posts
    Posts(PostsArgs),
    /// Convert "<day> <mon>, <HH:MM> ist" to an ISO-8601 UTC timestamp
    ConvertDate(ConvertDateArgs),
}

#[derive(Args, Debug)]
pub struct PostsArgs {
    /// Account whose posts are printed
    #[arg(env = "INSTA_CRAWLER_TARGET")]
    pub target: String,

    /// Account to log in as (defaults to the target account)
    #[arg(long, env = "INSTA_CRAWLER_LOGIN")]
    pub login: Option<String>,

    /// Maximum number of posts to print (must be >= 1)
    #[arg(long, default_value = "10", value_parser = parse_positive_usize)]
    pub max_posts: usize,

    /// Seconds to wait after each printed post
    #[arg(long, default_value = "2")]
    pub item_delay: u64,

    /// Seconds to wait after a connection error on a post
    #[arg(long, default_value = "30")]
    pub retry_delay: u64,

    /// Failed fetches of the same page before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_PAGE_FAILURES)]
    pub max_page_failures: u32,

    /// Directory holding saved sessions
    #[arg(long, env = "INSTA_CRAWLER_SESSION_DIR")]
    pub session_dir: Option<PathBuf>,

    /// Do not load a session or log in
    #[arg(long)]
    pub anonymous: bool,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl From<PostsArgs> for CrawlConfig {
    fn from(args: PostsArgs) -> Self {
        CrawlConfig {
            target: args.target,
            login: args.login,
            max_posts: args.max_posts,
            item_delay: Duration::from_secs(args.item_delay),
            connection_retry_delay: Duration::from_secs(args.retry_delay),
            max_page_failures: args.max_page_failures,
            session_dir: args.session_dir.unwrap_or_else(default_session_dir),
            anonymous: args.anonymous,
            user_agent: args.user_agent,
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertDateArgs {
    /// Timestamp such as "18 Mar, 14:44 ist"
    pub input: String,

    /// Year to assume, since the input carries none
    #[arg(long, default_value_t = DEFAULT_ASSUMED_YEAR)]
    pub year: i32,
}

/// Log level argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}
