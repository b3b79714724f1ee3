//! What to do when a single post fails.

use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::{CrawlerError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// Skip the post after waiting.
    SkipAfter(Duration),
    /// Skip the post and continue at once.
    Skip,
    /// Stop the run and surface the error.
    Abort,
}

/// Map a per-post failure to an action. Failed posts are never retried.
pub fn on_item_error(error: &CrawlerError, config: &CrawlConfig) -> ItemAction {
    match error.kind() {
        ErrorKind::Connectivity => ItemAction::SkipAfter(config.connection_retry_delay),
        ErrorKind::Transient => ItemAction::Skip,
        ErrorKind::Fatal => ItemAction::Abort,
    }
}
