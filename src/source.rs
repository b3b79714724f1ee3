use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_PAGE_FAILURES;
use crate::error::CrawlerError;
use crate::models::{Post, Profile};
use crate::InstaCrawler;

/// A forward-only, lazily produced sequence of posts.
///
/// `None` ends the sequence. An `Err` item fails that item only; the
/// caller decides whether to keep pulling.
#[async_trait]
pub trait PostSource: Send {
    async fn next_post(&mut self) -> Option<Result<Post, CrawlerError>>;
}

/// Posts of a profile, fetched page by page as they are consumed.
///
/// A page that fails to load is requested again on the next pull. After
/// `max_page_failures` failures on the same page the sequence yields
/// [`CrawlerError::TooManyFailures`] and ends.
pub struct ProfilePosts<'a> {
    crawler: &'a InstaCrawler,
    user_id: String,
    pending: VecDeque<Value>,
    end_cursor: Option<String>,
    has_next_page: bool,
    page_failures: u32,
    max_page_failures: u32,
}

impl<'a> ProfilePosts<'a> {
    pub fn new(crawler: &'a InstaCrawler, profile: &Profile) -> Self {
        let page = &profile.first_page;
        Self {
            crawler,
            user_id: profile.id.clone(),
            pending: page.nodes.iter().cloned().collect(),
            end_cursor: page.end_cursor.clone(),
            has_next_page: page.has_next_page && page.end_cursor.is_some(),
            page_failures: 0,
            max_page_failures: DEFAULT_MAX_PAGE_FAILURES,
        }
    }

    pub fn with_max_page_failures(mut self, max: u32) -> Self {
        self.max_page_failures = max.max(1);
        self
    }
}

#[async_trait]
impl PostSource for ProfilePosts<'_> {
    async fn next_post(&mut self) -> Option<Result<Post, CrawlerError>> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Some(Post::from_node(&node));
            }
            if !self.has_next_page {
                return None;
            }
            // on failure the cursor is kept, so the next pull asks for the same page
            let page = match self
                .crawler
                .get_posts_page(&self.user_id, self.end_cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.page_failures += 1;
                    if self.page_failures >= self.max_page_failures {
                        warn!(
                            user_id = %self.user_id,
                            cursor = ?self.end_cursor,
                            error = %e,
                            "giving up on post page"
                        );
                        self.has_next_page = false;
                        return Some(Err(CrawlerError::TooManyFailures(self.page_failures)));
                    }
                    return Some(Err(e));
                }
            };
            self.page_failures = 0;
            debug!(
                user_id = %self.user_id,
                posts = page.nodes.len(),
                has_next_page = page.has_next_page,
                "fetched post page"
            );
            self.has_next_page =
                page.has_next_page && page.end_cursor.is_some() && !page.nodes.is_empty();
            self.end_cursor = page.end_cursor;
            self.pending.extend(page.nodes);
        }
    }
}

/// In-memory sequence, replayed in order. Useful without a network.
#[derive(Debug, Default)]
pub struct StaticPosts {
    items: VecDeque<Result<Post, CrawlerError>>,
}

impl StaticPosts {
    pub fn new(items: impl IntoIterator<Item = Result<Post, CrawlerError>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl PostSource for StaticPosts {
    async fn next_post(&mut self) -> Option<Result<Post, CrawlerError>> {
        self.items.pop_front()
    }
}
