//! The fetch-and-report loop and its console output.

use std::io::{self, Write};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::error::{CrawlerError, ErrorKind};
use crate::models::{Post, Profile};
use crate::retry::{on_item_error, ItemAction};
use crate::source::PostSource;
use crate::utils::caption_preview;

const SEPARATOR: &str = "--------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `max_posts` were reported; the sequence may have had more.
    LimitReached,
    /// The sequence ended first.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reported: usize,
    pub skipped: usize,
    pub outcome: RunOutcome,
}

pub fn print_profile<W: Write>(out: &mut W, profile: &Profile) -> io::Result<()> {
    writeln!(out, "Profile loaded: {}", profile)?;
    writeln!(
        out,
        "Followers: {}, Following: {}",
        profile.followers, profile.followees
    )?;
    writeln!(out, "Posts: {}", profile.media_count)?;
    writeln!(out, "{}", SEPARATOR)
}

pub fn print_post<W: Write>(out: &mut W, index: usize, post: &Post) -> io::Result<()> {
    writeln!(out, "Post {}:", index)?;
    writeln!(out, "URL: {}", post.url)?;
    writeln!(out, "Date: {}", post.taken_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Likes: {}", post.likes)?;
    writeln!(out, "Comments: {}", post.comments)?;
    writeln!(out, "Caption: {}", caption_preview(post.caption.as_deref()))?;
    writeln!(out, "{}", SEPARATOR)
}

/// Pull posts from `source` and print them until `max_posts` are reported
/// or the sequence ends.
///
/// Failed posts are handled by [`on_item_error`] and never count toward
/// the limit. Any number of them is tolerated; only a fatal error ends the
/// run early. A source that keeps failing on one page reports that as
/// [`CrawlerError::TooManyFailures`], which is fatal.
pub async fn run<S, W>(
    source: &mut S,
    config: &CrawlConfig,
    out: &mut W,
) -> Result<RunSummary, CrawlerError>
where
    S: PostSource + ?Sized,
    W: Write,
{
    let mut reported = 0;
    let mut skipped = 0;

    if config.max_posts == 0 {
        return Ok(RunSummary {
            reported,
            skipped,
            outcome: RunOutcome::LimitReached,
        });
    }

    while let Some(next) = source.next_post().await {
        let post = match next {
            Ok(post) => post,
            Err(e) => {
                match on_item_error(&e, config) {
                    ItemAction::SkipAfter(delay) => {
                        warn!(
                            error = %e,
                            backoff_secs = delay.as_secs(),
                            "connection error for post"
                        );
                        writeln!(out, "Connection error for post: {}", e)?;
                        writeln!(
                            out,
                            "Waiting {} seconds before continuing...",
                            delay.as_secs()
                        )?;
                        out.flush()?;
                        sleep(delay).await;
                    }
                    ItemAction::Skip => {
                        warn!(error = %e, "skipping post");
                        writeln!(out, "Error processing post: {}", e)?;
                    }
                    ItemAction::Abort => return Err(e),
                }
                skipped += 1;
                continue;
            }
        };

        print_post(out, reported + 1, &post)?;
        reported += 1;
        if reported >= config.max_posts {
            writeln!(
                out,
                "Reached limit of {} posts to avoid rate limiting",
                config.max_posts
            )?;
            return Ok(RunSummary {
                reported,
                skipped,
                outcome: RunOutcome::LimitReached,
            });
        }

        out.flush()?;
        debug!(delay_ms = config.item_delay.as_millis() as u64, "waiting before next post");
        sleep(config.item_delay).await;
    }

    writeln!(out, "No more posts available ({} reported)", reported)?;
    Ok(RunSummary {
        reported,
        skipped,
        outcome: RunOutcome::Exhausted,
    })
}

/// Print the message for an error that ends the run.
pub fn report_fatal<W: Write>(out: &mut W, error: &CrawlerError) -> io::Result<()> {
    match error {
        CrawlerError::LoginFailed(msg) => {
            writeln!(out, "Login failed: {}", msg)?;
            writeln!(
                out,
                "Please run this script interactively or provide login credentials"
            )
        }
        CrawlerError::LoginRequired => writeln!(
            out,
            "Login is required to access this profile. Please run with login."
        ),
        e if e.kind() == ErrorKind::Connectivity => {
            writeln!(out, "Connection error: {}", e)?;
            writeln!(
                out,
                "Instagram may be rate limiting. Try again later or with login."
            )
        }
        e => writeln!(out, "Unexpected error: {}", e),
    }
}
