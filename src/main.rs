use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error};

use insta_crawler::feed::{self, RunSummary};
use insta_crawler::session::{self, SessionStore, TerminalPrompt};
use insta_crawler::utils::normalize_ist_timestamp;
use insta_crawler::{CrawlConfig, CrawlerError, InstaCrawler};

mod args;
mod logging;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    if let Err(e) = ctrlc::set_handler(|| {
        println!("exiting...");
        std::process::exit(0);
    }) {
        error!(error = %e, "could not install ctrl-c handler");
    }

    match cli.command {
        Command::Posts(args) => run_posts(args.into()).await,
        Command::ConvertDate(args) => {
            let converted = normalize_ist_timestamp(&args.input, args.year);
            println!("Original: '{}' (assuming {})", args.input, args.year);
            println!("Converted: '{}'", converted);
            ExitCode::SUCCESS
        }
    }
}

async fn run_posts(config: CrawlConfig) -> ExitCode {
    let mut out = io::stdout();
    match crawl(&config, &mut out).await {
        Ok(summary) => {
            debug!(
                reported = summary.reported,
                skipped = summary.skipped,
                outcome = ?summary.outcome,
                "run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!(error = ?e, "run failed");
            if let Err(io_err) = feed::report_fatal(&mut out, &e) {
                error!(error = %io_err, "could not write to stdout");
            }
            ExitCode::FAILURE
        }
    }
}

async fn crawl<W: Write>(config: &CrawlConfig, out: &mut W) -> Result<RunSummary, CrawlerError> {
    let mut crawler = InstaCrawler::new(&config.user_agent)?;
    if !config.anonymous {
        let store = SessionStore::new(&config.session_dir);
        let session = session::acquire(
            &store,
            &crawler,
            &TerminalPrompt,
            config.login_username(),
            out,
        )
        .await?;
        crawler = crawler.with_session(&session);
    }

    let profile = crawler.get_profile(&config.target).await?;
    feed::print_profile(out, &profile)?;

    let mut posts = crawler.posts_with_config(&profile, config);
    feed::run(&mut posts, config, out).await
}
