use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::args::LogLevel;

/// Initialize logging to stderr so stdout only carries the report.
///
/// Directives in `RUST_LOG` are applied on top of `level`.
pub fn init_logging(level: LogLevel) {
    let level: Level = level.into();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
