//! Subscriber setup for the command line.
//!
//! The filter is taken from, in order: the `--log-level` flag, the
//! `KUMITATE_LOG` environment variable, and finally `info`. Log lines are
//! written through the progress bar writer so that the task spinners stay
//! at the bottom of the terminal.

use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "KUMITATE_LOG";

/// Install the global subscriber. Fails when one is already installed or the
/// filter directive does not parse.
pub fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => match std::env::var(LOG_ENV) {
            Ok(directives) => EnvFilter::try_new(directives)?,
            Err(_) => EnvFilter::new("info"),
        },
    };

    let indicatif = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(indicatif.get_stderr_writer()),
        )
        .with(indicatif)
        .try_init()?;

    Ok(())
}
