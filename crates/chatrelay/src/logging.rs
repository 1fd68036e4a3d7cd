//! Tracing subscriber setup.

use anyhow::{Context, Result};
use chatrelay_settings::{LogFormat, LoggingSettings};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter from `RUST_LOG` when set, otherwise from `settings.level`.
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

/// Install the global subscriber. Logs go to stderr.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let filter = env_filter(settings);
    let installed = match settings.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true));
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true),
            );
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    installed.context("failed to install tracing subscriber")
}
