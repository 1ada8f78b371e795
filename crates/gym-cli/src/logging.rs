//! Log output for the `gym` binary.
//!
//! The level comes from `RUST_LOG` (default `info`):
//!
//! ```bash
//! RUST_LOG=gym_pool=debug,gym_dao=debug gym clients
//! ```
//!
//! Library crates log through the `log` facade; the subscriber installed here
//! picks those records up as well. Everything goes to stderr so command
//! output on stdout stays clean.

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable, with thread ids
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

/// Install the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already set. Call once at startup.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}
