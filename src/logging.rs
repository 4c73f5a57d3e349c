//! Logging setup
//!
//! Logs go to stderr so that stdout only ever carries the result CSV.
//! `RUST_LOG`, when set, takes precedence over the `--log-level` flag.

use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default verbosity when `RUST_LOG` is not set
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global subscriber
///
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(level: LogLevel, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(false);
        registry.with(layer).try_init()
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()
    };

    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LogLevel::Error, "error")]
    #[case(LogLevel::Warn, "warn")]
    #[case(LogLevel::Info, "info")]
    #[case(LogLevel::Debug, "debug")]
    #[case(LogLevel::Trace, "trace")]
    fn test_level_names(#[case] level: LogLevel, #[case] expected: &str) {
        assert_eq!(level.as_str(), expected);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LogLevel::Warn, false);
        init_logging(LogLevel::Debug, true);
    }
}
