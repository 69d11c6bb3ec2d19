//! Logging setup.
//!
//! placejournal logs through `tracing`. The binary installs one
//! `tracing-subscriber` registry at startup; its filter comes from
//! `PLACEJOURNAL_LOG`, then `RUST_LOG`, then the command-line verbosity.
//! Log lines always go to stderr so that listings and JSON on stdout can be
//! piped.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding a filter directive for this crate.
pub const LOG_ENV: &str = "PLACEJOURNAL_LOG";

/// How much the binary logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Warnings, such as a journal that could not be parsed.
    #[default]
    Normal,
    /// Flow decisions and device answers (`-v`).
    Verbose,
    /// Everything (`-vv`).
    Trace,
}

impl Verbosity {
    /// Pick the verbosity for the `-q` and `-v` flags. Quiet wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The tracing level for this verbosity.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when no environment override is set.
    #[must_use]
    pub fn directive(self) -> String {
        format!("placejournal={}", self.level())
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; only the first call takes effect.
///
/// ```no_run
/// use placejournal::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    // Targets only help when following a flow across modules
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

/// Route logs to the test harness, warnings and above.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("placejournal=warn")
        .with_test_writer()
        .try_init();
}
