//! This crate configures logging for the planner. Logging goes through the [tracing] family of
//! crates; code elsewhere should use its primitives (`debug!`, `trace_span!`, ...) directly and
//! leave subscriber setup to this crate.

use clap::Args;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod logformat;
pub use logformat::LogFormat;

/// Errors that can occur while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse filter: {0}")]
    Parse(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, Args)]
#[group(id = "logging")]
pub struct Options {
    /// Log level filter for spans and events. The log level filter string is a comma separated
    /// list of directives.
    /// See [`tracing_subscriber::EnvFilter`] for full documentation on the directive syntax.
    ///
    /// Examples:
    ///
    /// Log at INFO level for all crates and dependencies.
    /// ```bash
    /// LOG_LEVEL=info
    /// ```
    ///
    /// Log at TRACE level for the planner only.
    /// ```bash
    /// LOG_LEVEL=warn,queryplan=trace
    /// ```
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Format to use when emitting log events.
    #[arg(long, env = "LOG_FORMAT", default_value = "full", value_enum)]
    pub log_format: LogFormat,

    /// Disable colors in all log output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: LogFormat::Full,
            no_color: false,
        }
    }
}

impl Options {
    /// Build the [`EnvFilter`] described by [`Options::log_level`].
    pub fn env_filter(&self) -> Result<EnvFilter, Error> {
        Ok(EnvFilter::try_new(&self.log_level)?)
    }

    /// Install a global subscriber according to these options.
    ///
    /// # Example
    /// ```rust
    /// use clap::Parser;
    ///
    /// #[derive(Debug, Parser)]
    /// struct Options {
    ///     #[command(flatten)]
    ///     logging: queryplan_tracing::Options,
    /// }
    ///
    /// let options = Options::parse_from(["planner", "--log-level", "debug"]);
    /// options.logging.init().unwrap();
    /// ```
    pub fn init(&self) -> Result<(), Error> {
        let subscriber = tracing_subscriber::registry().with(self.env_filter()?);
        let fmt_layer = fmt::layer().with_ansi(!self.no_color);

        match self.log_format {
            LogFormat::Compact => subscriber.with(fmt_layer.compact()).try_init()?,
            LogFormat::Full => subscriber.with(fmt_layer).try_init()?,
            LogFormat::Pretty => subscriber.with(fmt_layer.pretty()).try_init()?,
            LogFormat::Json => subscriber
                .with(fmt_layer.json().with_current_span(true))
                .try_init()?,
        }

        #[cfg(debug_assertions)]
        tracing::warn!("Running a debug build");

        Ok(())
    }
}

/// Install a subscriber suitable for tests, filtered by the `LOG_LEVEL` environment variable and
/// writing through the test harness' captured output.
pub fn init_test_logging() {
    // This errors out if it's already been called within the scope of a process, which we don't
    // care about, so we just discard the result
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("LOG_LEVEL"))
        .with_test_writer()
        .try_init();
}
