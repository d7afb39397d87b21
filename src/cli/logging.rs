//! Logging and progress bars for the CLI.
//!
//! Requirement text is the only thing reqlock writes to stdout, so every log line and
//! progress bar goes to stderr: compact and animated on a terminal, one JSON object
//! per event otherwise so CI logs stay machine-readable.

use std::io::IsTerminal;
use std::str::FromStr;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::style::ProgressStyle;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

use super::LogArgs;

/// Template of the spinner shown for every compile span.
const SPINNER: &str = "{prefix:.bold.dim} {spinner} {wide_msg}";

//================================================================================================
// Impls
//================================================================================================

impl LogArgs {
    /// The maximum level to log at, given the value of `RUST_LOG` if set.
    pub fn level(&self, rust_log: Option<&str>) -> LevelFilter {
        match self.quiet {
            0 => {},
            1 => return LevelFilter::WARN,
            _ => return LevelFilter::ERROR,
        }
        if let Some(level) = rust_log.and_then(|l| LevelFilter::from_str(l).ok()) {
            return level;
        }
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

//================================================================================================
// Functions
//================================================================================================

/// Installs the global subscriber. Logs are flushed when the guard drops.
pub fn init(args: LogArgs) -> WorkerGuard {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = args.level(rust_log.as_deref());
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let progress = IndicatifLayer::new().with_progress_style(
        ProgressStyle::with_template(SPINNER).unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let events = if std::io::stderr().is_terminal() {
        fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(progress.get_stderr_writer())
            .compact()
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(events)
        .with(filter)
        .with(progress)
        .init();
    tracing::trace!(%level, "logging initialized");

    guard
}

/// Logs the error that ends the process, with its whole chain of causes.
pub fn fatal(error: &anyhow::Error) {
    tracing::error!(fatal = true, "{:#}", error);
}
