//! Tracing configuration for the wellsync CLI
//!
//! Diagnostics go to stderr through a fmt layer filtered by `RUST_LOG` (or
//! `--level`). Queue and resource events are captured separately by a
//! [`SyncEventLayer`] that sees every `wellsync::*` event regardless of level.

use crate::errors::CliError;
use std::io;
pub use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};
use wellsync_events::{EventSender, SyncEventLayer};

/// Shape of the stderr diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Multi-line, with targets and span context
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON for log collectors
    Json,
}

/// Verbosity picked with `-L/--level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum LogLevel {
    /// Every debounce timer and backoff sleep
    Trace,
    /// Queue admissions and hydration decisions
    Debug,
    /// Command summaries
    Info,
    /// Retries and rollbacks only
    Warn,
    /// Terminal failures only
    Error,
}

impl LogLevel {
    /// `tracing` level with the same threshold
    #[must_use]
    pub const fn as_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Filter directive scoping this level to the wellsync crates
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Trace => "wellsync=trace",
            Self::Debug => "wellsync=debug",
            Self::Info => "wellsync=info",
            Self::Warn => "wellsync=warn",
            Self::Error => "wellsync=error",
        }
    }
}

/// How `init_tracing` sets up stderr output
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output shape
    pub format: TracingFormat,
    /// Verbosity when `RUST_LOG` is unset
    pub level: LogLevel,
    /// Directives that win over both `RUST_LOG` and `level`
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: LogLevel::Warn,
            filter: None,
        }
    }
}

fn env_filter(config: &TracingConfig) -> Result<EnvFilter, CliError> {
    let filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.level.directive())),
    };
    filter.map_err(|e| {
        CliError::config_with_help(
            format!("Invalid log filter: {e}"),
            "Use directives like `wellsync=debug` or `wellsync::queue=trace`",
        )
    })
}

/// Install tracing for the current thread.
///
/// When `events` is given, a [`SyncEventLayer`] forwards queue and resource
/// events to it. Dropping the returned guard uninstalls the subscriber and
/// releases the event sender, which lets the event bus drain and close.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the filter directives are invalid.
pub fn init_tracing(
    config: &TracingConfig,
    events: Option<EventSender>,
) -> Result<DefaultGuard, CliError> {
    let filter = env_filter(config)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        TracingFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        TracingFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_target(false)
            .boxed(),
        TracingFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    };

    let guard = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(events.map(|sender| SyncEventLayer::new(sender.into_inner())))
        .set_default();

    tracing::debug!(
        level = %config.level.as_level(),
        format = ?config.format,
        correlation_id = %wellsync_events::correlation_id(),
        "Diagnostics enabled"
    );

    Ok(guard)
}
