//! Command line definition

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and update values in a wellsync store
#[derive(Parser, Debug)]
#[command(name = "wellsync", version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to `<config_dir>/wellsync/wellsync.toml`.
    #[arg(long, global = true, env = "WELLSYNC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store directory, overriding `[storage] dir`.
    #[arg(long, global = true, env = "WELLSYNC_STORE", value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub format: TracingFormat,

    /// Print queue and resource events as JSON lines.
    #[arg(long, global = true)]
    pub events: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the stored value for a key.
    Get {
        /// Storage key.
        key: String,
    },
    /// Store a JSON value under a key.
    Set {
        /// Storage key.
        key: String,
        /// JSON value, e.g. '{"theme":"dark"}'.
        value: String,
    },
    /// Delete the stored value for a key.
    Remove {
        /// Storage key.
        key: String,
    },
    /// Apply rapid increments to a counter and report how many writes reached storage.
    Burst {
        /// Storage key.
        key: String,
        /// Number of increments.
        #[arg(long, short = 'n', default_value_t = 10)]
        count: u32,
    },
}
