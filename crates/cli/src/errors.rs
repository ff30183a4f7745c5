//! CLI error types with exit code mapping

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;
use wellsync_resource::ResourceError;
use wellsync_storage::StorageError;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI, configuration or input error exit code
pub const EXIT_CLI: i32 = 2;
/// Storage or sync failure exit code
pub const EXIT_SYNC: i32 = 3;

/// Errors reported by the `wellsync` binary
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Configuration could not be read or is invalid (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(wellsync::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// A value argument is not valid JSON (exit code 2)
    #[error("Invalid JSON value: {message}")]
    #[diagnostic(
        code(wellsync::cli::invalid_value),
        help("Pass a JSON literal such as 42, true, or a quoted string")
    )]
    InvalidValue {
        /// Parser message
        message: String,
    },

    /// A storage operation failed (exit code 3)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    /// A resource load or save failed (exit code 3)
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resource(#[from] ResourceError),
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an invalid value error
    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

/// Exit code for `err`
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } | CliError::InvalidValue { .. } => EXIT_CLI,
        CliError::Storage(_) | CliError::Resource(_) => EXIT_SYNC,
    }
}
