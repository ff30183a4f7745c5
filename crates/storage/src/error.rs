//! Error types for the storage crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for storage operations
///
/// Backends report [`Io`](Self::Io) and [`Codec`](Self::Codec) failures; the
/// storage helpers wrap them in [`Load`](Self::Load), [`Save`](Self::Save) or
/// [`Remove`](Self::Remove) so callers see which key and operation failed.
#[derive(Error, Debug, Diagnostic)]
pub enum StorageError {
    /// Reading or decoding a stored value failed
    #[error("Failed to load persisted data for key \"{key}\"")]
    #[diagnostic(code(wellsync::storage::load))]
    Load {
        /// Storage key
        key: String,
        /// Backend or codec failure
        #[source]
        source: Box<StorageError>,
    },

    /// Encoding or writing a value failed
    #[error("Failed to persist data for key \"{key}\"")]
    #[diagnostic(
        code(wellsync::storage::save),
        help("Check that the storage directory is writable")
    )]
    Save {
        /// Storage key
        key: String,
        /// Backend or codec failure
        #[source]
        source: Box<StorageError>,
    },

    /// Deleting a stored value failed
    #[error("Failed to remove persisted data for key \"{key}\"")]
    #[diagnostic(code(wellsync::storage::remove))]
    Remove {
        /// Storage key
        key: String,
        /// Backend failure
        #[source]
        source: Box<StorageError>,
    },

    /// A value could not be serialized or deserialized
    #[error("Could not convert value for key \"{key}\": {message}")]
    #[diagnostic(
        code(wellsync::storage::codec),
        help("The stored value may have been written by an incompatible version")
    )]
    Codec {
        /// Storage key
        key: String,
        /// Codec error message
        message: String,
    },

    /// I/O error in a storage backend
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(wellsync::storage::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "rename")
        operation: String,
    },
}

impl StorageError {
    /// Create a load error for `key`
    #[must_use]
    pub fn load(key: impl Into<String>, source: Self) -> Self {
        Self::Load {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Create a save error for `key`
    #[must_use]
    pub fn save(key: impl Into<String>, source: Self) -> Self {
        Self::Save {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Create a remove error for `key`
    #[must_use]
    pub fn remove(key: impl Into<String>, source: Self) -> Self {
        Self::Remove {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Create a codec error for `key`
    #[must_use]
    pub fn codec(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Key the failed operation was for, if known
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Load { key, .. }
            | Self::Save { key, .. }
            | Self::Remove { key, .. }
            | Self::Codec { key, .. } => Some(key),
            Self::Io { .. } => None,
        }
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
