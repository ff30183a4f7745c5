//! Errors surfaced through [`ResourceStatus`](crate::ResourceStatus)

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use wellsync_queue::QueueError;
use wellsync_storage::StorageError;

/// A failed load or save of a resource
///
/// Cheap to clone so status snapshots can carry it.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ResourceError {
    /// Hydration or refresh could not read the stored value
    #[error("Could not load resource '{key}': {source}")]
    #[diagnostic(
        code(wellsync::resource::load),
        help("The resource keeps its fallback value until a refresh succeeds")
    )]
    Load {
        /// Storage key
        key: String,
        /// Underlying storage failure
        #[source]
        source: Arc<StorageError>,
    },

    /// Persisting a change failed after the queue gave up
    #[error("Could not save resource '{key}': {source}")]
    #[diagnostic(
        code(wellsync::resource::save),
        help("The change was rolled back; retry the edit once storage is reachable")
    )]
    Save {
        /// Storage key
        key: String,
        /// Queue outcome of the persist task
        #[source]
        source: Arc<QueueError<StorageError>>,
    },
}

impl ResourceError {
    /// Create a load error
    #[must_use]
    pub fn load(key: impl Into<String>, source: StorageError) -> Self {
        Self::Load {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    /// Create a save error
    #[must_use]
    pub fn save(key: impl Into<String>, source: QueueError<StorageError>) -> Self {
        Self::Save {
            key: key.into(),
            source: Arc::new(source),
        }
    }

    /// Storage key of the resource
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Load { key, .. } | Self::Save { key, .. } => key,
        }
    }
}
