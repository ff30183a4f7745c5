//! Outcomes a queued task can be rejected with.

use thiserror::Error;

/// Why a submitted task did not resolve with a value.
///
/// `E` is the error type of the submitted work, so a terminal failure hands
/// the caller the original error of the last attempt.
#[derive(Debug, Error)]
pub enum QueueError<E> {
    /// A newer submission for the same key replaced this one before it started.
    #[error("Task superseded by newer request (key: {key})")]
    Superseded {
        /// Task key.
        key: String,
    },

    /// The pending submission was cancelled with `clear_debounce`.
    #[error("Task cancelled (key: {key})")]
    Cancelled {
        /// Task key.
        key: String,
    },

    /// The queue was cleared before the task could finish.
    #[error("Queue cleared (key: {key})")]
    Cleared {
        /// Task key.
        key: String,
    },

    /// The work panicked. Panics are never retried.
    #[error("Task '{key}' panicked")]
    Panicked {
        /// Task key.
        key: String,
    },

    /// Every attempt failed; `source` is the error of the last one.
    #[error("Task '{key}' failed after {attempts} attempts: {source}")]
    Failed {
        /// Task key.
        key: String,
        /// Attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        #[source]
        source: E,
    },
}

impl<E> QueueError<E> {
    /// Key of the task this error belongs to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Superseded { key }
            | Self::Cancelled { key }
            | Self::Cleared { key }
            | Self::Panicked { key }
            | Self::Failed { key, .. } => key,
        }
    }

    /// Whether the task was replaced by a newer one for the same key.
    ///
    /// This is expected under rapid input and not worth showing to a user.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }

    /// Whether the task was discarded without exhausting its attempts.
    #[must_use]
    pub const fn is_discarded(&self) -> bool {
        matches!(
            self,
            Self::Superseded { .. } | Self::Cancelled { .. } | Self::Cleared { .. }
        )
    }

    /// Number of attempts made, for terminal failures.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Failed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The original error of a terminal failure.
    #[must_use]
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}
