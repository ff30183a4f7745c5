//! Queue timing configuration and per-submission options.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Timing and retry policy for a [`TaskQueue`](crate::TaskQueue).
///
/// Deserialises from millisecond fields so it can sit in a `[queue]` table of
/// a TOML config file:
///
/// ```toml
/// [queue]
/// debounce_ms = 500
/// max_attempts = 3
/// retry_delay_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Quiet period a debounced submission waits before admission.
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,

    /// Total attempts before a failing task is rejected.
    #[serde(alias = "max_retries")]
    pub max_attempts: u32,

    /// Base retry delay; the n-th retry waits `retry_delay * n`.
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            max_attempts: default_max_attempts(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl QueueConfig {
    /// Set the debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the number of attempts per task.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Delay before the attempt following `failures` failed ones.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        self.retry_delay.saturating_mul(failures)
    }

    /// Check the configuration for values the queue cannot honour.
    ///
    /// # Errors
    ///
    /// Returns an error when `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn default_debounce() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

/// Invalid queue configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value the queue cannot use.
    #[error("Invalid queue configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// How a single submission enters the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Wait out the debounce window, collapsing rapid repeats for the key.
    pub debounce: bool,
    /// Admit at the head of the runnable queue instead of the tail.
    pub priority: bool,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            debounce: true,
            priority: false,
        }
    }
}

impl EnqueueOptions {
    /// Debounced, tail-admitted submission (the default).
    #[must_use]
    pub fn debounced() -> Self {
        Self::default()
    }

    /// Submission admitted to the runnable queue right away.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            debounce: false,
            priority: false,
        }
    }

    /// Admit at the head of the queue.
    #[must_use]
    pub const fn prioritized(mut self) -> Self {
        self.priority = true;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
