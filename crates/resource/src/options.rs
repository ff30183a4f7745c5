//! Per-resource options

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use wellsync_queue::EnqueueOptions;
use wellsync_storage::Codec;

/// How a [`HydratedResource`](crate::HydratedResource) loads and persists
#[derive(Debug, Clone)]
pub struct ResourceOptions<T> {
    /// Cache key; defaults to the storage key
    pub query_key: Option<String>,
    /// Encoding of the stored value
    pub codec: Codec<T>,
    /// Attempts for the initial load (2: one retry)
    pub load_attempts: u32,
    /// Wait between load attempts
    pub load_retry_delay: Duration,
    /// How persist tasks enter the queue
    pub persist: EnqueueOptions,
}

impl<T> ResourceOptions<T> {
    /// Defaults with the given codec
    #[must_use]
    pub fn with_codec(codec: Codec<T>) -> Self {
        Self {
            query_key: None,
            codec,
            load_attempts: 2,
            load_retry_delay: Duration::from_secs(1),
            persist: EnqueueOptions::default(),
        }
    }

    /// Set the cache key
    #[must_use]
    pub fn query_key(mut self, query_key: impl Into<String>) -> Self {
        self.query_key = Some(query_key.into());
        self
    }

    /// Set the number of initial load attempts
    #[must_use]
    pub const fn load_attempts(mut self, attempts: u32) -> Self {
        self.load_attempts = attempts;
        self
    }

    /// Set the wait between load attempts
    #[must_use]
    pub const fn load_retry_delay(mut self, delay: Duration) -> Self {
        self.load_retry_delay = delay;
        self
    }

    /// Set how persist tasks are enqueued
    #[must_use]
    pub const fn persist(mut self, persist: EnqueueOptions) -> Self {
        self.persist = persist;
        self
    }
}

impl<T> Default for ResourceOptions<T>
where
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::with_codec(Codec::json())
    }
}
