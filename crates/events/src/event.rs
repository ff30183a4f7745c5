//! Event type definitions for structured wellsync events.
//!
//! Events are categorized by the component that produced them (the task queue
//! or a hydrated resource) and carry enough metadata to be correlated across a
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured wellsync event with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Correlation ID for tracing a session across operations.
    pub correlation_id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Source information for the event.
    pub source: EventSource,
    /// The event category and data.
    pub category: EventCategory,
}

impl SyncEvent {
    /// Create a new event with the given category.
    #[must_use]
    pub fn new(correlation_id: Uuid, source: EventSource, category: EventCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            timestamp: Utc::now(),
            source,
            category,
        }
    }

    /// The dotted event type, as used in the `event_type` tracing field.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.category.event_type()
    }

    /// The queue or resource key this event is about, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.category.key()
    }
}

/// Source information for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    /// The tracing target (e.g., "`wellsync::queue`").
    pub target: String,
    /// Source file path, if available.
    pub file: Option<String>,
    /// Source line number, if available.
    pub line: Option<u32>,
}

impl EventSource {
    /// Create a new event source with just a target.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            file: None,
            line: None,
        }
    }

    /// Create a new event source with file and line information.
    #[must_use]
    pub fn with_location(target: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            target: target.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }
}

/// Event categories organized by component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Task queue lifecycle events.
    Queue(QueueEvent),
    /// Hydrated resource lifecycle events.
    Resource(ResourceEvent),
}

impl EventCategory {
    /// The dotted event type for this category.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Queue(event) => event.event_type(),
            Self::Resource(event) => event.event_type(),
        }
    }

    /// The key this event refers to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Queue(event) => event.key(),
            Self::Resource(event) => Some(event.key()),
        }
    }
}

/// Task queue lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum QueueEvent {
    /// A task was submitted.
    Enqueued {
        /// Task key.
        key: String,
        /// Whether the submission waits out the debounce window.
        debounced: bool,
        /// Whether the task is admitted at the head of the queue.
        priority: bool,
    },
    /// A debounced submission was replaced by a newer one for the same key.
    Superseded {
        /// Task key.
        key: String,
    },
    /// A task entered the runnable queue.
    Admitted {
        /// Task key.
        key: String,
        /// Number of runnable tasks after admission.
        pending: usize,
    },
    /// An attempt of a task started executing.
    Started {
        /// Task key.
        key: String,
        /// 1-based attempt number.
        attempt: u32,
    },
    /// A task finished successfully.
    Completed {
        /// Task key.
        key: String,
        /// Attempts it took.
        attempts: u32,
        /// Duration of the successful attempt in milliseconds.
        duration_ms: u64,
    },
    /// An attempt failed and the task will be retried after a delay.
    Retrying {
        /// Task key.
        key: String,
        /// The attempt that failed.
        attempt: u32,
        /// Delay before the next attempt in milliseconds.
        retry_in_ms: u64,
        /// Rendered error of the failed attempt.
        error: String,
    },
    /// A task exhausted its attempts.
    Failed {
        /// Task key.
        key: String,
        /// Attempts made.
        attempts: u32,
        /// Rendered error of the last attempt.
        error: String,
    },
    /// A pending task was discarded without running.
    Cancelled {
        /// Task key.
        key: String,
        /// Why it was discarded.
        reason: String,
    },
    /// The whole queue was cleared.
    Cleared {
        /// Number of pending tasks that were rejected.
        dropped: usize,
    },
}

impl QueueEvent {
    /// The dotted event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "task.enqueued",
            Self::Superseded { .. } => "task.superseded",
            Self::Admitted { .. } => "task.admitted",
            Self::Started { .. } => "task.started",
            Self::Completed { .. } => "task.completed",
            Self::Retrying { .. } => "task.retrying",
            Self::Failed { .. } => "task.failed",
            Self::Cancelled { .. } => "task.cancelled",
            Self::Cleared { .. } => "queue.cleared",
        }
    }

    /// The task key, if the event concerns a single task.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Enqueued { key, .. }
            | Self::Superseded { key }
            | Self::Admitted { key, .. }
            | Self::Started { key, .. }
            | Self::Completed { key, .. }
            | Self::Retrying { key, .. }
            | Self::Failed { key, .. }
            | Self::Cancelled { key, .. } => Some(key),
            Self::Cleared { .. } => None,
        }
    }
}

/// Hydrated resource lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ResourceEvent {
    /// The initial load finished successfully.
    Hydrated {
        /// Resource storage key.
        key: String,
        /// Whether the value came from the query cache instead of storage.
        from_cache: bool,
    },
    /// Loading failed and the fallback value is in use.
    LoadFailed {
        /// Resource storage key.
        key: String,
        /// Rendered load error.
        error: String,
    },
    /// A mutation was persisted.
    Saved {
        /// Resource storage key.
        key: String,
    },
    /// A mutation failed to persist and the value was reverted.
    RolledBack {
        /// Resource storage key.
        key: String,
        /// Rendered save error.
        error: String,
    },
}

impl ResourceEvent {
    /// The dotted event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Hydrated { .. } => "resource.hydrated",
            Self::LoadFailed { .. } => "resource.load_failed",
            Self::Saved { .. } => "resource.saved",
            Self::RolledBack { .. } => "resource.rolled_back",
        }
    }

    /// The resource key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Hydrated { key, .. }
            | Self::LoadFailed { key, .. }
            | Self::Saved { key }
            | Self::RolledBack { key, .. } => key,
        }
    }
}
