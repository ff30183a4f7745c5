//! Structured event system for wellsync.
//!
//! The task queue and hydrated resources report their lifecycle through
//! `tracing` macros defined here. [`SyncEventLayer`] captures those events and
//! forwards them to an [`EventBus`], from which any number of consumers (a JSON
//! renderer, the in-memory [`EventHistory`], a UI sync indicator) can read.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wellsync_events::{EventBus, SyncEventLayer, emit_task_started};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let bus = EventBus::new();
//! let layer = SyncEventLayer::new(bus.sender().unwrap().into_inner());
//! tracing_subscriber::registry().with(layer).init();
//!
//! emit_task_started!("health-sync-42", 1u32);
//! ```

pub mod bus;
pub mod event;
pub mod history;
pub mod layer;
pub mod metadata;
pub mod renderers;

pub use bus::{DEFAULT_BUS_CAPACITY, EventBus, EventReceiver, EventSender, SendError};
pub use event::{EventCategory, EventSource, QueueEvent, ResourceEvent, SyncEvent};
pub use history::{DEFAULT_HISTORY_CAPACITY, EventHistory};
pub use layer::SyncEventLayer;
pub use metadata::{correlation_id, set_correlation_id};
pub use renderers::JsonRenderer;

// ============================================================================
// Queue events
// ============================================================================

/// Emit a task enqueued event.
///
/// # Example
/// ```rust,ignore
/// emit_task_enqueued!("prefs", true, false);
/// ```
#[macro_export]
macro_rules! emit_task_enqueued {
    ($key:expr, $debounced:expr, $priority:expr) => {
        ::tracing::debug!(
            target: "wellsync::queue",
            event_type = "task.enqueued",
            key = %$key,
            debounced = $debounced,
            priority = $priority,
            "Task enqueued"
        )
    };
}

/// Emit a task superseded event.
#[macro_export]
macro_rules! emit_task_superseded {
    ($key:expr) => {
        ::tracing::debug!(
            target: "wellsync::queue",
            event_type = "task.superseded",
            key = %$key,
            "Task superseded by newer request"
        )
    };
}

/// Emit a task admitted event.
#[macro_export]
macro_rules! emit_task_admitted {
    ($key:expr, $pending:expr) => {
        ::tracing::debug!(
            target: "wellsync::queue",
            event_type = "task.admitted",
            key = %$key,
            pending = $pending,
            "Task admitted to queue"
        )
    };
}

/// Emit a task started event.
#[macro_export]
macro_rules! emit_task_started {
    ($key:expr, $attempt:expr) => {
        ::tracing::info!(
            target: "wellsync::queue",
            event_type = "task.started",
            key = %$key,
            attempt = $attempt,
            "Processing task"
        )
    };
}

/// Emit a task completed event.
///
/// # Example
/// ```rust,ignore
/// emit_task_completed!("prefs", 1u32, 12u64);
/// ```
#[macro_export]
macro_rules! emit_task_completed {
    ($key:expr, $attempts:expr, $duration_ms:expr) => {
        ::tracing::info!(
            target: "wellsync::queue",
            event_type = "task.completed",
            key = %$key,
            attempts = $attempts,
            duration_ms = $duration_ms,
            "Task completed"
        )
    };
}

/// Emit a task retrying event.
#[macro_export]
macro_rules! emit_task_retrying {
    ($key:expr, $attempt:expr, $retry_in_ms:expr, $error:expr) => {
        ::tracing::warn!(
            target: "wellsync::queue",
            event_type = "task.retrying",
            key = %$key,
            attempt = $attempt,
            retry_in_ms = $retry_in_ms,
            error = %$error,
            "Task failed, retrying"
        )
    };
}

/// Emit a task failed event.
#[macro_export]
macro_rules! emit_task_failed {
    ($key:expr, $attempts:expr, $error:expr) => {
        ::tracing::error!(
            target: "wellsync::queue",
            event_type = "task.failed",
            key = %$key,
            attempts = $attempts,
            error = %$error,
            "Task failed after maximum attempts"
        )
    };
}

/// Emit a task cancelled event.
#[macro_export]
macro_rules! emit_task_cancelled {
    ($key:expr, $reason:expr) => {
        ::tracing::debug!(
            target: "wellsync::queue",
            event_type = "task.cancelled",
            key = %$key,
            reason = %$reason,
            "Pending task cancelled"
        )
    };
}

/// Emit a queue cleared event.
#[macro_export]
macro_rules! emit_queue_cleared {
    ($dropped:expr) => {
        ::tracing::info!(
            target: "wellsync::queue",
            event_type = "queue.cleared",
            dropped = $dropped,
            "Queue cleared"
        )
    };
}

// ============================================================================
// Resource events
// ============================================================================

/// Emit a resource hydrated event.
#[macro_export]
macro_rules! emit_resource_hydrated {
    ($key:expr, $from_cache:expr) => {
        ::tracing::info!(
            target: "wellsync::resource",
            event_type = "resource.hydrated",
            key = %$key,
            from_cache = $from_cache,
            "Resource hydrated"
        )
    };
}

/// Emit a resource load failed event.
#[macro_export]
macro_rules! emit_resource_load_failed {
    ($key:expr, $error:expr) => {
        ::tracing::warn!(
            target: "wellsync::resource",
            event_type = "resource.load_failed",
            key = %$key,
            error = %$error,
            "Resource load failed, using fallback"
        )
    };
}

/// Emit a resource saved event.
#[macro_export]
macro_rules! emit_resource_saved {
    ($key:expr) => {
        ::tracing::debug!(
            target: "wellsync::resource",
            event_type = "resource.saved",
            key = %$key,
            "Resource saved"
        )
    };
}

/// Emit a resource rolled back event.
#[macro_export]
macro_rules! emit_resource_rolled_back {
    ($key:expr, $error:expr) => {
        ::tracing::warn!(
            target: "wellsync::resource",
            event_type = "resource.rolled_back",
            key = %$key,
            error = %$error,
            "Resource save failed, reverted to previous value"
        )
    };
}
