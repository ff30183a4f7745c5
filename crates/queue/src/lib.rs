//! Write-coalescing task queue for wellsync
//!
//! Sync work for the same logical record is submitted under a key. The queue:
//! - Debounces rapid submissions per key, keeping only the last
//! - Replaces a not-yet-started task when a newer one arrives for its key
//! - Runs admitted tasks one at a time, in admission order
//! - Retries failures with linear backoff before rejecting the caller
//!
//! # Example
//!
//! ```rust,ignore
//! use wellsync_queue::{EnqueueOptions, QueueConfig, TaskQueue};
//!
//! let queue = TaskQueue::new(QueueConfig::default());
//! let handle = queue.enqueue("prefs", || save_prefs(), EnqueueOptions::default());
//! match handle.await {
//!     Ok(saved) => { /* persisted */ }
//!     Err(e) if e.is_superseded() => { /* a newer write replaced this one */ }
//!     Err(e) => tracing::error!(error = %e, "Sync failed"),
//! }
//! ```

mod config;
mod error;
mod handle;
mod job;
mod queue;
mod queued;

pub use config::{ConfigError, EnqueueOptions, QueueConfig};
pub use error::QueueError;
pub use handle::TaskHandle;
pub use queue::TaskQueue;
pub use queued::QueuedSync;
