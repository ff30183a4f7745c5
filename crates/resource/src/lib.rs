//! Storage-backed resources for wellsync
//!
//! A [`HydratedResource`] is a typed value that:
//! - Loads from storage once, falling back to a default on failure
//! - Applies changes in memory immediately
//! - Persists changes through the task queue, so writes coalesce and retry
//! - Rolls memory back when a save fails for good
//!
//! Loads and saves never fail the caller's flow; their state is exposed as a
//! [`ResourceStatus`] that can be polled or watched with
//! [`HydratedResource::subscribe`].
//!
//! # Example
//!
//! ```ignore
//! use wellsync_resource::{HydratedResource, ResourceOptions, SyncContext};
//!
//! let context = SyncContext::new(storage, queue);
//! let prefs = HydratedResource::open(context, "prefs", Prefs::default(), ResourceOptions::default()).await;
//!
//! prefs.set_data(|p| Prefs { theme: "dark".into(), ..p.clone() });
//! if let Some(err) = prefs.status().save_error {
//!     tracing::warn!(error = %err, "Preferences not saved");
//! }
//! ```

mod cache;
mod context;
mod error;
mod options;
mod resource;
mod status;

pub use cache::QueryCache;
pub use context::SyncContext;
pub use error::ResourceError;
pub use options::ResourceOptions;
pub use resource::{HydratedResource, PendingSave};
pub use status::{ResourceSnapshot, ResourceStatus};
