//! Collaborators shared by every resource of an application

use crate::cache::QueryCache;
use std::fmt;
use std::sync::Arc;
use wellsync_queue::TaskQueue;
use wellsync_storage::Storage;

/// The storage backend, task queue and optional cache resources run against
///
/// Build one per application (or per signed-in user) and hand clones to each
/// [`HydratedResource`](crate::HydratedResource).
#[derive(Clone)]
pub struct SyncContext {
    storage: Arc<dyn Storage>,
    queue: TaskQueue,
    cache: Option<Arc<QueryCache>>,
}

impl SyncContext {
    /// Persist through `storage`, serialising writes on `queue`
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, queue: TaskQueue) -> Self {
        Self {
            storage,
            queue,
            cache: None,
        }
    }

    /// Share loaded and saved values through `cache`
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The storage backend
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The queue persist tasks run on
    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// The shared cache, if any
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("storage", &self.storage.backend_name())
            .field("queue", &self.queue)
            .field("cache", &self.cache)
            .finish()
    }
}
