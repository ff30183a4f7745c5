//! A typed value bound to durable storage.
//!
//! [`HydratedResource`] loads its value once, applies changes to memory
//! immediately, persists them through the [`TaskQueue`](wellsync_queue::TaskQueue)
//! and rolls memory back when a save fails for good. Failures never escape as
//! errors from [`set_data`](HydratedResource::set_data); they show up in
//! [`ResourceStatus`].

use crate::context::SyncContext;
use crate::error::ResourceError;
use crate::options::ResourceOptions;
use crate::status::{ResourceSnapshot, ResourceStatus};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use wellsync_events::{
    emit_resource_hydrated, emit_resource_load_failed, emit_resource_rolled_back,
    emit_resource_saved,
};
use wellsync_queue::{QueueError, TaskHandle};
use wellsync_storage::{StorageError, load_from_storage, save_to_storage};

/// A storage-backed value with optimistic updates.
///
/// Cloning is cheap; clones share the value, status and subscribers.
///
/// Saves are queued under [`persist_key`](Self::persist_key). Two separate
/// resources opened over the same key and queue replace each other's pending
/// saves: the last submitted value is stored, and the other resource keeps its
/// own value in memory without a `save_error`. Share one resource (clone it)
/// per key, or call [`refresh`](Self::refresh) to pick up what was stored.
pub struct HydratedResource<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for HydratedResource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Shared<T> {
    key: String,
    query_key: String,
    persist_key: String,
    fallback: T,
    options: ResourceOptions<T>,
    context: SyncContext,
    state: watch::Sender<ResourceSnapshot<T>>,
    ledger: Mutex<Ledger<T>>,
    hydration: OnceCell<()>,
}

/// Bookkeeping that decides what a failed save rolls back to.
struct Ledger<T> {
    /// Last value known to match storage
    last_good: T,
    /// Sequence number of the newest change
    latest: u64,
    /// Sequence number of the newest change known to be stored
    confirmed: u64,
    /// Saves not yet settled
    saving: usize,
    /// Memory was set by a change or refresh; hydration must not overwrite it
    touched: bool,
}

impl<T> HydratedResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a resource for `key` holding `fallback` until hydrated.
    ///
    /// Nothing is read until [`initialize`](Self::initialize) is awaited.
    pub fn new(
        context: SyncContext,
        key: impl Into<String>,
        fallback: T,
        options: ResourceOptions<T>,
    ) -> Self {
        let key = key.into();
        let query_key = options.query_key.clone().unwrap_or_else(|| key.clone());
        let (state, _) = watch::channel(ResourceSnapshot {
            data: fallback.clone(),
            status: ResourceStatus::default(),
        });

        Self {
            inner: Arc::new(Shared {
                persist_key: format!("persist:{key}"),
                key,
                query_key,
                ledger: Mutex::new(Ledger {
                    last_good: fallback.clone(),
                    latest: 0,
                    confirmed: 0,
                    saving: 0,
                    touched: false,
                }),
                fallback,
                options,
                context,
                state,
                hydration: OnceCell::new(),
            }),
        }
    }

    /// Create a resource and wait for its initial load.
    pub async fn open(
        context: SyncContext,
        key: impl Into<String>,
        fallback: T,
        options: ResourceOptions<T>,
    ) -> Self {
        let resource = Self::new(context, key, fallback, options);
        resource.initialize().await;
        resource
    }

    /// Load the stored value, once.
    ///
    /// A cached value for the query key is used without touching storage.
    /// Otherwise storage is read with `load_attempts` attempts; if all fail the
    /// fallback stays in place and `status.load_error` is set. Later calls
    /// return immediately.
    pub async fn initialize(&self) {
        self.inner
            .hydration
            .get_or_init(|| self.inner.hydrate())
            .await;
    }

    /// Apply `updater` to the current value and persist the result.
    ///
    /// The new value is visible through [`data`](Self::data) before this
    /// returns. Persisting happens in the background on the queue; if it fails
    /// after the queue's retries, the value is rolled back to the last one
    /// known to be stored and `status.save_error` is set. Awaiting the returned
    /// [`PendingSave`] waits for that outcome and yields the new value either
    /// way.
    ///
    /// The updater runs under the resource's lock and must not call back into
    /// this resource.
    pub fn set_data<F>(&self, updater: F) -> PendingSave<T>
    where
        F: FnOnce(&T) -> T,
    {
        let shared = &self.inner;
        let (next, seq) = {
            let mut ledger = shared.ledger.lock();
            let next = {
                let current = shared.state.borrow();
                updater(&current.data)
            };
            ledger.latest += 1;
            ledger.saving += 1;
            ledger.touched = true;

            shared.state.send_modify(|snapshot| {
                snapshot.data = next.clone();
                snapshot.status.is_saving = true;
                snapshot.status.save_error = None;
            });
            (next, ledger.latest)
        };

        let handle = shared.enqueue_persist(next.clone());
        let settled = tokio::spawn(Arc::clone(shared).settle(seq, next.clone(), handle));

        PendingSave {
            value: next,
            settled,
        }
    }

    /// Replace the value with `value`.
    pub fn replace(&self, value: T) -> PendingSave<T> {
        self.set_data(move |_| value)
    }

    /// Replace the value with the fallback.
    pub fn reset(&self) -> PendingSave<T> {
        self.replace(self.inner.fallback.clone())
    }

    /// Re-read the stored value, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns the load failure after resetting the value to the fallback and
    /// recording the failure in `status.load_error`.
    pub async fn refresh(&self) -> Result<T, ResourceError> {
        let shared = &self.inner;
        shared.state.send_modify(|snapshot| snapshot.status.load_error = None);

        match shared.load_once().await {
            Ok(value) => {
                {
                    let mut ledger = shared.ledger.lock();
                    ledger.last_good = value.clone();
                    ledger.touched = true;
                    shared.state.send_modify(|snapshot| snapshot.data = value.clone());
                }
                shared.cache(&value);
                emit_resource_hydrated!(shared.key, false);
                Ok(value)
            }
            Err(error) => {
                let error = ResourceError::load(&shared.key, error);
                {
                    let mut ledger = shared.ledger.lock();
                    ledger.touched = true;
                    shared.state.send_modify(|snapshot| {
                        snapshot.data = shared.fallback.clone();
                        snapshot.status.load_error = Some(error.clone());
                    });
                }
                emit_resource_load_failed!(shared.key, error);
                Err(error)
            }
        }
    }

    /// The current value.
    #[must_use]
    pub fn data(&self) -> T {
        self.inner.state.borrow().data.clone()
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> ResourceStatus {
        self.inner.state.borrow().status.clone()
    }

    /// Value and status, read together.
    #[must_use]
    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        self.inner.state.borrow().clone()
    }

    /// Receive every change of value or status.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceSnapshot<T>> {
        self.inner.state.subscribe()
    }
}

impl<T> HydratedResource<T> {
    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Cache key.
    #[must_use]
    pub fn query_key(&self) -> &str {
        &self.inner.query_key
    }

    /// Queue key persist tasks run under.
    #[must_use]
    pub fn persist_key(&self) -> &str {
        &self.inner.persist_key
    }

    /// Value used before hydration and after a failed load.
    #[must_use]
    pub fn fallback(&self) -> &T {
        &self.inner.fallback
    }
}

impl<T> fmt::Debug for HydratedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HydratedResource")
            .field("key", &self.inner.key)
            .field("query_key", &self.inner.query_key)
            .finish_non_exhaustive()
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn hydrate(&self) {
        self.state
            .send_modify(|snapshot| snapshot.status.is_loading = true);

        if let Some(value) = self
            .context
            .cache()
            .and_then(|cache| cache.get::<T>(&self.query_key))
        {
            self.apply_loaded(value, true);
            return;
        }

        match self.load_with_retry().await {
            Ok(value) => {
                self.cache(&value);
                self.apply_loaded(value, false);
            }
            Err(error) => {
                let error = ResourceError::load(&self.key, error);
                self.state.send_modify(|snapshot| {
                    snapshot.status.load_error = Some(error.clone());
                    snapshot.status.is_loading = false;
                    snapshot.status.is_hydrated = true;
                });
                emit_resource_load_failed!(self.key, error);
            }
        }
    }

    fn apply_loaded(&self, value: T, from_cache: bool) {
        {
            let mut ledger = self.ledger.lock();
            let keep_local = ledger.touched;
            if !keep_local {
                ledger.last_good = value.clone();
            }
            self.state.send_modify(|snapshot| {
                if !keep_local {
                    snapshot.data = value;
                }
                snapshot.status.load_error = None;
                snapshot.status.is_loading = false;
                snapshot.status.is_hydrated = true;
            });
            if keep_local {
                debug!(key = %self.key, "Changed before hydration finished, keeping local value");
            }
        }
        emit_resource_hydrated!(self.key, from_cache);
    }

    async fn load_once(&self) -> Result<T, StorageError> {
        load_from_storage(
            self.context.storage().as_ref(),
            &self.key,
            self.fallback.clone(),
            &self.options.codec,
        )
        .await
    }

    async fn load_with_retry(&self) -> Result<T, StorageError> {
        let attempts = self.options.load_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.load_once().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts => {
                    warn!(
                        key = %self.key,
                        attempt,
                        max_attempts = attempts,
                        error = %error,
                        "Load failed, retrying"
                    );
                    tokio::time::sleep(self.options.load_retry_delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn cache(&self, value: &T) {
        if let Some(cache) = self.context.cache() {
            cache.set(self.query_key.clone(), value.clone());
        }
    }

    fn enqueue_persist(&self, value: T) -> TaskHandle<(), StorageError> {
        let storage = Arc::clone(self.context.storage());
        let codec = self.options.codec.clone();
        let key = self.key.clone();

        self.context.queue().enqueue(
            self.persist_key.clone(),
            move || {
                let storage = Arc::clone(&storage);
                let codec = codec.clone();
                let key = key.clone();
                let value = value.clone();
                async move { save_to_storage(storage.as_ref(), &key, &value, &codec).await }
            },
            self.options.persist,
        )
    }

    async fn settle(self: Arc<Self>, seq: u64, value: T, handle: TaskHandle<(), StorageError>) {
        let outcome = handle.await;

        let mut ledger = self.ledger.lock();
        ledger.saving = ledger.saving.saturating_sub(1);
        let saving = ledger.saving > 0;

        match outcome {
            Ok(()) => {
                let newest = seq == ledger.latest;
                // An older save finishing late must not replace a newer confirmed value
                if seq >= ledger.confirmed {
                    ledger.confirmed = seq;
                    ledger.last_good = value.clone();
                }
                self.state.send_modify(|snapshot| {
                    snapshot.status.is_saving = saving;
                    if newest {
                        snapshot.status.save_error = None;
                    }
                });
                drop(ledger);
                self.cache(&value);
                emit_resource_saved!(self.key);
            }
            Err(QueueError::Superseded { .. }) => {
                if seq == ledger.latest {
                    // Replaced by a save submitted outside this resource under the same key
                    warn!(
                        key = %self.key,
                        persist_key = %self.persist_key,
                        "Save replaced by another writer, local value may differ from storage"
                    );
                }
                self.state
                    .send_modify(|snapshot| snapshot.status.is_saving = saving);
            }
            Err(error) if seq < ledger.confirmed => {
                // A newer change is already stored
                self.state
                    .send_modify(|snapshot| snapshot.status.is_saving = saving);
                drop(ledger);
                debug!(key = %self.key, error = %error, "Older save failed after a newer one succeeded");
            }
            Err(error) => {
                let error = ResourceError::save(&self.key, error);
                // Only the newest change rolls back; an older failure must not
                // clobber an edit that is still being saved
                let rollback = (seq == ledger.latest).then(|| ledger.last_good.clone());
                let rolled_back = rollback.is_some();
                self.state.send_modify(|snapshot| {
                    if let Some(previous) = rollback {
                        snapshot.data = previous;
                    }
                    snapshot.status.save_error = Some(error.clone());
                    snapshot.status.is_saving = saving;
                });
                drop(ledger);

                if rolled_back {
                    emit_resource_rolled_back!(self.key, error);
                } else {
                    warn!(key = %self.key, error = %error, "Save failed, newer change pending");
                }
            }
        }
    }
}

/// The outcome of a [`set_data`](HydratedResource::set_data) call.
///
/// The change is already applied in memory and queued for saving. Awaiting
/// this waits until the save settles and returns the new value whether or not
/// it was stored; check `status.save_error` for failures. Dropping it does not
/// cancel the save.
pub struct PendingSave<T> {
    value: T,
    settled: JoinHandle<()>,
}

impl<T> PendingSave<T> {
    /// The value that was applied.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> IntoFuture for PendingSave<T>
where
    T: Send + 'static,
{
    type Output = T;
    type IntoFuture = BoxFuture<'static, T>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            if let Err(e) = self.settled.await {
                warn!(error = %e, "Save settlement task ended abnormally");
            }
            self.value
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for PendingSave<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSave")
            .field("value", &self.value)
            .field("settled", &self.settled.is_finished())
            .finish()
    }
}
