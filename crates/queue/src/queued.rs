//! Reusable queued sync functions.

use crate::config::EnqueueOptions;
use crate::handle::TaskHandle;
use crate::queue::TaskQueue;
use std::fmt::{self, Display};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A sync function bound to a queue.
///
/// Each [`call`](Self::call) derives a task key from its arguments and
/// enqueues the sync under that key, so calls for the same key collapse the
/// way direct submissions do.
///
/// ```rust,ignore
/// let sync = QueuedSync::new(
///     queue,
///     |user: &u64| format!("health-sync-{user}"),
///     |user: u64| async move { upload(user).await },
///     EnqueueOptions::default(),
/// );
/// let outcome = sync.call(42).await;
/// ```
pub struct QueuedSync<A, K, S> {
    queue: TaskQueue,
    key_fn: K,
    sync_fn: Arc<S>,
    options: EnqueueOptions,
    _args: PhantomData<fn(A)>,
}

impl<A, K, S> QueuedSync<A, K, S>
where
    K: Fn(&A) -> String,
{
    /// Bind `sync_fn` to `queue`, keying each call with `key_fn`.
    pub fn new(queue: TaskQueue, key_fn: K, sync_fn: S, options: EnqueueOptions) -> Self {
        Self {
            queue,
            key_fn,
            sync_fn: Arc::new(sync_fn),
            options,
            _args: PhantomData,
        }
    }

    /// Key a call with `args` would be queued under.
    pub fn key_for(&self, args: &A) -> String {
        (self.key_fn)(args)
    }

    /// Enqueue `sync_fn(args)`. Retries call it again with a clone of `args`.
    pub fn call<Fut, T, E>(&self, args: A) -> TaskHandle<T, E>
    where
        A: Clone + Send + 'static,
        S: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let key = (self.key_fn)(&args);
        let sync_fn = Arc::clone(&self.sync_fn);
        self.queue
            .enqueue(key, move || sync_fn(args.clone()), self.options)
    }

    /// The queue calls are submitted to.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

impl<A, K, S> fmt::Debug for QueuedSync<A, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedSync")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
