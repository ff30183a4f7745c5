//! Type-erased units of work held by the queue.
//!
//! The queue stores tasks with different result and error types side by side,
//! so each submission is wrapped in a [`JobCell`] that owns the work closure,
//! the outcome of the latest attempt, and the completion channel back to the
//! caller's [`TaskHandle`](crate::TaskHandle).

use crate::error::QueueError;
use futures::future::BoxFuture;
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;
use tokio::sync::oneshot;

/// Why a task leaves the queue without settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abandon {
    Superseded,
    Cancelled,
    Cleared,
    Panicked,
}

impl Abandon {
    pub(crate) const fn reason(self) -> &'static str {
        match self {
            Self::Superseded => "superseded",
            Self::Cancelled => "cancelled",
            Self::Cleared => "queue cleared",
            Self::Panicked => "panicked",
        }
    }
}

pub(crate) trait Job: Send {
    /// Run the work once and remember the outcome.
    ///
    /// The error is rendered for diagnostics; the typed error stays in the job.
    fn attempt(&mut self) -> BoxFuture<'_, Result<(), String>>;

    /// Deliver the outcome of the last attempt to the caller.
    fn settle(self: Box<Self>, attempts: u32);

    /// Reject the caller without an attempt outcome.
    fn abandon(self: Box<Self>, reason: Abandon);
}

pub(crate) type Completion<T, E> = oneshot::Sender<Result<T, QueueError<E>>>;

pub(crate) struct JobCell<F, T, E> {
    key: String,
    work: F,
    last: Option<Result<T, E>>,
    completion: Completion<T, E>,
}

impl<F, T, E> JobCell<F, T, E> {
    pub(crate) fn new(key: String, work: F, completion: Completion<T, E>) -> Self {
        Self {
            key,
            work,
            last: None,
            completion,
        }
    }

    fn deliver(self, outcome: Result<T, QueueError<E>>) {
        if self.completion.send(outcome).is_err() {
            tracing::debug!(key = %self.key, "Task handle dropped before completion");
        }
    }
}

impl<F, Fut, T, E> Job for JobCell<F, T, E>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send,
    E: Display + Send,
{
    fn attempt(&mut self) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            // Called inside the future so a panicking closure is caught by the drain loop
            let result = (self.work)().await;
            let rendered = result.as_ref().map(|_| ()).map_err(ToString::to_string);
            self.last = Some(result);
            rendered
        })
    }

    fn settle(self: Box<Self>, attempts: u32) {
        let mut this = *self;
        let outcome = match this.last.take() {
            Some(Ok(value)) => Ok(value),
            Some(Err(source)) => Err(QueueError::Failed {
                key: this.key.clone(),
                attempts,
                source,
            }),
            None => Err(QueueError::Cancelled {
                key: this.key.clone(),
            }),
        };
        this.deliver(outcome);
    }

    fn abandon(self: Box<Self>, reason: Abandon) {
        let this = *self;
        let key = this.key.clone();
        let error = match reason {
            Abandon::Superseded => QueueError::Superseded { key },
            Abandon::Cancelled => QueueError::Cancelled { key },
            Abandon::Cleared => QueueError::Cleared { key },
            Abandon::Panicked => QueueError::Panicked { key },
        };
        this.deliver(Err(error));
    }
}

/// A submission moving through the queue.
pub(crate) struct Task {
    pub(crate) key: String,
    pub(crate) job: Box<dyn Job>,
    /// Failed attempts so far.
    pub(crate) retries: u32,
    pub(crate) priority: bool,
    pub(crate) enqueued_at: Instant,
}

impl Task {
    pub(crate) fn new(key: String, job: Box<dyn Job>, priority: bool) -> Self {
        Self {
            key,
            job,
            retries: 0,
            priority,
            enqueued_at: Instant::now(),
        }
    }

    pub(crate) fn abandon(self, reason: Abandon) {
        if reason == Abandon::Superseded {
            wellsync_events::emit_task_superseded!(self.key);
        } else {
            wellsync_events::emit_task_cancelled!(self.key, reason.reason());
        }
        self.job.abandon(reason);
    }
}
