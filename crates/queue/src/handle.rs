//! Completion handle returned by [`TaskQueue::enqueue`](crate::TaskQueue::enqueue).

use crate::error::QueueError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Resolves once the submitted task succeeds, fails terminally, or is
/// discarded.
///
/// The task is already submitted when the handle is created; awaiting the
/// handle only observes the outcome, and dropping it does not cancel the work.
#[derive(Debug)]
#[must_use = "dropping a TaskHandle discards the task outcome; the task still runs"]
pub struct TaskHandle<T, E> {
    key: String,
    receiver: oneshot::Receiver<Result<T, QueueError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(key: String, receiver: oneshot::Receiver<Result<T, QueueError<E>>>) -> Self {
        Self { key, receiver }
    }

    /// Key the task was submitted under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

// The receiver is the only polled field and is itself Unpin.
impl<T, E> Unpin for TaskHandle<T, E> {}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, QueueError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|received| {
            // Sender dropped without an outcome: the queue went away with the task
            received.unwrap_or_else(|_| {
                Err(QueueError::Cancelled {
                    key: this.key.clone(),
                })
            })
        })
    }
}
