//! The task queue: per-key debouncing, last-writer-wins admission, and a
//! single drain loop that retries failures with linear backoff.
//!
//! # Ordering
//!
//! Tasks run one at a time in admission order (priority submissions jump to
//! the head). A failing task stays at the head while it waits out its backoff,
//! so one key's retries hold back every key behind it. This keeps writes for a
//! resource in the order they were admitted.
//!
//! # Locking
//!
//! The runnable queue, the debounce table, and the processing flag live in one
//! mutex that is never held across an `.await`. Debounce timers identify their
//! submission by ticket, so a timer that fires after its submission was
//! superseded admits nothing.

use crate::config::{EnqueueOptions, QueueConfig};
use crate::handle::TaskHandle;
use crate::job::{Abandon, JobCell, Task};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use wellsync_events::{
    emit_queue_cleared, emit_task_admitted, emit_task_completed, emit_task_enqueued,
    emit_task_failed, emit_task_retrying, emit_task_started,
};

/// Single-consumer, many-producer task runner keyed by task identity.
///
/// Cloning is cheap and every clone drives the same queue. Submissions spawn
/// onto the ambient tokio runtime, so `enqueue` must be called from within one.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    config: QueueConfig,
    state: Mutex<State>,
    next_ticket: AtomicU64,
}

#[derive(Default)]
struct State {
    runnable: VecDeque<Task>,
    debounced: HashMap<String, Debounced>,
    in_flight: Option<String>,
    processing: bool,
    /// Bumped by `clear`; a task started under an older generation is not retried.
    generation: u64,
}

struct Debounced {
    ticket: u64,
    task: Task,
    timer: JoinHandle<()>,
}

impl Debounced {
    fn cancel(self, reason: Abandon) {
        self.timer.abort();
        self.task.abandon(reason);
    }
}

/// What the drain loop does with a task after its last attempt.
enum Settlement {
    Settle(Task, u32),
    Abandon(Task, Abandon),
}

impl Settlement {
    fn apply(self) {
        match self {
            Self::Settle(task, attempts) => task.job.settle(attempts),
            Self::Abandon(task, reason) => task.abandon(reason),
        }
    }
}

impl TaskQueue {
    /// Create a queue with the given policy.
    ///
    /// A `max_attempts` of zero is treated as one.
    #[must_use]
    pub fn new(mut config: QueueConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State::default()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// The policy this queue runs with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Submit `work` under `key`.
    ///
    /// With `options.debounce` the submission waits out the debounce window;
    /// a newer debounced submission for the same key restarts the window and
    /// rejects this one with [`QueueError::Superseded`](crate::QueueError::Superseded). Otherwise it is
    /// admitted immediately. On admission, a not-yet-started task with the same
    /// key is replaced (and rejected as superseded).
    ///
    /// `work` is called once per attempt. The returned handle resolves with the
    /// first successful result, or with [`QueueError::Failed`](crate::QueueError::Failed) carrying the
    /// last error once `max_attempts` attempts have failed.
    pub fn enqueue<F, Fut, T, E>(
        &self,
        key: impl Into<String>,
        work: F,
        options: EnqueueOptions,
    ) -> TaskHandle<T, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let key = key.into();
        let (completion, receiver) = oneshot::channel();
        let job = JobCell::new(key.clone(), work, completion);
        let task = Task::new(key.clone(), Box::new(job), options.priority);

        emit_task_enqueued!(key, options.debounce, options.priority);

        if options.debounce {
            self.debounce(task);
        } else {
            self.admit(task);
        }

        TaskHandle::new(key, receiver)
    }

    /// Cancel the pending debounced submission for `key`, rejecting its caller
    /// with [`QueueError::Cancelled`](crate::QueueError::Cancelled). Returns whether one was pending.
    ///
    /// Tasks already admitted to the runnable queue are unaffected.
    pub fn clear_debounce(&self, key: &str) -> bool {
        let pending = self.inner.state.lock().debounced.remove(key);
        match pending {
            Some(pending) => {
                pending.cancel(Abandon::Cancelled);
                true
            }
            None => false,
        }
    }

    /// Reject every debounced and queued task with [`QueueError::Cleared`](crate::QueueError::Cleared).
    ///
    /// A task that is executing is not interrupted, but it is not retried if
    /// the running attempt fails. Used for teardown such as signing out.
    pub fn clear(&self) {
        let (debounced, queued) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            (
                std::mem::take(&mut state.debounced),
                std::mem::take(&mut state.runnable),
            )
        };

        let dropped = debounced.len() + queued.len();
        for (_, pending) in debounced {
            pending.cancel(Abandon::Cleared);
        }
        for task in queued {
            task.abandon(Abandon::Cleared);
        }

        emit_queue_cleared!(dropped);
    }

    /// Tasks admitted but not finished, including the one executing.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let state = self.inner.state.lock();
        state.runnable.len() + usize::from(state.in_flight.is_some())
    }

    /// Submissions still waiting out their debounce window.
    #[must_use]
    pub fn debounced_count(&self) -> usize {
        self.inner.state.lock().debounced.len()
    }

    /// Whether the drain loop is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.inner.state.lock().processing
    }

    /// Key of the task currently executing or backing off.
    #[must_use]
    pub fn in_flight_key(&self) -> Option<String> {
        self.inner.state.lock().in_flight.clone()
    }

    fn debounce(&self, task: Task) {
        let key = task.key.clone();
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let delay = self.inner.config.debounce;

        let superseded = {
            let mut state = self.inner.state.lock();
            // Spawned under the lock: the timer has to take it before admitting
            let weak = Arc::downgrade(&self.inner);
            let timer_key = key.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                Self::fire_debounce(&weak, &timer_key, ticket);
            });
            state
                .debounced
                .insert(key, Debounced { ticket, task, timer })
        };

        if let Some(previous) = superseded {
            previous.cancel(Abandon::Superseded);
        }
    }

    fn fire_debounce(inner: &Weak<Inner>, key: &str, ticket: u64) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let queue = Self { inner };

        let task = {
            let mut state = queue.inner.state.lock();
            match state.debounced.get(key) {
                Some(pending) if pending.ticket == ticket => {
                    state.debounced.remove(key).map(|pending| pending.task)
                }
                _ => None,
            }
        };

        if let Some(task) = task {
            queue.admit(task);
        }
    }

    fn admit(&self, task: Task) {
        let key = task.key.clone();

        let (replaced, start_drain, pending) = {
            let mut state = self.inner.state.lock();
            let replaced = state
                .runnable
                .iter()
                .position(|queued| queued.key == task.key)
                .and_then(|index| state.runnable.remove(index));

            if task.priority {
                state.runnable.push_front(task);
            } else {
                state.runnable.push_back(task);
            }

            let start_drain = !state.processing;
            state.processing = true;
            let pending = state.runnable.len() + usize::from(state.in_flight.is_some());
            (replaced, start_drain, pending)
        };

        emit_task_admitted!(key, pending);

        if let Some(replaced) = replaced {
            replaced.abandon(Abandon::Superseded);
        }

        if start_drain {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    /// Pop the next task, recording it as in flight, or stop processing.
    fn advance(&self) -> Option<(Task, u64)> {
        let mut state = self.inner.state.lock();
        state.in_flight = None;
        if let Some(task) = state.runnable.pop_front() {
            state.in_flight = Some(task.key.clone());
            Some((task, state.generation))
        } else {
            state.processing = false;
            None
        }
    }

    fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    async fn drain(self) {
        let mut next = self.advance();
        while let Some((task, generation)) = next {
            let settlement = self.run(task, generation).await;
            // Clear the in-flight slot before waking the caller
            next = self.advance();
            settlement.apply();
        }
    }

    async fn run(&self, mut task: Task, generation: u64) -> Settlement {
        debug!(
            key = %task.key,
            waited_ms = elapsed_ms(task.enqueued_at),
            "Task reached head of queue"
        );

        loop {
            let attempt = task.retries + 1;
            emit_task_started!(task.key, attempt);
            let started = Instant::now();

            let outcome = AssertUnwindSafe(task.job.attempt()).catch_unwind().await;

            match outcome {
                Ok(Ok(())) => {
                    emit_task_completed!(task.key, attempt, elapsed_ms(started));
                    return Settlement::Settle(task, attempt);
                }
                Ok(Err(message)) => {
                    task.retries += 1;
                    if task.retries >= self.inner.config.max_attempts {
                        emit_task_failed!(task.key, task.retries, message);
                        let attempts = task.retries;
                        return Settlement::Settle(task, attempts);
                    }
                    if self.generation() != generation {
                        return Settlement::Abandon(task, Abandon::Cleared);
                    }

                    let delay = self.inner.config.backoff(task.retries);
                    emit_task_retrying!(
                        task.key,
                        attempt,
                        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        message
                    );
                    tokio::time::sleep(delay).await;

                    if self.generation() != generation {
                        return Settlement::Abandon(task, Abandon::Cleared);
                    }
                }
                Err(_) => {
                    error!(key = %task.key, attempt, "Task panicked, not retrying");
                    return Settlement::Abandon(task, Abandon::Panicked);
                }
            }
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TaskQueue")
            .field("config", &self.inner.config)
            .field("runnable", &state.runnable.len())
            .field("debounced", &state.debounced.len())
            .field("in_flight", &state.in_flight)
            .field("processing", &state.processing)
            .finish()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
