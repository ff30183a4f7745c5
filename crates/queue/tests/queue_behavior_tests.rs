//! Behavioral tests for the task queue: coalescing, serialization, retries,
//! and cancellation.
//!
//! All tests run on a paused clock so debounce windows and backoff delays
//! elapse deterministically.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use wellsync_queue::{EnqueueOptions, QueueConfig, QueueError, TaskQueue};

fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Work that records `label` and succeeds with it.
fn record(
    log: &Arc<Mutex<Vec<&'static str>>>,
    label: &'static str,
) -> impl FnMut() -> futures::future::Ready<Result<&'static str, String>> + Send + 'static {
    let log = Arc::clone(log);
    move || {
        log.lock().push(label);
        futures::future::ready(Ok(label))
    }
}

/// Work that fails `failures` times before succeeding with `value`.
fn flaky(
    calls: &Arc<AtomicUsize>,
    failures: usize,
    value: u32,
) -> impl FnMut() -> futures::future::Ready<Result<u32, String>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= failures {
            futures::future::ready(Err(format!("attempt {attempt} failed")))
        } else {
            futures::future::ready(Ok(value))
        }
    }
}

/// Let spawned tasks run without moving past any pending timer.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Coalescing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_single_task_resolves_and_drains() {
    let queue = TaskQueue::default();

    let handle = queue.enqueue(
        "user:42",
        || async { Ok::<_, String>(1) },
        EnqueueOptions::default(),
    );

    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(queue.pending_count(), 0);
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn test_debounced_burst_runs_only_last_submission() {
    let queue = TaskQueue::default();
    let log = recorder();

    let first = queue.enqueue("save", record(&log, "fail"), EnqueueOptions::default());
    sleep(Duration::from_millis(10)).await;
    let second = queue.enqueue("save", record(&log, "succeed"), EnqueueOptions::default());

    let err = first.await.unwrap_err();
    assert!(err.is_superseded());
    assert!(err.to_string().contains("superseded"));

    assert_eq!(second.await.unwrap(), "succeed");
    assert_eq!(*log.lock(), vec!["succeed"]);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_rejects_before_window_ends() {
    let queue = TaskQueue::default();
    let log = recorder();
    let start = Instant::now();

    let first = queue.enqueue("save", record(&log, "first"), EnqueueOptions::default());
    let _second = queue.enqueue("save", record(&log, "second"), EnqueueOptions::default());

    assert!(first.await.unwrap_err().is_superseded());
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_burst_within_window_admits_once() {
    let queue = TaskQueue::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for value in 0..8 {
        handles.push(queue.enqueue("prefs", flaky(&calls, 0, value), EnqueueOptions::default()));
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(queue.debounced_count(), 1);
    assert_eq!(queue.pending_count(), 0);

    let last = handles.pop().unwrap();
    assert_eq!(last.await.unwrap(), 7);
    for handle in handles {
        assert!(handle.await.unwrap_err().is_superseded());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_each_submission_restarts_the_window() {
    let queue = TaskQueue::default();
    let start = Instant::now();

    let _early = queue.enqueue("k", || async { Ok::<_, String>(()) }, EnqueueOptions::default());
    sleep(Duration::from_millis(400)).await;
    let late = queue.enqueue("k", || async { Ok::<_, String>(()) }, EnqueueOptions::default());

    late.await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test(start_paused = true)]
async fn test_queued_task_is_replaced_by_newer_same_key() {
    let queue = TaskQueue::default();
    let log = recorder();

    let blocker = queue.enqueue(
        "blocker",
        || async {
            sleep(Duration::from_millis(50)).await;
            Ok::<_, String>("blocker")
        },
        EnqueueOptions::immediate(),
    );
    settle().await;

    let stale = queue.enqueue("k", record(&log, "stale"), EnqueueOptions::immediate());
    let fresh = queue.enqueue("k", record(&log, "fresh"), EnqueueOptions::immediate());
    assert_eq!(queue.pending_count(), 2);

    assert!(stale.await.unwrap_err().is_superseded());
    assert_eq!(fresh.await.unwrap(), "fresh");
    blocker.await.unwrap();
    assert_eq!(*log.lock(), vec!["fresh"]);
}

#[tokio::test(start_paused = true)]
async fn test_same_key_during_execution_runs_after_it() {
    let queue = TaskQueue::default();
    let log = recorder();

    let running_log = Arc::clone(&log);
    let running = queue.enqueue(
        "k",
        move || {
            let log = Arc::clone(&running_log);
            async move {
                log.lock().push("running:start");
                sleep(Duration::from_millis(100)).await;
                log.lock().push("running:end");
                Ok::<_, String>(1)
            }
        },
        EnqueueOptions::immediate(),
    );
    settle().await;
    assert_eq!(queue.in_flight_key().as_deref(), Some("k"));

    let follow_up = queue.enqueue("k", record(&log, "follow-up"), EnqueueOptions::immediate());
    assert_eq!(queue.pending_count(), 2);

    assert_eq!(running.await.unwrap(), 1);
    assert_eq!(follow_up.await.unwrap(), "follow-up");
    assert_eq!(
        *log.lock(),
        vec!["running:start", "running:end", "follow-up"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_immediate_submission_leaves_debounced_one_alone() {
    let queue = TaskQueue::default();
    let log = recorder();

    let debounced = queue.enqueue("k", record(&log, "debounced"), EnqueueOptions::default());
    let immediate = queue.enqueue("k", record(&log, "immediate"), EnqueueOptions::immediate());

    assert_eq!(immediate.await.unwrap(), "immediate");
    assert_eq!(debounced.await.unwrap(), "debounced");
    assert_eq!(*log.lock(), vec!["immediate", "debounced"]);
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_priority_admitted_at_head() {
    let queue = TaskQueue::default();
    let log = recorder();

    let a = queue.enqueue("a", record(&log, "A"), EnqueueOptions::immediate());
    let b = queue.enqueue("b", record(&log, "B"), EnqueueOptions::immediate());
    let c = queue.enqueue("c", record(&log, "C"), EnqueueOptions::immediate());
    let d = queue.enqueue("d", record(&log, "D"), EnqueueOptions::immediate().prioritized());

    for handle in [a, b, c, d] {
        handle.await.unwrap();
    }
    assert_eq!(*log.lock(), vec!["D", "A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn test_work_never_overlaps() {
    let queue = TaskQueue::default();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            queue.enqueue(
                format!("key-{i}"),
                move || {
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, String>(i)
                    }
                },
                EnqueueOptions::immediate(),
            )
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), i);
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_blocks_tasks_behind_it() {
    let queue = TaskQueue::default();
    let log = recorder();

    let flaky_log = Arc::clone(&log);
    let mut failed_once = false;
    let head = queue.enqueue(
        "flaky",
        move || {
            flaky_log.lock().push("flaky");
            let outcome = if failed_once {
                Ok(())
            } else {
                failed_once = true;
                Err("transient".to_string())
            };
            futures::future::ready(outcome)
        },
        EnqueueOptions::immediate(),
    );
    let behind = queue.enqueue("steady", record(&log, "steady"), EnqueueOptions::immediate());

    head.await.unwrap();
    behind.await.unwrap();
    assert_eq!(*log.lock(), vec!["flaky", "flaky", "steady"]);
}

// =============================================================================
// Retries
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_then_success() {
    let queue = TaskQueue::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handle = queue.enqueue("k", flaky(&calls, 2, 99), EnqueueOptions::immediate());

    assert_eq!(handle.await.unwrap(), 99);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // Linear backoff: 1000ms then 2000ms
    assert!(start.elapsed() >= Duration::from_millis(3000));
    assert!(start.elapsed() < Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_returns_last_error() {
    let queue = TaskQueue::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = queue.enqueue("k", flaky(&calls, usize::MAX, 0), EnqueueOptions::immediate());

    let err = handle.await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(err.key(), "k");
    assert_eq!(err.into_source().as_deref(), Some("attempt 3 failed"));
    assert_eq!(queue.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_is_configurable() {
    let queue = TaskQueue::new(
        QueueConfig::default()
            .with_max_attempts(5)
            .with_retry_delay(Duration::from_millis(10)),
    );
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = queue.enqueue("k", flaky(&calls, 4, 5), EnqueueOptions::immediate());

    assert_eq!(handle.await.unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_still_runs_once() {
    let queue = TaskQueue::new(QueueConfig::default().with_max_attempts(0));
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = queue.enqueue("k", flaky(&calls, usize::MAX, 0), EnqueueOptions::immediate());

    assert_eq!(handle.await.unwrap_err().attempts(), Some(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_clear_debounce_only_touches_its_key() {
    let queue = TaskQueue::default();
    let log = recorder();

    let cancelled = queue.enqueue("a", record(&log, "a"), EnqueueOptions::default());
    let kept = queue.enqueue("b", record(&log, "b"), EnqueueOptions::default());

    assert!(queue.clear_debounce("a"));
    assert!(matches!(cancelled.await, Err(QueueError::Cancelled { .. })));
    assert_eq!(kept.await.unwrap(), "b");
    assert_eq!(*log.lock(), vec!["b"]);
}

#[tokio::test(start_paused = true)]
async fn test_clear_rejects_pending_and_lets_running_finish() {
    let queue = TaskQueue::default();
    let log = recorder();

    let running = queue.enqueue(
        "running",
        || async {
            sleep(Duration::from_millis(100)).await;
            Ok::<_, String>("running")
        },
        EnqueueOptions::immediate(),
    );
    settle().await;

    let queued = queue.enqueue("queued", record(&log, "queued"), EnqueueOptions::immediate());
    let debounced = queue.enqueue("debounced", record(&log, "debounced"), EnqueueOptions::default());

    queue.clear();

    let err = queued.await.unwrap_err();
    assert!(matches!(err, QueueError::Cleared { .. }));
    assert!(err.to_string().contains("Queue cleared"));
    assert!(matches!(debounced.await, Err(QueueError::Cleared { .. })));
    assert_eq!(queue.debounced_count(), 0);

    assert_eq!(running.await.unwrap(), "running");
    assert_eq!(queue.pending_count(), 0);
    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clear_stops_retries_of_running_task() {
    let queue = TaskQueue::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = queue.enqueue("k", flaky(&calls, usize::MAX, 0), EnqueueOptions::immediate());
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    queue.clear();

    assert!(matches!(handle.await, Err(QueueError::Cleared { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_queue_usable_after_clear() {
    let queue = TaskQueue::default();
    let log = recorder();

    let dropped = queue.enqueue("k", record(&log, "dropped"), EnqueueOptions::default());
    queue.clear();
    assert!(matches!(dropped.await, Err(QueueError::Cleared { .. })));

    let handle = queue.enqueue("k", record(&log, "after"), EnqueueOptions::default());
    assert_eq!(handle.await.unwrap(), "after");
    assert_eq!(*log.lock(), vec!["after"]);
}
