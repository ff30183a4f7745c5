//! Fan-out of captured sync events.
//!
//! [`SyncEventLayer`](crate::SyncEventLayer) pushes into an unbounded intake
//! channel. A forwarding task republishes each event on a broadcast channel so
//! every subscriber (renderer, history, sync indicator) sees the same stream in
//! the same order.

use crate::event::SyncEvent;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};

/// How far a subscriber may fall behind before it starts skipping events.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Multi-subscriber bus for [`SyncEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    /// Taken by `shutdown`; the forwarder stops once every cloned sender is gone too.
    intake: Mutex<Option<mpsc::UnboundedSender<SyncEvent>>>,
    outlet: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus with [`DEFAULT_BUS_CAPACITY`].
    ///
    /// Spawns the forwarding task, so this must run inside a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus whose subscribers may lag by up to `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (intake, pending) = mpsc::unbounded_channel();
        let (outlet, _) = broadcast::channel(capacity.max(1));
        tokio::spawn(forward(pending, outlet.clone()));

        Self {
            intake: Mutex::new(Some(intake)),
            outlet,
        }
    }

    /// A sender feeding this bus, or `None` after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn sender(&self) -> Option<EventSender> {
        self.intake
            .lock()
            .clone()
            .map(|inner| EventSender { inner })
    }

    /// Stop handing out senders.
    ///
    /// Subscribers see the end of the stream once the senders already handed
    /// out are dropped as well. Calling this twice is harmless.
    pub fn shutdown(&self) {
        drop(self.intake.lock().take());
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.intake.lock().is_none()
    }

    /// Receive every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.outlet.subscribe(),
            skipped: 0,
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.outlet.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn forward(
    mut pending: mpsc::UnboundedReceiver<SyncEvent>,
    outlet: broadcast::Sender<SyncEvent>,
) {
    while let Some(event) = pending.recv().await {
        // Nobody subscribed yet
        let _ = outlet.send(event);
    }
}

/// Sending half handed to producers such as [`SyncEventLayer`](crate::SyncEventLayer).
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSender {
    /// The raw channel, as taken by [`SyncEventLayer::new`](crate::SyncEventLayer::new).
    #[must_use]
    pub fn into_inner(self) -> mpsc::UnboundedSender<SyncEvent> {
        self.inner
    }

    /// Publish an event.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] once the forwarding task has stopped.
    pub fn send(&self, event: SyncEvent) -> Result<(), SendError> {
        self.inner.send(event).map_err(|_| SendError::Closed)
    }

    /// Whether the forwarding task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// One subscriber's view of the bus.
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<SyncEvent>,
    skipped: u64,
}

impl EventReceiver {
    /// Wait for the next event; `None` once the stream has ended.
    ///
    /// A subscriber that fell behind skips ahead to the oldest retained event.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => self.note_lag(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Every event already delivered, without waiting.
    pub fn drain_ready(&mut self) -> Vec<SyncEvent> {
        let mut ready = Vec::new();
        loop {
            match self.inner.try_recv() {
                Ok(event) => ready.push(event),
                Err(TryRecvError::Lagged(missed)) => self.note_lag(missed),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return ready,
            }
        }
    }

    /// Events this subscriber lost by falling behind.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    fn note_lag(&mut self, missed: u64) {
        self.skipped += missed;
        tracing::warn!(
            missed,
            total_skipped = self.skipped,
            "Sync event subscriber fell behind"
        );
    }
}

/// The bus no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The forwarding task has stopped.
    #[error("sync event bus is shut down")]
    Closed,
}
