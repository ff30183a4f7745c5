//! Bounded in-memory history of recent sync events.
//!
//! Keeps the last `capacity` events so a support screen or a bug report can
//! show what the queue was doing recently without a log file.

use crate::bus::EventReceiver;
use crate::event::SyncEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of events retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Ring buffer of recent events, oldest first.
#[derive(Debug)]
pub struct EventHistory {
    capacity: usize,
    events: Mutex<VecDeque<SyncEvent>>,
}

impl EventHistory {
    /// Create a history holding at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
        }
    }

    /// Append an event, evicting the oldest one when full.
    pub fn record(&self, event: SyncEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// The most recent events, oldest first. `None` returns everything.
    #[must_use]
    pub fn recent(&self, limit: Option<usize>) -> Vec<SyncEvent> {
        let events = self.events.lock();
        let skip = limit.map_or(0, |limit| events.len().saturating_sub(limit));
        events.iter().skip(skip).cloned().collect()
    }

    /// Events of one type (e.g. `"task.failed"`), oldest first.
    #[must_use]
    pub fn by_type(&self, event_type: &str) -> Vec<SyncEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every retained event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Pretty JSON array of the retained events.
    ///
    /// # Errors
    ///
    /// Returns an error if an event fails to serialize.
    pub fn export_json(&self) -> serde_json::Result<String> {
        let events = self.events.lock();
        serde_json::to_string_pretty(&*events)
    }

    /// Record every event from `receiver` until the bus closes.
    pub async fn run(&self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            self.record(event);
        }
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
