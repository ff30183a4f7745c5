//! Tracing Layer that turns queue and resource diagnostics into `SyncEvent`s.
//!
//! Events are recognised by their target (must start with "wellsync") and an
//! `event_type` field naming the transition.

#![allow(clippy::cast_possible_truncation)]

use crate::event::{EventCategory, EventSource, QueueEvent, ResourceEvent, SyncEvent};
use crate::metadata::correlation_id;
use tokio::sync::mpsc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// A tracing Layer that captures wellsync events.
pub struct SyncEventLayer {
    sender: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncEventLayer {
    /// Create a new layer that sends events to the given channel.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<SyncEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for SyncEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let target = meta.target();

        if !target.starts_with("wellsync") {
            return;
        }

        let mut visitor = SyncEventVisitor::new(target);
        event.record(&mut visitor);

        if let Some(sync_event) = visitor.build(meta.file(), meta.line()) {
            let _ = self.sender.send(sync_event);
        }
    }
}

/// Visitor collecting the fields used by the emit macros.
#[derive(Default)]
struct SyncEventVisitor {
    target: String,
    event_type: Option<String>,
    key: Option<String>,
    error: Option<String>,
    reason: Option<String>,
    debounced: Option<bool>,
    priority: Option<bool>,
    from_cache: Option<bool>,
    pending: Option<u64>,
    attempt: Option<u64>,
    attempts: Option<u64>,
    duration_ms: Option<u64>,
    retry_in_ms: Option<u64>,
    dropped: Option<u64>,
}

impl SyncEventVisitor {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn build(self, file: Option<&str>, line: Option<u32>) -> Option<SyncEvent> {
        let event_type = self.event_type.as_deref()?;
        let source = match (file, line) {
            (Some(file), Some(line)) => EventSource::with_location(&self.target, file, line),
            _ => EventSource::new(&self.target),
        };

        let category = match event_type {
            "task.enqueued" => EventCategory::Queue(QueueEvent::Enqueued {
                key: self.key?,
                debounced: self.debounced.unwrap_or(false),
                priority: self.priority.unwrap_or(false),
            }),
            "task.superseded" => EventCategory::Queue(QueueEvent::Superseded { key: self.key? }),
            "task.admitted" => EventCategory::Queue(QueueEvent::Admitted {
                key: self.key?,
                pending: self.pending.unwrap_or(0) as usize,
            }),
            "task.started" => EventCategory::Queue(QueueEvent::Started {
                key: self.key?,
                attempt: self.attempt.unwrap_or(1) as u32,
            }),
            "task.completed" => EventCategory::Queue(QueueEvent::Completed {
                key: self.key?,
                attempts: self.attempts.unwrap_or(1) as u32,
                duration_ms: self.duration_ms.unwrap_or(0),
            }),
            "task.retrying" => EventCategory::Queue(QueueEvent::Retrying {
                key: self.key?,
                attempt: self.attempt? as u32,
                retry_in_ms: self.retry_in_ms.unwrap_or(0),
                error: self.error.unwrap_or_default(),
            }),
            "task.failed" => EventCategory::Queue(QueueEvent::Failed {
                key: self.key?,
                attempts: self.attempts? as u32,
                error: self.error.unwrap_or_default(),
            }),
            "task.cancelled" => EventCategory::Queue(QueueEvent::Cancelled {
                key: self.key?,
                reason: self.reason?,
            }),
            "queue.cleared" => EventCategory::Queue(QueueEvent::Cleared {
                dropped: self.dropped.unwrap_or(0) as usize,
            }),

            "resource.hydrated" => EventCategory::Resource(ResourceEvent::Hydrated {
                key: self.key?,
                from_cache: self.from_cache.unwrap_or(false),
            }),
            "resource.load_failed" => EventCategory::Resource(ResourceEvent::LoadFailed {
                key: self.key?,
                error: self.error.unwrap_or_default(),
            }),
            "resource.saved" => EventCategory::Resource(ResourceEvent::Saved { key: self.key? }),
            "resource.rolled_back" => EventCategory::Resource(ResourceEvent::RolledBack {
                key: self.key?,
                error: self.error.unwrap_or_default(),
            }),

            _ => return None,
        };

        Some(SyncEvent::new(correlation_id(), source, category))
    }

    fn record_text(&mut self, field: &Field, value: String) {
        match field.name() {
            "event_type" => self.event_type = Some(value),
            "key" => self.key = Some(value),
            "error" => self.error = Some(value),
            "reason" => self.reason = Some(value),
            _ => {}
        }
    }
}

impl Visit for SyncEventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "pending" => self.pending = Some(value),
            "attempt" => self.attempt = Some(value),
            "attempts" => self.attempts = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "retry_in_ms" => self.retry_in_ms = Some(value),
            "dropped" => self.dropped = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Ok(value) = u64::try_from(value) {
            self.record_u64(field, value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "debounced" => self.debounced = Some(value),
            "priority" => self.priority = Some(value),
            "from_cache" => self.from_cache = Some(value),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%value` fields arrive here with Display formatting
        self.record_text(field, format!("{value:?}"));
    }
}
