//! JSON-lines output for sync events.

use crate::bus::EventReceiver;
use crate::event::SyncEvent;
use std::io::{self, Write};

/// Writes each event as one JSON document per line.
///
/// Defaults to stdout; any [`Write`] sink works, which is how tests capture
/// the output.
#[derive(Debug)]
pub struct JsonRenderer<W = io::Stdout> {
    out: W,
    pretty: bool,
    /// Only render event types starting with this, e.g. `"task."`
    prefix: Option<String>,
}

impl JsonRenderer<io::Stdout> {
    /// Compact JSON lines on stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for JsonRenderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonRenderer<W> {
    /// Compact JSON lines on `out`.
    pub const fn with_writer(out: W) -> Self {
        Self {
            out,
            pretty: false,
            prefix: None,
        }
    }

    /// Indent each document. The output is then no longer one event per line.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Skip events whose type does not start with `prefix`.
    #[must_use]
    pub fn only(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Render until the bus closes. Returns the number of events written.
    ///
    /// # Errors
    ///
    /// Stops at the first write failure, e.g. a closed pipe.
    pub async fn run(mut self, mut receiver: EventReceiver) -> io::Result<usize> {
        let mut written = 0;
        while let Some(event) = receiver.recv().await {
            if self.render(&event)? {
                written += 1;
            }
        }
        self.out.flush()?;
        Ok(written)
    }

    /// Write one event if it passes the filter; returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns the writer's error.
    pub fn render(&mut self, event: &SyncEvent) -> io::Result<bool> {
        if let Some(prefix) = &self.prefix
            && !event.event_type().starts_with(prefix.as_str())
        {
            return Ok(false);
        }

        let document = if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        }
        .map_err(io::Error::other)?;

        writeln!(self.out, "{document}")?;
        Ok(true)
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
