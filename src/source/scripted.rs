//! In-process line source fed by the caller, for tests and demos.

use super::{LineSource, POLL_INTERVAL};
use crate::schema::Schema;
use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};

/// A line source whose lines are pushed one at a time through a
/// [`ScriptedWriter`]. The schema is fixed at construction.
///
/// Dropping the writer ends the stream: pending lines are still delivered,
/// then `read_line` reports exhaustion. This is the deterministic stand-in
/// for a live transport in integration tests.
pub struct ScriptedSource {
    schema: Schema,
    lines: Receiver<String>,
    stopped: AtomicBool,
}

/// Feeding end of a [`ScriptedSource`].
#[derive(Clone)]
pub struct ScriptedWriter {
    tx: Sender<String>,
}

impl ScriptedSource {
    pub fn channel(schema: Schema) -> (Self, ScriptedWriter) {
        let (tx, rx) = unbounded();
        (
            Self {
                schema,
                lines: rx,
                stopped: AtomicBool::new(false),
            },
            ScriptedWriter { tx },
        )
    }
}

impl ScriptedWriter {
    /// Queue one line for the source. Sends after the source is gone are
    /// silently dropped.
    pub fn send(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&self) -> Result<Option<String>> {
        loop {
            if self.stopped.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => return Ok(Some(line)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }

    fn read_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}
