//! Where raw text rows come from.
//!
//! The parser engine is polymorphic over transports through [`LineSource`]:
//! a replayed capture file, a live serial line, or a scripted in-process
//! feed for tests. A transport only has to hand over one logical line of
//! text at a time and say what the stream's schema is.

mod replay;
mod scripted;
mod serial;

pub use replay::ReplaySource;
pub use scripted::{ScriptedSource, ScriptedWriter};
pub use serial::SerialSource;

use crate::schema::Schema;
use anyhow::Result;

/// How long blocked readers sleep between checks of their stop flag.
pub(crate) const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(20);

/// Contract every transport exposes to the parser engine.
pub trait LineSource: Send + Sync {
    /// Read the next logical line of text, blocking the calling thread
    /// until one is available. Returns `Ok(None)` once the source is
    /// exhausted or stopped; the worker treats that as end of stream.
    fn read_line(&self) -> Result<Option<String>>;

    /// The resolved schema of this stream. May block until resolution
    /// completes (e.g. sampling live lines).
    fn read_schema(&self) -> Result<Schema>;

    /// Ask the source to stop. Idempotent; must promptly unblock any
    /// in-flight or future `read_line` call so a parser worker blocked on
    /// this source can exit at its next safe point.
    fn stop(&self);
}
