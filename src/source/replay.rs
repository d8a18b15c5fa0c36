//! Replay of a recorded capture file at a simulated acquisition cadence.

use super::{LineSource, POLL_INTERVAL};
use crate::error::SchemaError;
use crate::schema::{sniff_header, Schema, SourceKind, HEADER_LINES};
use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Replays a text capture line-by-line, sleeping a fixed latency between
/// lines to emulate live acquisition.
///
/// Construction pre-drains the legacy header block and sniffs the schema
/// from it, so the engine's first read lands exactly on the first data row.
/// A dedicated reader thread then feeds the remaining lines into a FIFO
/// that [`LineSource::read_line`] drains.
pub struct ReplaySource {
    schema: Schema,
    lines: Receiver<String>,
    stopped: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Open a capture that starts with the legacy seven-line header.
    /// Fails with the schema error if the header cannot be sniffed.
    pub fn open(path: impl AsRef<Path>, latency: Duration) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open capture {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut header = Vec::with_capacity(HEADER_LINES);
        for _ in 0..HEADER_LINES {
            match read_trimmed_line(&mut reader)? {
                Some(line) => header.push(line),
                None => break,
            }
        }
        let location = path.display().to_string();
        let schema = sniff_header(&header, SourceKind::File, &location)?;

        log::info!(
            "replaying {} ({} channels, {}s interval)",
            location,
            schema.channels.len(),
            schema.delta_time
        );
        Ok(Self::spawn(schema, reader, latency))
    }

    /// Replay a headerless capture against an explicitly resolved schema;
    /// data is read from the first line of the file.
    pub fn with_schema(
        path: impl AsRef<Path>,
        latency: Duration,
        schema: Schema,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open capture {}", path.display()))?;
        Ok(Self::spawn(schema, BufReader::new(file), latency))
    }

    fn spawn(schema: Schema, reader: BufReader<File>, latency: Duration) -> Self {
        let (tx, rx) = unbounded();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();

        thread::spawn(move || {
            for line in reader.lines() {
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("replay reader failed: {e}");
                        break;
                    }
                };
                if tx.send(line).is_err() {
                    break;
                }
                thread::sleep(latency);
            }
        });

        Self {
            schema,
            lines: rx,
            stopped,
        }
    }
}

impl LineSource for ReplaySource {
    fn read_line(&self) -> Result<Option<String>> {
        loop {
            if self.stopped.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => return Ok(Some(line)),
                Err(RecvTimeoutError::Timeout) => continue,
                // Reader thread done and FIFO drained
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

fn read_trimmed_line(reader: &mut BufReader<File>) -> Result<Option<String>, SchemaError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
