//! Live acquisition from a serial line.

use super::LineSource;
use crate::schema::{ChannelSpec, Schema, SourceKind, DEFAULT_DELIMITER};
use anyhow::{bail, Context, Result};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed framing of the supported acquisition hardware.
pub const BAUD_RATE: u32 = 9600;

/// Read timeout on the underlying port. Reads retry after each timeout so
/// a stop request is honored within one timeout window.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Number of lines sampled to synthesize a schema when none is supplied.
const SCHEMA_SAMPLE_LINES: usize = 3;

/// Wraps a serial connection at 9600-8-N-1.
///
/// The schema is either supplied up front (resolved from a definition) or
/// synthesized on the first [`LineSource::read_schema`] call by sampling a
/// few live lines: column count from the delimiter, sample interval from
/// the wall clock elapsed across the samples, default units.
pub struct SerialSource {
    port: Mutex<Box<dyn SerialPort>>,
    schema: Mutex<Option<Schema>>,
    port_name: String,
    stopped: AtomicBool,
}

impl SerialSource {
    /// Open a port and derive the schema from live data later.
    pub fn open(port_name: &str) -> Result<Self> {
        Self::connect(port_name, None)
    }

    /// Open a port with an already-resolved schema.
    pub fn with_schema(port_name: &str, schema: Schema) -> Result<Self> {
        Self::connect(port_name, Some(schema))
    }

    fn connect(port_name: &str, schema: Option<Schema>) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("failed to open serial port {port_name}"))?;

        log::info!("serial source on {port_name} at {BAUD_RATE} baud");
        Ok(Self {
            port: Mutex::new(port),
            schema: Mutex::new(schema),
            port_name: port_name.to_string(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Sample a few live lines and build a minimal schema from what they
    /// look like. The sampled lines are consumed.
    fn sample_schema(&self) -> Result<Schema> {
        let started = Instant::now();
        let mut samples = Vec::with_capacity(SCHEMA_SAMPLE_LINES);
        while samples.len() < SCHEMA_SAMPLE_LINES {
            match self.read_line()? {
                Some(line) => samples.push(line),
                None => bail!("serial source stopped before a schema could be sampled"),
            }
        }
        Ok(synthesize_schema(&samples, started.elapsed(), &self.port_name))
    }
}

impl LineSource for SerialSource {
    fn read_line(&self) -> Result<Option<String>> {
        let mut port = self
            .port
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if self.stopped.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => match byte[0] {
                    b'\n' => break,
                    b'\r' => continue,
                    b => buf.push(b),
                },
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("serial read failed"),
            }
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn read_schema(&self) -> Result<Schema> {
        {
            let schema = self
                .schema
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(schema) = schema.as_ref() {
                return Ok(schema.clone());
            }
        }

        let sampled = self.sample_schema()?;
        let mut schema = self
            .schema
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(schema.get_or_insert(sampled).clone())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

/// Build a minimal schema for a stream of delimiter-separated lines whose
/// shape was observed but never declared.
pub(crate) fn synthesize_schema(
    samples: &[String],
    elapsed: Duration,
    port_name: &str,
) -> Schema {
    let columns = samples
        .iter()
        .map(|line| {
            line.split(DEFAULT_DELIMITER)
                .filter(|field| !field.trim().is_empty())
                .count()
        })
        .max()
        .unwrap_or(0);

    let intervals = samples.len().saturating_sub(1).max(1);
    let delta_time = elapsed.as_secs_f32() / intervals as f32;

    let channels = (0..columns)
        .map(|i| ChannelSpec {
            name: format!("Channel {i}"),
            ..ChannelSpec::unknown(i as u32)
        })
        .collect();

    Schema {
        name: port_name.to_string(),
        delta_time,
        source_kind: SourceKind::Serial,
        source_location: port_name.to_string(),
        delimiter: DEFAULT_DELIMITER.to_string(),
        channels,
    }
}
