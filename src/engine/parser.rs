//! The frame parser engine.
//!
//! A background worker reads lines from a [`LineSource`], converts columns
//! to numeric values per the schema, maintains per-channel running min/max,
//! computes frame-over-frame and frame-over-zero deltas, and publishes the
//! resulting [`Frame`] to a handoff queue. The consuming side pulls the
//! latest frame without blocking, can move the zero reference at any time,
//! and can snapshot the learned calibration back into a persistable
//! definition.

use crate::core::frame::now_micros;
use crate::core::{ChannelMeta, DataPoint, Frame};
use crate::engine::ParserState;
use crate::schema::{Bound, ChannelDefinition, ChannelSpec, Schema, SensorDefinition};
use crate::source::LineSource;
use anyhow::{bail, Context, Result};
use arc_swap::{ArcSwap, ArcSwapOption};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Per-channel mutable state, owned by the worker thread for the parser's
/// lifetime. The metadata is immutable after schema resolution; only the
/// running bounds change across frames.
struct ChannelMapping {
    meta: Arc<ChannelMeta>,

    /// Column of the data row this channel reads from
    column: usize,

    min: f32,
    min_fixed: bool,
    max: f32,
    max_fixed: bool,
}

impl ChannelMapping {
    fn from_spec(spec: &ChannelSpec) -> Self {
        Self {
            meta: Arc::new(spec.meta()),
            column: spec.index as usize,
            min: spec.min.value,
            min_fixed: spec.min.is_fixed,
            max: spec.max.value,
            max_fixed: spec.max.is_fixed,
        }
    }
}

/// Takes lines from a data source and produces data frames.
///
/// Lifecycle is `Created -> Started -> Stopped`; data access before
/// `Started` yields the empty initial frame, never an error.
pub struct FrameParser {
    source: Arc<dyn LineSource>,
    schema: Option<Arc<Schema>>,
    state: ParserState,

    /// The frame most recently pulled by the consumer
    current: Arc<Frame>,

    /// The frame most recently published by the worker
    latest: Arc<ArcSwap<Frame>>,

    /// Zero reference; `None` until the first frame is adopted
    zero: Arc<ArcSwapOption<Frame>>,

    frames: Option<Receiver<Arc<Frame>>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FrameParser {
    pub fn new(source: Arc<dyn LineSource>) -> Self {
        Self {
            source,
            schema: None,
            state: ParserState::Created,
            current: Arc::new(Frame::empty()),
            latest: Arc::new(ArcSwap::from_pointee(Frame::empty())),
            zero: Arc::new(ArcSwapOption::empty()),
            frames: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Resolve the schema through the line source and launch the worker.
    pub fn start(&mut self) -> Result<()> {
        if !self.state.can_transition_to(&ParserState::Started) {
            bail!("cannot start parser in state {}", self.state.name());
        }

        let schema = Arc::new(
            self.source
                .read_schema()
                .context("failed to resolve schema")?,
        );
        let mappings: Vec<ChannelMapping> =
            schema.channels.iter().map(ChannelMapping::from_spec).collect();

        let (tx, rx) = unbounded();
        let worker = Worker {
            source: self.source.clone(),
            schema: schema.clone(),
            mappings,
            frames: tx,
            latest: self.latest.clone(),
            zero: self.zero.clone(),
            stop_flag: self.stop_flag.clone(),
        };
        let handle = thread::Builder::new()
            .name("frame-parser".to_string())
            .spawn(move || worker.run())
            .context("failed to spawn parser worker")?;

        log::info!(
            "parser started: {} ({} channels)",
            schema.name,
            schema.channels.len()
        );
        self.frames = Some(rx);
        self.worker = Some(handle);
        self.schema = Some(schema);
        self.state = ParserState::Started;
        Ok(())
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Resolved schema; `None` before `start`.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Advance the current frame to the most recent one the worker has
    /// published and return it. Non-blocking: drains the whole handoff
    /// queue keeping only the last entry; if nothing new arrived the
    /// current frame is returned unchanged. Intermediate frames a slow
    /// consumer skipped are unrecoverable.
    pub fn pull_latest(&mut self) -> Arc<Frame> {
        if let Some(frames) = &self.frames {
            while let Ok(frame) = frames.try_recv() {
                self.current = frame;
            }
        }
        self.current.clone()
    }

    /// The current frame without draining the handoff queue.
    pub fn current(&self) -> Arc<Frame> {
        self.current.clone()
    }

    /// Replace the zero reference with the latest published frame.
    /// Deltas in already-published frames are fixed at publication time
    /// and are not recomputed. A no-op until the worker has published
    /// something.
    pub fn zero(&self) {
        let latest = self.latest.load_full();
        if !latest.is_empty() {
            self.zero.store(Some(latest));
        }
    }

    /// Snapshot the live running state into a persistable definition:
    /// schema-level fields plus each channel's current running bounds with
    /// their fixed flags. Calibration learned this session can be saved
    /// and reloaded as fixed bounds next run. `None` before `start`.
    pub fn snapshot_definition(&self) -> Option<SensorDefinition> {
        let schema = self.schema.as_ref()?;
        let latest = self.latest.load_full();

        let channels = schema
            .channels
            .iter()
            .enumerate()
            .map(|(slot, spec)| {
                let (min, max) = latest
                    .values
                    .get(slot)
                    .map(|point| (point.min_value, point.max_value))
                    .unwrap_or((spec.min.value, spec.max.value));
                ChannelDefinition {
                    name: Some(spec.name.clone()),
                    x: Some(spec.position[0]),
                    y: Some(spec.position[1]),
                    z: Some(spec.position[2]),
                    index: Some(spec.index),
                    units: Some(spec.unit),
                    min: Some(Bound::new(min, spec.min.is_fixed)),
                    max: Some(Bound::new(max, spec.max.is_fixed)),
                }
            })
            .collect();

        Some(SensorDefinition {
            name: Some(schema.name.clone()),
            delta_time: Some(schema.delta_time),
            source_type: schema.source_kind,
            source_location: schema.source_location.clone(),
            delimiter: Some(schema.delimiter.clone()),
            channels,
        })
    }

    /// Signal the worker to exit at its next safe point and wait for it.
    /// Idempotent; never blocks on a producer that has stalled, because
    /// stopping the source unblocks the worker's read.
    pub fn stop(&mut self) {
        if self.state == ParserState::Stopped {
            return;
        }
        self.state = ParserState::Stopped;
        self.stop_flag.store(true, Ordering::Relaxed);
        self.source.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        log::info!("parser stopped");
    }
}

impl Drop for FrameParser {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    source: Arc<dyn LineSource>,
    schema: Arc<Schema>,
    mappings: Vec<ChannelMapping>,
    frames: Sender<Arc<Frame>>,
    latest: Arc<ArcSwap<Frame>>,
    zero: Arc<ArcSwapOption<Frame>>,
    stop_flag: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        let pacing = Duration::from_secs_f32(self.schema.delta_time.max(0.0));
        let mut prev: Option<Arc<Frame>> = None;
        let mut sequence = 0u64;

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                break;
            }

            let line = match self.source.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::info!("line source exhausted after {sequence} frames");
                    break;
                }
                Err(e) => {
                    log::warn!("line source failed: {e:#}");
                    break;
                }
            };

            sequence += 1;
            let frame = Arc::new(self.build_frame(&line, prev.as_deref(), sequence));

            self.latest.store(frame.clone());
            if self.frames.send(frame.clone()).is_err() {
                // Consumer side is gone
                break;
            }
            if self.zero.load().is_none() {
                self.zero.store(Some(frame.clone()));
            }
            prev = Some(frame);

            if !pacing.is_zero() {
                thread::sleep(pacing);
            }
        }
    }

    /// Build one frame from one raw line. Always yields one data point per
    /// channel: a column that is missing or fails to parse carries the
    /// previous frame's value forward with zero deltas and leaves the
    /// bounds untouched.
    fn build_frame(&mut self, line: &str, prev: Option<&Frame>, sequence: u64) -> Frame {
        let fields: Vec<&str> = line.split(self.schema.delimiter.as_str()).collect();
        let zero = self.zero.load_full();
        let mut values = Vec::with_capacity(self.mappings.len());

        for (slot, mapping) in self.mappings.iter_mut().enumerate() {
            let prev_value = prev.and_then(|f| f.values.get(slot)).map(|p| p.value);
            let field = fields.get(mapping.column).map(|raw| raw.trim());
            let parsed = field.and_then(|raw| raw.parse::<f32>().ok());

            let point = match parsed {
                Some(value) => {
                    if !mapping.max_fixed && value > mapping.max {
                        mapping.max = value;
                    }
                    if !mapping.min_fixed && value < mapping.min {
                        mapping.min = value;
                    }
                    let delta_last_frame = prev_value.map(|p| value - p).unwrap_or(0.0);
                    let delta_last_zero = zero
                        .as_ref()
                        .and_then(|z| z.values.get(slot))
                        .map(|z| value - z.value)
                        .unwrap_or(0.0);
                    DataPoint::new(
                        mapping.meta.clone(),
                        value,
                        mapping.min,
                        mapping.max,
                        delta_last_frame,
                        delta_last_zero,
                    )
                }
                None => {
                    if let Some(raw) = field {
                        log::debug!(
                            "channel {}: unparseable field {:?} in frame {}",
                            mapping.meta.name,
                            raw,
                            sequence
                        );
                    }
                    DataPoint::new(
                        mapping.meta.clone(),
                        prev_value.unwrap_or(0.0),
                        mapping.min,
                        mapping.max,
                        0.0,
                        0.0,
                    )
                }
            };
            values.push(point);
        }

        Frame {
            values,
            timestamp_us: now_micros(),
            sequence_id: sequence,
        }
    }
}
