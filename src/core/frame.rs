use super::Unit;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Static description of a channel, shared by every data point the channel
/// ever produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMeta {
    /// Channel name as declared by the schema
    pub name: String,

    /// Mounting position of the sensor in 3D space
    pub position: [f32; 3],

    /// Physical unit of the channel's values
    pub unit: Unit,
}

/// One channel's value at one sampled instant, together with the running
/// statistics captured when the frame was built. Never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct DataPoint {
    meta: Arc<ChannelMeta>,

    /// Value of the channel for this frame
    pub value: f32,

    /// Minimum value seen so far
    pub min_value: f32,

    /// Maximum value seen so far
    pub max_value: f32,

    /// Change in value compared to the previous frame
    pub delta_last_frame: f32,

    /// Change in value since the zero reference frame
    pub delta_last_zero: f32,
}

impl DataPoint {
    pub fn new(
        meta: Arc<ChannelMeta>,
        value: f32,
        min_value: f32,
        max_value: f32,
        delta_last_frame: f32,
        delta_last_zero: f32,
    ) -> Self {
        Self {
            meta,
            value,
            min_value,
            max_value,
            delta_last_frame,
            delta_last_zero,
        }
    }

    /// Name of the channel
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Position of the sensor
    pub fn position(&self) -> [f32; 3] {
        self.meta.position
    }

    /// Unit assigned to the channel
    pub fn unit(&self) -> Unit {
        self.meta.unit
    }
}

/// Complete snapshot of all channels at one sampled instant.
///
/// Produced exactly once by the parser worker and shared as `Arc<Frame>`;
/// consumers may read it freely without synchronization.
#[derive(Debug, Clone)]
pub struct Frame {
    /// One data point per schema channel, index-aligned with the schema
    pub values: Vec<DataPoint>,

    /// Capture time in microseconds since the Unix epoch
    pub timestamp_us: u64,

    /// Sequential frame number, starting at 1 for the first published frame
    pub sequence_id: u64,
}

impl Frame {
    /// The frame returned by data-access operations before the parser has
    /// produced anything: zero channels, minimum timestamp.
    pub fn empty() -> Self {
        Self {
            values: Vec::new(),
            timestamp_us: 0,
            sequence_id: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Wall-clock capture timestamp for a freshly built frame.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
