//! Resolved, validated schema form consumed by the parser engine.

use super::definition::{Bound, ChannelDefinition, SensorDefinition, SourceKind};
use crate::core::{ChannelMeta, Unit};
use crate::error::SchemaError;

/// Default delimiter between row fields.
pub const DEFAULT_DELIMITER: &str = ";";

/// Default sample interval in seconds.
pub const DEFAULT_DELTA_TIME: f32 = 0.2;

/// One channel with all defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub position: [f32; 3],
    pub unit: Unit,

    /// Column of the data row this channel reads from
    pub index: u32,

    pub min: Bound,
    pub max: Bound,
}

impl ChannelSpec {
    /// Apply the defaulting rules to a persisted channel definition.
    /// `declared_at` is the channel's position in declaration order, used
    /// when no explicit index is given.
    pub fn resolve(def: &ChannelDefinition, declared_at: u32) -> Self {
        Self {
            name: def.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            position: [
                def.x.unwrap_or(0.0),
                def.y.unwrap_or(0.0),
                def.z.unwrap_or(0.0),
            ],
            unit: def.units.unwrap_or(Unit::Unknown),
            index: def.index.unwrap_or(declared_at),
            min: def.min.unwrap_or_else(Bound::free_min),
            max: def.max.unwrap_or_else(Bound::free_max),
        }
    }

    /// Channel with nothing known about it beyond its column.
    pub fn unknown(index: u32) -> Self {
        Self {
            name: "Unknown".to_string(),
            position: [0.0; 3],
            unit: Unit::Unknown,
            index,
            min: Bound::free_min(),
            max: Bound::free_max(),
        }
    }

    pub fn meta(&self) -> ChannelMeta {
        ChannelMeta {
            name: self.name.clone(),
            position: self.position,
            unit: self.unit,
        }
    }
}

/// Resolved description of a stream: channel layout, delimiter and pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,

    /// Sample interval in seconds
    pub delta_time: f32,

    pub source_kind: SourceKind,
    pub source_location: String,
    pub delimiter: String,

    /// Channels sorted by resolved index ascending
    pub channels: Vec<ChannelSpec>,
}

impl Schema {
    /// Resolve a persisted definition into the internal form, applying the
    /// documented defaults and validating the channel layout.
    pub fn resolve(def: &SensorDefinition) -> Result<Self, SchemaError> {
        let mut channels: Vec<ChannelSpec> = def
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| ChannelSpec::resolve(c, i as u32))
            .collect();
        channels.sort_by_key(|c| c.index);

        for pair in channels.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(SchemaError::DuplicateIndex(pair[0].index));
            }
        }

        let delimiter = match &def.delimiter {
            Some(d) if !d.is_empty() => d.clone(),
            _ => DEFAULT_DELIMITER.to_string(),
        };

        Ok(Self {
            name: def.name.clone().unwrap_or_default(),
            delta_time: def.delta_time.unwrap_or(DEFAULT_DELTA_TIME),
            source_kind: def.source_type,
            source_location: def.source_location.clone(),
            delimiter,
            channels,
        })
    }
}
