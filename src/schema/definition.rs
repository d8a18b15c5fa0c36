//! Persisted schema definitions.
//!
//! A `SensorDefinition` is the on-disk description of a sensor stream: where
//! the data comes from, how rows are delimited, and what each channel looks
//! like. Definitions are stored as pretty-printed JSON documents and loaded
//! with the documented defaulting rules applied by [`Schema::resolve`].
//!
//! [`Schema::resolve`]: crate::schema::Schema::resolve

use crate::core::Unit;
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Transport kind a definition points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    #[default]
    File,
    Serial,
    /// Placeholder; no transport implements this yet.
    Network,
}

/// A min or max bound for a channel.
///
/// A fixed bound is never moved by observed data; a free bound tracks the
/// observed extreme, so free minimums start at `f32::MAX` and free maximums
/// at `f32::MIN` and the first observation replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: f32,

    #[serde(rename = "isFixed", default)]
    pub is_fixed: bool,
}

impl Bound {
    pub fn new(value: f32, is_fixed: bool) -> Self {
        Self { value, is_fixed }
    }

    /// Starting bound for a free minimum.
    pub fn free_min() -> Self {
        Self::new(f32::MAX, false)
    }

    /// Starting bound for a free maximum.
    pub fn free_max() -> Self {
        Self::new(f32::MIN, false)
    }
}

/// Persisted description of one channel. Every field is optional; missing
/// fields take the documented defaults at resolve time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChannelDefinition {
    pub name: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    pub index: Option<u32>,
    pub units: Option<Unit>,
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

/// Root of a persisted schema definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct SensorDefinition {
    pub name: Option<String>,
    pub delta_time: Option<f32>,
    pub source_type: SourceKind,
    pub source_location: String,
    pub delimiter: Option<String>,

    #[serde(rename = "DataPoints")]
    pub channels: Vec<ChannelDefinition>,
}

impl SensorDefinition {
    /// Load a definition from disk.
    ///
    /// A missing file or malformed content is a recoverable
    /// [`SchemaError`]; the caller chooses the fallback.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the definition back out, completing the calibration
    /// round-trip.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
