//! Schema inference from a legacy delimited-text stream header.
//!
//! The legacy format opens with seven fixed-position lines:
//!
//! ```text
//! DASYLab - V 11.00.00
//! Worksheet name: 6by10beamlayout
//! Recording date: 7/1/2016, 4:52:39 PM
//! Block length: 2
//! Delta: 1.0 sec.
//! Number of channels: 2
//! Date;Time;voltage [V];voltage2 [V];
//! ```
//!
//! followed by delimiter-separated data rows. The first two columns of each
//! row carry the recording date and time-of-day, not channel data.

use super::definition::SourceKind;
use super::resolved::{ChannelSpec, Schema, DEFAULT_DELIMITER};
use crate::core::Unit;
use crate::error::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Number of fixed header lines before the first data row.
pub const HEADER_LINES: usize = 7;

/// Leading columns of every data row that carry date and time-of-day
/// instead of channel data. Sniffed channels are assigned indices starting
/// past these.
pub const RESERVED_COLUMNS: usize = 2;

/// Repeating `<name><optional bracketed unit>;` pattern of the column
/// header row.
static CHANNEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<name>.*?)(?P<unit>\[.*?\])?;").expect("channel header pattern"));

/// Infer a resolved schema from the leading header lines of a legacy
/// stream. `lines` must contain at least [`HEADER_LINES`] entries in stream
/// order; the transport fills in `source_kind` and `source_location`.
pub fn sniff_header(
    lines: &[String],
    source_kind: SourceKind,
    source_location: &str,
) -> Result<Schema, SchemaError> {
    if lines.len() < HEADER_LINES {
        return Err(SchemaError::TruncatedHeader {
            got: lines.len(),
            want: HEADER_LINES,
        });
    }

    // Line 0 (product/version), 2 (recording date) and 3 (block length) are
    // not used.
    let name = value_of(lines, 1)?.to_string();
    let delta_time = leading_number(value_of(lines, 4)?)
        .ok_or_else(|| bad_line(4, &lines[4]))?
        .parse::<f32>()
        .map_err(|_| bad_line(4, &lines[4]))?;
    let declared: usize = leading_number(value_of(lines, 5)?)
        .ok_or_else(|| bad_line(5, &lines[5]))?
        .parse()
        .map_err(|_| bad_line(5, &lines[5]))?;

    let columns: Vec<(String, Unit)> = CHANNEL_PATTERN
        .captures_iter(&lines[6])
        .map(|caps| {
            let name = caps
                .name("name")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let unit = caps
                .name("unit")
                .map(|m| unit_from_token(m.as_str()))
                .unwrap_or(Unit::Unknown);
            (name, unit)
        })
        .collect();

    // The declared count is advisory; trust whichever of it and the header
    // row claims more channels.
    let count = declared.max(columns.len().saturating_sub(RESERVED_COLUMNS));

    let channels = (0..count)
        .map(|k| {
            let index = (RESERVED_COLUMNS + k) as u32;
            match columns.get(RESERVED_COLUMNS + k) {
                Some((name, unit)) => ChannelSpec {
                    name: if name.is_empty() {
                        "Unknown".to_string()
                    } else {
                        name.clone()
                    },
                    unit: *unit,
                    ..ChannelSpec::unknown(index)
                },
                None => ChannelSpec::unknown(index),
            }
        })
        .collect();

    Ok(Schema {
        name,
        delta_time,
        source_kind,
        source_location: source_location.to_string(),
        delimiter: DEFAULT_DELIMITER.to_string(),
        channels,
    })
}

/// Part of a `key: value` header line after the first ':'.
fn value_of(lines: &[String], line: usize) -> Result<&str, SchemaError> {
    lines[line]
        .splitn(2, ':')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| bad_line(line, &lines[line]))
}

/// First whitespace-separated token, shedding trailing unit words such as
/// the "sec." of "Delta: 1.0 sec.".
fn leading_number(value: &str) -> Option<&str> {
    value.split_whitespace().next()
}

/// Resolve a bracketed unit token like "[V]" against the symbol table.
fn unit_from_token(token: &str) -> Unit {
    let symbol = token
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .to_lowercase();
    Unit::from_symbol(&symbol)
}

fn bad_line(line: usize, content: &str) -> SchemaError {
    SchemaError::BadHeaderLine {
        line,
        reason: content.to_string(),
    }
}
