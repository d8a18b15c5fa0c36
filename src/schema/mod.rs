pub mod definition;
pub mod resolved;
pub mod sniff;

pub use definition::{Bound, ChannelDefinition, SensorDefinition, SourceKind};
pub use resolved::{ChannelSpec, Schema, DEFAULT_DELIMITER, DEFAULT_DELTA_TIME};
pub use sniff::{sniff_header, HEADER_LINES, RESERVED_COLUMNS};
