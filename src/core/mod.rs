pub mod frame;
pub mod unit;

pub use frame::{ChannelMeta, DataPoint, Frame};
pub use unit::Unit;
