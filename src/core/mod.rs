//! Core foundation types (no internal deps beyond the error type).

pub mod rule;
pub mod types;

pub use rule::{FilterRule, Operator, RuleSpec};
pub use types::{
    CHANNEL_COUNT, Channel, ChannelSample, Device, FilterId, Measurement, Reading, now_us,
};
