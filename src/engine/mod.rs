//! Evaluation engine.
//!
//! - [`evaluator`]: pure rule evaluation and transition detection
//! - [`telemetry`]: ingest counters and processing times
//! - [`filter_engine`]: the owned engine instance used by the monitor and the console

pub mod evaluator;
pub mod filter_engine;
pub mod telemetry;

pub use evaluator::{evaluate, evaluate_rule};
pub use filter_engine::{FilterEngine, FilterStateView, is_packet_error};
pub use telemetry::{EngineStats, Telemetry};
