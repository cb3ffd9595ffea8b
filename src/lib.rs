//! Dhara - current threshold monitor
//!
//! Receives current readings for eight channels over UDP, evaluates them
//! against a live set of threshold rules (`Ia > 5`), and publishes every
//! change of a rule's match state to subscribers and as a UDP status message.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            main.rs, console, monitor                │  ← Runtime / presentation
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     threads/                        │  ← Ingest thread
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     engine/                         │  ← Evaluation, telemetry
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │             state/              io/                 │  ← Filter store, publisher,
//! │                                                     │    decoder, sockets
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      core/                          │  ← Foundation
//! │               (channels, readings, rules)           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! ```text
//! UDP :5005 ──► decode ──► snapshot rules ──► evaluate ──► apply transition
//!                                                              │
//!                                      subscribers ◄───────────┼──► UDP :5006
//! ```

pub mod config;
pub mod console;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod monitor;
pub mod state;
pub mod threads;
pub mod utils;

pub use config::Config;
pub use core::{
    CHANNEL_COUNT, Channel, ChannelSample, Device, FilterId, FilterRule, Measurement, Operator,
    Reading, RuleSpec,
};
pub use engine::{EngineStats, FilterEngine, FilterStateView};
pub use error::{Error, Result};
pub use monitor::Monitor;
pub use state::{FilterState, MatchState, TransitionEvent};
