//! Shared filter state: the rule store and the state publisher.
//!
//! Both maps are owned by one [`crate::engine::FilterEngine`] and only
//! reached through their operations.

pub mod filter_store;
pub mod publisher;

pub use filter_store::FilterStore;
pub use publisher::{
    DEFAULT_EVENT_CAPACITY, FilterState, MatchState, StatePublisher, TransitionEvent,
};
