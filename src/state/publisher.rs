//! Filter state publisher.
//!
//! Holds the authoritative [`FilterState`] of every active rule and fans
//! transitions out to subscribers and (optionally) the UDP status notifier.
//!
//! Access pattern:
//! - Ingest thread: reads states, applies transitions
//! - Filter store: creates/removes states in lockstep with rules
//! - Presentation layer: reads states, subscribes to transitions

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

use crate::core::rule::FilterRule;
use crate::core::types::FilterId;
use crate::error::{Error, Result};
use crate::io::udp_notifier::StatusNotifier;

/// Default capacity of each subscriber's event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Match state of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchState {
    /// Threshold not achieved (initial state).
    #[default]
    Unmatched,
    /// Threshold achieved.
    Matched,
}

impl MatchState {
    #[inline]
    pub fn is_matched(self) -> bool {
        self == MatchState::Matched
    }
}

impl From<bool> for MatchState {
    fn from(matched: bool) -> Self {
        if matched {
            MatchState::Matched
        } else {
            MatchState::Unmatched
        }
    }
}

/// Current state of one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    /// Rule this state belongs to.
    pub id: FilterId,
    /// Current match state.
    pub state: MatchState,
    /// Reading timestamp of the last transition (None until the first one).
    pub last_transition_us: Option<u64>,
}

impl FilterState {
    fn new(id: FilterId) -> Self {
        Self {
            id,
            state: MatchState::Unmatched,
            last_transition_us: None,
        }
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        self.state.is_matched()
    }
}

/// A change of a filter's match state between two consecutive evaluations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionEvent {
    pub filter_id: FilterId,
    /// Rule as it was in the evaluation snapshot.
    pub rule: FilterRule,
    pub old_state: MatchState,
    pub new_state: MatchState,
    /// Timestamp of the reading that caused the transition.
    pub reading_timestamp_us: u64,
}

/// Authoritative filter state map plus transition fan-out.
pub struct StatePublisher {
    states: RwLock<BTreeMap<FilterId, FilterState>>,
    subscribers: Mutex<Vec<Sender<TransitionEvent>>>,
    event_capacity: usize,
    notifier: Option<StatusNotifier>,
}

impl StatePublisher {
    /// Create a publisher.
    ///
    /// `notifier` is the optional outbound UDP status sender; `event_capacity`
    /// bounds each subscriber queue.
    pub fn new(notifier: Option<StatusNotifier>, event_capacity: usize) -> Self {
        Self {
            states: RwLock::new(BTreeMap::new()),
            subscribers: Mutex::new(Vec::new()),
            event_capacity: event_capacity.max(1),
            notifier,
        }
    }

    /// State of one filter.
    ///
    /// `NotFound` means the filter is no longer monitored.
    pub fn get(&self, id: FilterId) -> Result<FilterState> {
        self.states.read().get(&id).copied().ok_or(Error::NotFound(id))
    }

    /// All states, in insertion order.
    pub fn get_all(&self) -> Vec<FilterState> {
        self.states.read().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    /// Apply a transition computed by the evaluation engine.
    ///
    /// The state only changes if it still equals `event.old_state`. Returns
    /// `Ok(true)` when applied, `Ok(false)` when the event was stale, and
    /// `NotFound` when the filter was removed after the evaluation snapshot.
    ///
    /// Fan-out and notification happen under the state write lock, so once
    /// [`untrack`](Self::untrack) returns no further event for that filter
    /// is published. Both are non-blocking.
    pub fn apply_transition(&self, event: &TransitionEvent) -> Result<bool> {
        let mut states = self.states.write();
        let state = states
            .get_mut(&event.filter_id)
            .ok_or(Error::NotFound(event.filter_id))?;

        if state.state != event.old_state || event.old_state == event.new_state {
            return Ok(false);
        }

        state.state = event.new_state;
        state.last_transition_us = Some(event.reading_timestamp_us);

        self.broadcast(event);

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(event) {
                log::warn!("Status notification for {} failed: {}", event.filter_id, e);
            }
        }

        drop(states);
        Ok(true)
    }

    /// Register a subscriber for transition events.
    ///
    /// Events are delivered in publication order. A subscriber that falls
    /// more than the configured capacity behind loses the newest events;
    /// dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<TransitionEvent> {
        let (tx, rx) = bounded(self.event_capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Outbound notifier, if configured.
    pub fn notifier(&self) -> Option<&StatusNotifier> {
        self.notifier.as_ref()
    }

    /// Create the initial state for a new rule. Called by the filter store
    /// while it holds its write lock.
    pub(crate) fn track(&self, id: FilterId) {
        self.states.write().insert(id, FilterState::new(id));
    }

    /// Drop the state of a removed rule. Called by the filter store while it
    /// holds its write lock.
    pub(crate) fn untrack(&self, id: FilterId) -> Option<FilterState> {
        self.states.write().remove(&id)
    }

    fn broadcast(&self, event: &TransitionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(*event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Subscriber queue full, dropped event for {}", event.filter_id);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new(None, DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for StatePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatePublisher")
            .field("states", &self.len())
            .field("subscribers", &self.subscriber_count())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}
