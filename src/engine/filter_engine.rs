//! Filter engine: the owned core tying store, publisher and evaluation together.
//!
//! All presentation-layer operations go through here. The engine itself is
//! synchronous; [`crate::monitor::Monitor`] drives it from the ingest thread.

use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;

use super::evaluator;
use super::telemetry::{EngineStats, Telemetry};
use crate::core::rule::{FilterRule, Operator, RuleSpec};
use crate::core::types::{Channel, Device, FilterId, Measurement, now_us};
use crate::error::{Error, Result};
use crate::io::decoder;
use crate::io::udp_notifier::StatusNotifier;
use crate::state::filter_store::FilterStore;
use crate::state::publisher::{
    DEFAULT_EVENT_CAPACITY, FilterState, MatchState, StatePublisher, TransitionEvent,
};

/// Presentation row: a rule and its current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStateView {
    pub rule: FilterRule,
    pub state: MatchState,
    pub last_transition_us: Option<u64>,
}

impl FilterStateView {
    pub fn id(&self) -> FilterId {
        self.rule.id
    }

    pub fn device(&self) -> Device {
        self.rule.channel.device()
    }

    pub fn is_matched(&self) -> bool {
        self.state.is_matched()
    }
}

/// Threshold filter engine.
#[derive(Debug)]
pub struct FilterEngine {
    store: FilterStore,
    states: Arc<StatePublisher>,
    telemetry: Telemetry,
}

impl FilterEngine {
    /// Create an engine with an optional outbound notifier.
    pub fn new(notifier: Option<StatusNotifier>, event_capacity: usize) -> Self {
        let states = Arc::new(StatePublisher::new(notifier, event_capacity));
        Self {
            store: FilterStore::new(Arc::clone(&states)),
            states,
            telemetry: Telemetry::new(),
        }
    }

    /// Add a rule from its parts.
    pub fn add_filter(
        &self,
        channel: Channel,
        operator: Operator,
        threshold: u32,
    ) -> Result<FilterId> {
        let spec = RuleSpec::new(channel, operator, threshold)?;
        Ok(self.add_rule(spec))
    }

    /// Add a rule from its textual form (`"Ia > 5"`).
    pub fn add_filter_str(&self, text: &str) -> Result<FilterId> {
        let spec = RuleSpec::parse(text)?;
        Ok(self.add_rule(spec))
    }

    /// Add an already validated rule.
    pub fn add_rule(&self, spec: RuleSpec) -> FilterId {
        let id = self.store.add(spec);
        log::info!("Added filter {}: {}", id, spec);
        id
    }

    pub fn remove_filter(&self, id: FilterId) -> Result<()> {
        let rule = self.store.remove(id)?;
        log::info!("Removed filter {}: {}", id, rule);
        Ok(())
    }

    /// All rules with their states, in insertion order.
    pub fn list_filter_states(&self) -> Vec<FilterStateView> {
        self.store
            .snapshot_with_states()
            .into_iter()
            .map(|(rule, state)| FilterStateView {
                rule,
                state: state.state,
                last_transition_us: state.last_transition_us,
            })
            .collect()
    }

    pub fn filter_state(&self, id: FilterId) -> Result<FilterState> {
        self.states.get(id)
    }

    pub fn filter_rule(&self, id: FilterId) -> Result<FilterRule> {
        self.store.get(id)
    }

    pub fn filter_count(&self) -> usize {
        self.store.len()
    }

    /// Subscribe to transition events.
    pub fn subscribe(&self) -> Receiver<TransitionEvent> {
        self.states.subscribe()
    }

    /// Decode and evaluate one datagram received now.
    pub fn process_datagram(&self, payload: &[u8]) -> Result<Vec<TransitionEvent>> {
        self.process_datagram_at(payload, now_us())
    }

    /// Decode and evaluate one datagram with an explicit arrival timestamp.
    ///
    /// Malformed payloads are counted and returned as `MalformedPacket`; they
    /// never reach evaluation.
    pub fn process_datagram_at(
        &self,
        payload: &[u8],
        timestamp_us: u64,
    ) -> Result<Vec<TransitionEvent>> {
        self.telemetry.record_received();

        let measurement = match decoder::decode(payload, timestamp_us) {
            Ok(m) => m,
            Err(e) => {
                self.telemetry.record_malformed();
                return Err(e);
            }
        };
        self.telemetry.record_decoded();

        Ok(self.process(&measurement))
    }

    /// Evaluate a decoded measurement against the current rules.
    pub fn process(&self, measurement: &Measurement) -> Vec<TransitionEvent> {
        let started = Instant::now();

        let rules = self.store.snapshot();
        let events = evaluator::evaluate(&rules, measurement, &self.states);

        let elapsed = started.elapsed();
        self.telemetry.record_processing(elapsed);
        self.telemetry.record_transitions(events.len());

        for event in &events {
            log::debug!(
                "{} {} -> {:?} ({:.3} ms)",
                event.filter_id,
                event.rule,
                event.new_state,
                elapsed.as_secs_f64() * 1000.0
            );
        }

        events
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> EngineStats {
        let mut stats = self.telemetry.snapshot();
        stats.active_filters = self.store.len();
        if let Some(notifier) = self.states.notifier() {
            stats.notifications_sent = notifier.sent();
            stats.notifications_failed = notifier.failed();
        }
        stats
    }

    /// Install startup rules; the first invalid one aborts.
    pub fn install_filters<I, S>(&self, filters: I) -> Result<Vec<FilterId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = filters
            .into_iter()
            .map(|text| RuleSpec::parse(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(specs.into_iter().map(|spec| self.add_rule(spec)).collect())
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(None, DEFAULT_EVENT_CAPACITY)
    }
}

/// Whether an error from [`FilterEngine::process_datagram`] only concerns the
/// datagram itself.
pub fn is_packet_error(error: &Error) -> bool {
    matches!(error, Error::MalformedPacket(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH: &[u8] = b"10,0,0,0,0,0,0,0";
    const LOW: &[u8] = b"3,0,0,0,0,0,0,0";

    #[test]
    fn test_threshold_scenario() {
        let engine = FilterEngine::default();
        let rx = engine.subscribe();
        let id = engine.add_filter_str("Ia > 5").unwrap();

        let events = engine.process_datagram_at(HIGH, 1).unwrap();
        assert_eq!(events.len(), 1);
        assert!(engine.filter_state(id).unwrap().is_matched());

        let events = engine.process_datagram_at(LOW, 2).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!engine.filter_state(id).unwrap().is_matched());

        let received: Vec<TransitionEvent> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].new_state, MatchState::Matched);
        assert_eq!(received[1].new_state, MatchState::Unmatched);
        assert_eq!(received[1].reading_timestamp_us, 2);
    }

    #[test]
    fn test_repeated_reading_no_duplicate() {
        let engine = FilterEngine::default();
        engine.add_filter(Channel::Ia, Operator::Greater, 5).unwrap();

        assert_eq!(engine.process_datagram_at(HIGH, 1).unwrap().len(), 1);
        assert!(engine.process_datagram_at(HIGH, 2).unwrap().is_empty());
        assert_eq!(engine.stats().transitions, 1);
    }

    #[test]
    fn test_malformed_then_continue() {
        let engine = FilterEngine::default();
        let id = engine.add_filter_str("Ia > 5").unwrap();

        let err = engine.process_datagram_at(b"1,2,3", 1).unwrap_err();
        assert!(is_packet_error(&err));
        assert!(!engine.filter_state(id).unwrap().is_matched());

        assert_eq!(engine.process_datagram_at(HIGH, 2).unwrap().len(), 1);

        let stats = engine.stats();
        assert_eq!(stats.datagrams_received, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.decoded, 1);
        assert_eq!(stats.evaluations, 1);
    }

    #[test]
    fn test_invalid_rule_leaves_store_unchanged() {
        let engine = FilterEngine::default();
        engine.add_filter_str("Ib < 2").unwrap();

        assert!(matches!(
            engine.add_filter_str("Iz > 5"),
            Err(Error::InvalidRule(_))
        ));
        assert!(matches!(
            engine.add_filter(Channel::Ia, Operator::Less, 0),
            Err(Error::InvalidRule(_))
        ));
        assert_eq!(engine.filter_count(), 1);
    }

    #[test]
    fn test_remove_and_list() {
        let engine = FilterEngine::default();
        let a = engine.add_filter_str("Ia > 5").unwrap();
        let b = engine.add_filter_str("Ih = 19").unwrap();
        engine.process_datagram_at(b"10,0,0,0,0,0,0,19", 5).unwrap();

        let views = engine.list_filter_states();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id(), a);
        assert_eq!(views[1].device(), Device::Four);
        assert!(views.iter().all(|v| v.is_matched()));
        assert_eq!(views[1].last_transition_us, Some(5));

        engine.remove_filter(a).unwrap();
        assert!(matches!(engine.remove_filter(a), Err(Error::NotFound(_))));
        assert!(matches!(engine.filter_state(a), Err(Error::NotFound(_))));

        let views = engine.list_filter_states();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id(), b);
        assert_eq!(engine.filter_count(), views.len());
    }

    #[test]
    fn test_no_rules_is_noop() {
        let engine = FilterEngine::default();
        assert!(engine.process_datagram_at(HIGH, 1).unwrap().is_empty());
        assert_eq!(engine.stats().active_filters, 0);
    }

    #[test]
    fn test_install_filters() {
        let engine = FilterEngine::default();
        let ids = engine.install_filters(["Ia > 5", "Ic=7"]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(engine.filter_rule(ids[1]).unwrap().to_string(), "Ic = 7");

        assert!(engine.install_filters(["Ib > 1", "bogus"]).is_err());
        assert_eq!(engine.filter_count(), 2);
    }

    #[test]
    fn test_device_sample_datagram() {
        let engine = FilterEngine::default();
        let id = engine.add_filter_str("Id > 5").unwrap();
        let other = engine.add_filter_str("Ic > 5").unwrap();

        let events = engine
            .process_datagram_at(br#"{"id": 2, "device": "Id", "measurement[A]": 8}"#, 9)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].filter_id, id);
        assert!(!engine.filter_state(other).unwrap().is_matched());
    }
}
