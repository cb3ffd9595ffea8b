//! Rule evaluation against decoded measurements.

use crate::core::rule::FilterRule;
use crate::core::types::Measurement;
use crate::error::Error;
use crate::state::publisher::{MatchState, StatePublisher, TransitionEvent};

/// Match state of `rule` for `measurement`.
///
/// `None` when the measurement does not carry the rule's channel.
#[inline]
pub fn evaluate_rule(rule: &FilterRule, measurement: &Measurement) -> Option<MatchState> {
    measurement
        .current(rule.channel)
        .map(|value| MatchState::from(rule.matches(value)))
}

/// Evaluate a rule snapshot and apply resulting transitions.
///
/// Returns the transitions actually applied, in snapshot order. Rules removed
/// after the snapshot was taken are skipped.
pub fn evaluate(
    rules: &[FilterRule],
    measurement: &Measurement,
    states: &StatePublisher,
) -> Vec<TransitionEvent> {
    let mut events = Vec::new();

    for rule in rules {
        let Some(new_state) = evaluate_rule(rule, measurement) else {
            continue;
        };

        let previous = match states.get(rule.id) {
            Ok(state) => state.state,
            Err(_) => continue,
        };

        if previous == new_state {
            continue;
        }

        let event = TransitionEvent {
            filter_id: rule.id,
            rule: *rule,
            old_state: previous,
            new_state,
            reading_timestamp_us: measurement.timestamp_us(),
        };

        match states.apply_transition(&event) {
            Ok(true) => events.push(event),
            Ok(false) => log::debug!("Stale transition for {} discarded", rule.id),
            Err(Error::NotFound(id)) => {
                log::debug!("Filter {} removed during evaluation", id)
            }
            Err(e) => log::warn!("Transition for {} failed: {}", rule.id, e),
        }
    }

    events
}
