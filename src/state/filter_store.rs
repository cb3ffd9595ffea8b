//! Filter store: the authoritative set of active rules.
//!
//! Mutations keep the [`StatePublisher`] in lockstep: a rule's state exists
//! before the rule becomes visible to a snapshot, and disappears together
//! with it. Lock order is always store, then publisher.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::publisher::{FilterState, StatePublisher};
use crate::core::rule::{FilterRule, RuleSpec};
use crate::core::types::FilterId;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Rules {
    next_id: u64,
    by_id: BTreeMap<FilterId, FilterRule>,
}

/// Set of active filter rules.
#[derive(Debug)]
pub struct FilterStore {
    rules: RwLock<Rules>,
    states: Arc<StatePublisher>,
}

impl FilterStore {
    /// Create an empty store whose rule states live in `states`.
    pub fn new(states: Arc<StatePublisher>) -> Self {
        Self {
            rules: RwLock::new(Rules::default()),
            states,
        }
    }

    /// Add a validated rule and return its fresh id.
    ///
    /// The rule starts Unmatched and is seen by the next snapshot.
    pub fn add(&self, spec: RuleSpec) -> FilterId {
        let mut rules = self.rules.write();
        rules.next_id += 1;
        let id = FilterId::new(rules.next_id);

        self.states.track(id);
        rules.by_id.insert(id, FilterRule::new(id, spec));
        id
    }

    /// Remove a rule and its state.
    pub fn remove(&self, id: FilterId) -> Result<FilterRule> {
        let mut rules = self.rules.write();
        let rule = rules.by_id.remove(&id).ok_or(Error::NotFound(id))?;
        self.states.untrack(id);
        Ok(rule)
    }

    /// Point-in-time copy of all rules, in insertion order.
    pub fn snapshot(&self) -> Vec<FilterRule> {
        self.rules.read().by_id.values().copied().collect()
    }

    /// Rules paired with their current states, read under one consistent view.
    pub fn snapshot_with_states(&self) -> Vec<(FilterRule, FilterState)> {
        let rules = self.rules.read();
        rules
            .by_id
            .values()
            .filter_map(|rule| self.states.get(rule.id).ok().map(|state| (*rule, state)))
            .collect()
    }

    pub fn get(&self, id: FilterId) -> Result<FilterRule> {
        self.rules
            .read()
            .by_id
            .get(&id)
            .copied()
            .ok_or(Error::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.rules.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Channel;
    use crate::state::publisher::MatchState;

    fn store() -> (FilterStore, Arc<StatePublisher>) {
        let states = Arc::new(StatePublisher::default());
        (FilterStore::new(Arc::clone(&states)), states)
    }

    fn spec(text: &str) -> RuleSpec {
        RuleSpec::parse(text).unwrap()
    }

    #[test]
    fn test_add_creates_state() {
        let (store, states) = store();
        let id = store.add(spec("Ia > 5"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().channel, Channel::Ia);
        assert_eq!(states.get(id).unwrap().state, MatchState::Unmatched);
    }

    #[test]
    fn test_ids_unique_and_ordered() {
        let (store, _) = store();
        let a = store.add(spec("Ia > 5"));
        let b = store.add(spec("Ia > 5"));
        store.remove(a).unwrap();
        let c = store.add(spec("Ib < 3"));

        assert!(a < b && b < c);
        let ids: Vec<FilterId> = store.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, c]);
    }

    #[test]
    fn test_remove() {
        let (store, states) = store();
        let id = store.add(spec("Ic = 7"));

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.to_string(), "Ic = 7");
        assert!(store.is_empty());
        assert!(states.is_empty());

        assert!(matches!(store.remove(id), Err(Error::NotFound(_))));
        assert!(matches!(store.get(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (store, _) = store();
        store.add(spec("Ia > 5"));
        let snapshot = store.snapshot();

        store.add(spec("Ib > 5"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_snapshot_with_states() {
        let (store, _) = store();
        let a = store.add(spec("Ia > 5"));
        let b = store.add(spec("Ih < 1"));

        let view = store.snapshot_with_states();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].0.id, a);
        assert_eq!(view[0].1.id, a);
        assert_eq!(view[1].1.id, b);
    }
}
