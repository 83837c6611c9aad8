//! The Turing machine transition relation, keyed by an explicit (state, read tuple) value.

use crate::analyzer::AnalysisError;
use crate::program::Transition;
use crate::types::Symbol;
use std::collections::HashMap;

/// Lookup key of a rule: the current state and the symbol under each head.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub state: String,
    pub read: Vec<Symbol>,
}

impl RuleKey {
    pub fn new(state: impl Into<String>, read: Vec<Symbol>) -> Self {
        Self {
            state: state.into(),
            read,
        }
    }
}

/// A partial function from `RuleKey` to `Transition`.
///
/// Built once from a program's rule list; a second rule for an existing key is rejected
/// instead of being shadowed.
#[derive(Debug, Clone, Default)]
pub struct TransitionRelation {
    tapes: usize,
    rules: HashMap<RuleKey, Transition>,
}

impl TransitionRelation {
    pub fn build(tapes: usize, transitions: &[Transition]) -> Result<Self, AnalysisError> {
        let mut rules = HashMap::with_capacity(transitions.len());

        for transition in transitions {
            let key = RuleKey::new(transition.from.clone(), transition.read.clone());
            if rules.contains_key(&key) {
                return Err(AnalysisError::DuplicateTransition(key.state, key.read));
            }
            rules.insert(key, transition.clone());
        }

        Ok(Self { tapes, rules })
    }

    pub fn get(&self, key: &RuleKey) -> Option<&Transition> {
        self.rules.get(key)
    }

    /// Looks up the rule for `state` reading `symbols` without building a key by hand.
    pub fn lookup(&self, state: &str, symbols: &[Symbol]) -> Option<&Transition> {
        self.get(&RuleKey::new(state, symbols.to_vec()))
    }

    pub fn tapes(&self) -> usize {
        self.tapes
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Direction};

    fn rule(from: &str, read: &[Symbol], to: &str) -> Transition {
        Transition {
            from: from.to_string(),
            read: read.to_vec(),
            actions: read.iter().map(|_| Action::shift(Direction::Stay)).collect(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_lookup_by_state_and_tuple() {
        let a = Symbol::Mark('a');
        let relation = TransitionRelation::build(
            2,
            &[
                rule("q0", &[a, Symbol::Blank], "q1"),
                rule("q0", &[Symbol::Blank, a], "q2"),
            ],
        )
        .unwrap();

        assert_eq!(relation.len(), 2);
        assert_eq!(relation.tapes(), 2);
        assert_eq!(
            relation.lookup("q0", &[a, Symbol::Blank]).map(|t| t.to.as_str()),
            Some("q1")
        );
        assert!(relation.lookup("q0", &[a, a]).is_none());
        assert!(relation.lookup("q1", &[a, Symbol::Blank]).is_none());
    }

    #[test]
    fn test_concatenation_does_not_collide() {
        // ("q1", "1") and ("q", "11") would share the string key "q11".
        let relation = TransitionRelation::build(
            1,
            &[
                rule("q1", &[Symbol::Mark('1')], "a"),
                rule("q", &[Symbol::Mark('1')], "b"),
            ],
        );
        assert!(relation.is_ok());
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let a = Symbol::Mark('a');
        let error = TransitionRelation::build(1, &[rule("q0", &[a], "q1"), rule("q0", &[a], "q2")])
            .unwrap_err();

        assert_eq!(error, AnalysisError::DuplicateTransition("q0".to_string(), vec![a]));
    }
}
