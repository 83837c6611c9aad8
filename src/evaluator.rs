//! Acceptance search for finite automata with epsilon edges and multi-character labels.

use crate::program::FiniteAutomaton;
use crate::types::Label;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

/// Result of running a word through a finite automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accepted: bool,
    /// Every state that appeared in an explored configuration.
    pub explored: BTreeSet<String>,
    /// Number of `(state, position)` configurations dequeued.
    pub configurations: usize,
    /// The accepting state reached at the end of the input, if any.
    pub accepting_state: Option<String>,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let explored = self
            .explored
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        match &self.accepting_state {
            Some(state) if self.accepted => write!(
                f,
                "accepted in state {} after {} configurations (explored: {})",
                state, self.configurations, explored
            ),
            _ => write!(
                f,
                "rejected after {} configurations (explored: {})",
                self.configurations, explored
            ),
        }
    }
}

/// Breadth-first search over `(state, position)` configurations.
///
/// Epsilon edges keep the position; word edges advance by the label's length when the label
/// occurs in `word` exactly at the current position. Epsilon edges are still followed from
/// configurations that have consumed the whole word, so an accepting state reachable from the
/// end of the input through epsilon edges is found. The search stops at the first accepting
/// configuration.
///
/// The automaton is expected to have passed [`analyze_finite`](crate::analyzer::analyze_finite),
/// as everything returned by `parse` and `Pipeline::run` has. Edges into undeclared states are
/// followed as if the states were declared.
pub fn evaluate(automaton: &FiniteAutomaton, word: &str) -> Evaluation {
    let input: Vec<char> = word.chars().collect();
    let mut queue = VecDeque::from([(automaton.start.clone(), 0usize)]);
    let mut visited = HashSet::from([(automaton.start.clone(), 0usize)]);
    let mut explored = BTreeSet::new();
    let mut configurations = 0;

    while let Some((state, position)) = queue.pop_front() {
        configurations += 1;
        explored.insert(state.clone());
        log::trace!("configuration ({}, {})", state, position);

        if position == input.len() && automaton.is_accepting(&state) {
            log::debug!(
                "'{}' accepted {:?} in state {} after {} configurations",
                automaton.name,
                word,
                state,
                configurations
            );
            return Evaluation {
                accepted: true,
                explored,
                configurations,
                accepting_state: Some(state),
            };
        }

        for (label, targets) in automaton.edges(&state) {
            let next = match label {
                Label::Epsilon => position,
                Label::Word(w) => match matches_at(&input, position, w) {
                    Some(end) => end,
                    None => continue,
                },
            };

            for target in targets {
                if visited.insert((target.clone(), next)) {
                    queue.push_back((target.clone(), next));
                }
            }
        }
    }

    log::debug!(
        "'{}' rejected {:?} after {} configurations",
        automaton.name,
        word,
        configurations
    );
    Evaluation {
        accepted: false,
        explored,
        configurations,
        accepting_state: None,
    }
}

/// If `label` occurs in `input` starting at `position`, returns the position just past it.
fn matches_at(input: &[char], position: usize, label: &str) -> Option<usize> {
    let mut end = position;
    for c in label.chars() {
        if input.get(end) != Some(&c) {
            return None;
        }
        end += 1;
    }

    Some(end)
}
