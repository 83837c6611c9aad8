//! Nondeterministic pushdown automaton search.
//!
//! Configurations are explored breadth-first. Identical configurations are visited once,
//! and the number of expanded configurations is bounded because a stack can grow without
//! limit along epsilon-push loops.

use crate::program::{PdaTransition, PushdownAutomaton};
use crate::types::{Letter, MAX_SEARCH_STEPS};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// A snapshot of a pushdown computation. The last element of `stack` is the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration {
    pub state: String,
    pub position: usize,
    pub stack: Vec<char>,
}

impl Configuration {
    pub fn top(&self) -> Option<char> {
        self.stack.last().copied()
    }

    /// The configuration produced by `transition`, or `None` if it does not apply.
    fn apply(&self, transition: &PdaTransition, input: &[char]) -> Option<Configuration> {
        let position = match transition.input {
            Letter::Epsilon => self.position,
            Letter::Char(c) if input.get(self.position) == Some(&c) => self.position + 1,
            Letter::Char(_) => return None,
        };

        let mut stack = self.stack.clone();
        match transition.top {
            Letter::Epsilon => {}
            Letter::Char(c) if self.top() == Some(c) => {
                stack.pop();
            }
            Letter::Char(_) => return None,
        }
        stack.extend(transition.push.chars().rev());

        Some(Configuration {
            state: transition.to.clone(),
            position,
            stack,
        })
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack: String = self.stack.iter().rev().collect();
        write!(f, "({}, {}, {})", self.state, self.position, stack)
    }
}

/// How a pushdown search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// An accepting configuration with the whole input consumed was found.
    Accepted,
    /// Every reachable configuration was explored without acceptance.
    Rejected,
    /// The step bound was hit first; the word may or may not be accepted.
    Exhausted,
}

/// Result of running a word through a pushdown automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdaOutcome {
    pub verdict: Verdict,
    /// Number of configurations expanded.
    pub explored: usize,
    /// The accepting configuration when accepted, otherwise the last one expanded.
    pub configuration: Option<Configuration>,
}

impl PdaOutcome {
    pub fn accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

impl fmt::Display for PdaOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.verdict, &self.configuration) {
            (Verdict::Accepted, Some(config)) => write!(
                f,
                "accepted in configuration {} after {} steps",
                config, self.explored
            ),
            (Verdict::Exhausted, _) => write!(
                f,
                "undecided: search stopped after {} steps without acceptance",
                self.explored
            ),
            _ => write!(
                f,
                "rejected: all {} reachable configurations explored",
                self.explored
            ),
        }
    }
}

/// Runs `word` through `automaton` with the default bound of `MAX_SEARCH_STEPS`.
///
/// The automaton is expected to have passed
/// [`analyze_pushdown`](crate::analyzer::analyze_pushdown); `parse` guarantees this.
pub fn evaluate(automaton: &PushdownAutomaton, word: &str) -> PdaOutcome {
    evaluate_with_limit(automaton, word, MAX_SEARCH_STEPS)
}

/// Runs `word` through `automaton`, expanding at most `limit` configurations.
pub fn evaluate_with_limit(automaton: &PushdownAutomaton, word: &str, limit: usize) -> PdaOutcome {
    let input: Vec<char> = word.chars().collect();
    let initial = Configuration {
        state: automaton.start.clone(),
        position: 0,
        stack: vec![automaton.initial_stack],
    };

    let mut visited = HashSet::from([initial.clone()]);
    let mut queue = VecDeque::from([initial]);
    let mut explored = 0;
    let mut last = None;

    while let Some(config) = queue.pop_front() {
        if explored == limit {
            log::warn!(
                "'{}' search on {:?} stopped after {} steps with {} configurations pending",
                automaton.name,
                word,
                explored,
                queue.len() + 1
            );
            return PdaOutcome {
                verdict: Verdict::Exhausted,
                explored,
                configuration: last,
            };
        }
        explored += 1;
        log::trace!("expanding {}", config);

        if config.position == input.len() && automaton.is_accepting(&config.state) {
            log::debug!(
                "'{}' accepted {:?} after {} steps",
                automaton.name,
                word,
                explored
            );
            return PdaOutcome {
                verdict: Verdict::Accepted,
                explored,
                configuration: Some(config),
            };
        }

        for transition in automaton.transitions_from(&config.state) {
            if let Some(next) = config.apply(transition, &input) {
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        last = Some(config);
    }

    log::debug!(
        "'{}' rejected {:?} after {} steps",
        automaton.name,
        word,
        explored
    );
    PdaOutcome {
        verdict: Verdict::Rejected,
        explored,
        configuration: last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn rule(from: &str, input: Letter, top: Letter, push: &str, to: &str) -> PdaTransition {
        PdaTransition {
            from: from.to_string(),
            input,
            top,
            to: to.to_string(),
            push: push.to_string(),
        }
    }

    fn balanced_parentheses() -> PushdownAutomaton {
        use Letter::{Char, Epsilon};

        PushdownAutomaton {
            name: "Balanced Parentheses".to_string(),
            states: BTreeSet::from(["p".to_string(), "f".to_string()]),
            start: "p".to_string(),
            accept: BTreeSet::from(["f".to_string()]),
            initial_stack: 'Z',
            transitions: vec![
                rule("p", Char('('), Char('Z'), "(Z", "p"),
                rule("p", Char('('), Char('('), "((", "p"),
                rule("p", Char(')'), Char('('), "", "p"),
                rule("p", Epsilon, Char('Z'), "Z", "f"),
            ],
        }
    }

    #[test]
    fn test_balanced_parentheses() {
        let pda = balanced_parentheses();

        let accepted = evaluate(&pda, "(())()");
        assert_eq!(accepted.verdict, Verdict::Accepted);
        assert!(accepted.accepted());
        assert_eq!(
            accepted.configuration,
            Some(Configuration {
                state: "f".to_string(),
                position: 6,
                stack: vec!['Z'],
            })
        );

        let rejected = evaluate(&pda, "(()");
        assert_eq!(rejected.verdict, Verdict::Rejected);
        assert!(rejected.to_string().starts_with("rejected"));

        assert!(evaluate(&pda, "").accepted());
        assert!(!evaluate(&pda, ")(").accepted());
    }

    #[test]
    fn test_hand_built_automaton_is_analyzed_before_evaluation() {
        let mut pda = balanced_parentheses();
        crate::analyzer::analyze_pushdown(&pda).unwrap();
        assert!(evaluate(&pda, "()").accepted());

        pda.transitions
            .push(rule("f", Letter::Char('x'), Letter::Epsilon, "", "ghost"));
        assert!(crate::analyzer::analyze_pushdown(&pda).is_err());
        assert_eq!(evaluate(&pda, "()x").verdict, Verdict::Rejected);
    }

    #[test]
    fn test_push_places_first_character_on_top() {
        let config = Configuration {
            state: "p".to_string(),
            position: 0,
            stack: vec!['Z'],
        };
        let next = config
            .apply(&rule("p", Letter::Epsilon, Letter::Char('Z'), "abZ", "q"), &[])
            .unwrap();

        assert_eq!(next.stack, vec!['Z', 'b', 'a']);
        assert_eq!(next.top(), Some('a'));
        assert_eq!(next.to_string(), "(q, 0, abZ)");
    }

    #[test]
    fn test_input_symbol_past_end_does_not_apply() {
        let config = Configuration {
            state: "p".to_string(),
            position: 1,
            stack: vec![],
        };

        assert!(config
            .apply(&rule("p", Letter::Char('a'), Letter::Epsilon, "", "p"), &['a'])
            .is_none());
        // An epsilon top with an empty stack still applies.
        assert!(config
            .apply(&rule("p", Letter::Epsilon, Letter::Epsilon, "x", "p"), &['a'])
            .is_some());
        assert!(config
            .apply(&rule("p", Letter::Epsilon, Letter::Char('Z'), "", "p"), &['a'])
            .is_none());
    }

    #[test]
    fn test_epsilon_loop_preserving_stack_terminates() {
        let pda = PushdownAutomaton {
            name: "loop".to_string(),
            states: BTreeSet::from(["p".to_string(), "q".to_string()]),
            start: "p".to_string(),
            accept: BTreeSet::new(),
            initial_stack: 'Z',
            transitions: vec![
                rule("p", Letter::Epsilon, Letter::Epsilon, "", "q"),
                rule("q", Letter::Epsilon, Letter::Epsilon, "", "p"),
            ],
        };

        let outcome = evaluate(&pda, "");
        assert_eq!(outcome.verdict, Verdict::Rejected);
        assert_eq!(outcome.explored, 2);
    }

    #[test]
    fn test_unbounded_push_is_exhausted_not_rejected() {
        let pda = PushdownAutomaton {
            name: "grow".to_string(),
            states: BTreeSet::from(["p".to_string()]),
            start: "p".to_string(),
            accept: BTreeSet::new(),
            initial_stack: 'Z',
            transitions: vec![rule("p", Letter::Epsilon, Letter::Epsilon, "A", "p")],
        };

        let outcome = evaluate_with_limit(&pda, "", 50);
        assert_eq!(outcome.verdict, Verdict::Exhausted);
        assert_eq!(outcome.explored, 50);
        assert!(!outcome.accepted());
        assert!(outcome.to_string().starts_with("undecided"));
    }
}
