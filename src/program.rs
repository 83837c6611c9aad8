//! Model types for the three machine kinds and the `Definition` envelope the parser produces.
//!
//! Models are plain data. They are validated by the analyzer before any engine component
//! runs them and are never mutated by the engine afterwards.

use crate::types::{Action, Label, Letter, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The kind of machine a definition describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Turing,
    Finite,
    Pushdown,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Turing => "turing",
            Kind::Finite => "finite",
            Kind::Pushdown => "pushdown",
        };
        write!(f, "{name}")
    }
}

/// A parsed and validated machine of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Definition {
    Turing(TuringProgram),
    Finite(FiniteAutomaton),
    Pushdown(PushdownAutomaton),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Turing(p) => &p.name,
            Definition::Finite(a) => &a.name,
            Definition::Pushdown(a) => &a.name,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Definition::Turing(_) => Kind::Turing,
            Definition::Finite(_) => Kind::Finite,
            Definition::Pushdown(_) => Kind::Pushdown,
        }
    }

    pub fn states(&self) -> &BTreeSet<String> {
        match self {
            Definition::Turing(p) => &p.states,
            Definition::Finite(a) => &a.states,
            Definition::Pushdown(a) => &a.states,
        }
    }

    pub fn transition_count(&self) -> usize {
        match self {
            Definition::Turing(p) => p.transitions.len(),
            Definition::Finite(a) => a.transition_count(),
            Definition::Pushdown(a) => a.transitions.len(),
        }
    }
}

/// A single Turing machine rule: in state `from` reading `read` (one symbol per tape),
/// apply `actions` (one per tape) and move to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub read: Vec<Symbol>,
    pub actions: Vec<Action>,
    pub to: String,
}

/// A multi-tape Turing machine together with its initial tapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuringProgram {
    pub name: String,
    pub states: BTreeSet<String>,
    pub start: String,
    pub accept: BTreeSet<String>,
    /// Initial content of each tape, laid out from position 0.
    pub tapes: Vec<Vec<Symbol>>,
    pub transitions: Vec<Transition>,
}

impl TuringProgram {
    pub fn tape_count(&self) -> usize {
        self.tapes.len()
    }

    /// Checks if the program is configured for a single-tape Turing Machine.
    pub fn is_single_tape(&self) -> bool {
        self.tapes.len() == 1
    }
}

/// A finite automaton with epsilon edges and multi-character labels.
///
/// The same shape is used for every stage of the transformation pipeline, so a derived
/// DFA can be printed, evaluated or transformed again like any hand-written automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiniteAutomaton {
    pub name: String,
    pub states: BTreeSet<String>,
    pub alphabet: BTreeSet<String>,
    pub start: String,
    pub accept: BTreeSet<String>,
    /// `state -> label -> destinations`.
    pub transitions: BTreeMap<String, BTreeMap<Label, BTreeSet<String>>>,
}

impl FiniteAutomaton {
    /// Creates an automaton with a single (start) state and no edges.
    pub fn new(name: impl Into<String>, start: impl Into<String>) -> Self {
        let start = start.into();
        Self {
            name: name.into(),
            states: BTreeSet::from([start.clone()]),
            alphabet: BTreeSet::new(),
            start,
            accept: BTreeSet::new(),
            transitions: BTreeMap::new(),
        }
    }

    pub fn add_state(&mut self, state: impl Into<String>) {
        self.states.insert(state.into());
    }

    /// Declares `state` and marks it accepting.
    pub fn add_accept(&mut self, state: impl Into<String>) {
        let state = state.into();
        self.states.insert(state.clone());
        self.accept.insert(state);
    }

    /// Adds an edge. Word labels join the alphabet; endpoints are not declared implicitly.
    pub fn add_transition(&mut self, from: impl Into<String>, label: Label, to: impl Into<String>) {
        if let Label::Word(word) = &label {
            self.alphabet.insert(word.clone());
        }
        self.transitions
            .entry(from.into())
            .or_default()
            .entry(label)
            .or_default()
            .insert(to.into());
    }

    pub fn targets(&self, state: &str, label: &Label) -> Option<&BTreeSet<String>> {
        self.transitions.get(state)?.get(label)
    }

    /// Outgoing edges of `state` grouped by label.
    pub fn edges<'a>(
        &'a self,
        state: &str,
    ) -> impl Iterator<Item = (&'a Label, &'a BTreeSet<String>)> + 'a {
        self.transitions.get(state).into_iter().flatten()
    }

    /// Number of (source, label, destination) triples.
    pub fn transition_count(&self) -> usize {
        self.transitions
            .values()
            .flat_map(|edges| edges.values())
            .map(|targets| targets.len())
            .sum()
    }

    pub fn is_accepting(&self, state: &str) -> bool {
        self.accept.contains(state)
    }

    /// True when every non-epsilon label consumes exactly one character.
    pub fn is_unit(&self) -> bool {
        self.transitions
            .values()
            .flat_map(|edges| edges.keys())
            .all(|label| label.is_epsilon() || label.len() == 1)
    }

    /// True when the automaton has no epsilon edges, only unit labels,
    /// and at most one destination per (state, label).
    pub fn is_deterministic(&self) -> bool {
        self.transitions
            .values()
            .flat_map(|edges| edges.iter())
            .all(|(label, targets)| !label.is_epsilon() && label.len() == 1 && targets.len() == 1)
    }

    /// The single destination of a deterministic edge.
    pub fn next(&self, state: &str, symbol: &str) -> Option<&String> {
        self.targets(state, &Label::word(symbol))?.iter().next()
    }
}

/// A pushdown rule: in state `from`, reading `input`, with `top` on the stack,
/// move to `to` and push `push` (its first character ends up on top).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PdaTransition {
    pub from: String,
    pub input: Letter,
    pub top: Letter,
    pub to: String,
    /// Empty for an epsilon push.
    pub push: String,
}

/// A nondeterministic pushdown automaton accepting by final state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushdownAutomaton {
    pub name: String,
    pub states: BTreeSet<String>,
    pub start: String,
    pub accept: BTreeSet<String>,
    pub initial_stack: char,
    pub transitions: Vec<PdaTransition>,
}

impl PushdownAutomaton {
    pub fn is_accepting(&self, state: &str) -> bool {
        self.accept.contains(state)
    }

    /// Transitions leaving `state`, in declaration order.
    pub fn transitions_from<'a>(
        &'a self,
        state: &'a str,
    ) -> impl Iterator<Item = &'a PdaTransition> + 'a {
        self.transitions.iter().filter(move |t| t.from == state)
    }
}
