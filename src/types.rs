//! This module defines the core data structures and types shared by every machine kind:
//! tape symbols, edge labels, head movements, step outcomes, and the crate's error type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::Rule;

/// Textual form of the blank symbol in definitions and rendered tapes.
pub const INPUT_BLANK_SYMBOL: char = '_';
/// Textual form of a write slot that leaves the cell untouched.
pub const INPUT_KEEP_SYMBOL: char = '*';
/// Textual form of epsilon.
pub const EPSILON: &str = "ε";
/// ASCII alias accepted for epsilon in definitions.
pub const EPSILON_ALIAS: &str = "eps";
/// The maximum allowed size for a definition in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The maximum number of steps `TuringMachine::run` executes before giving up.
pub const MAX_EXECUTION_STEPS: usize = 10000;
/// The maximum number of configurations a pushdown search expands.
pub const MAX_SEARCH_STEPS: usize = 10000;
/// Default number of cells shown on each side of a head in snapshots.
pub const DEFAULT_WINDOW_RADIUS: usize = 8;

/// A tape cell.
///
/// `Blank` is its own variant so a data symbol can never be mistaken for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Blank,
    Mark(char),
}

impl Symbol {
    pub fn is_blank(&self) -> bool {
        matches!(self, Symbol::Blank)
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Symbol::Mark(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Blank => write!(f, "{INPUT_BLANK_SYMBOL}"),
            Symbol::Mark(c) => write!(f, "{c}"),
        }
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Offset applied to a head position.
    pub fn offset(&self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'S',
        };
        write!(f, "{c}")
    }
}

/// What a transition does to one tape: an optional write followed by a head move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// `None` leaves the cell as it is.
    pub write: Option<Symbol>,
    pub direction: Direction,
}

impl Action {
    pub fn new(write: Option<Symbol>, direction: Direction) -> Self {
        Self { write, direction }
    }

    /// An action that only moves the head.
    pub fn shift(direction: Direction) -> Self {
        Self {
            write: None,
            direction,
        }
    }
}

/// A finite-automaton edge label.
///
/// Words may span several characters and are matched against the input as a whole.
/// Serialized as a plain string (`"ε"` for epsilon) so labels can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Epsilon,
    Word(String),
}

impl Label {
    pub fn word(text: impl Into<String>) -> Self {
        Label::Word(text.into())
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Label::Epsilon)
    }

    /// Number of input characters consumed by this label.
    pub fn len(&self) -> usize {
        match self {
            Label::Epsilon => 0,
            Label::Word(w) => w.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Epsilon => write!(f, "{EPSILON}"),
            Label::Word(w) => write!(f, "{w}"),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(if text == EPSILON {
            Label::Epsilon
        } else {
            Label::Word(text)
        })
    }
}

/// A pushdown input symbol or stack top, either of which may be epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    Epsilon,
    Char(char),
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Letter::Epsilon => write!(f, "{EPSILON}"),
            Letter::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Coarse status tag of a step, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Running,
    Accept,
    Halted,
}

/// Represents the outcome of a Turing Machine execution step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// The machine successfully performed a step and continues execution.
    Continue,
    /// The machine has halted.
    Halt(Halt),
}

impl Step {
    pub fn status(&self) -> Status {
        match self {
            Step::Continue => Status::Running,
            Step::Halt(Halt::Accept) => Status::Accept,
            Step::Halt(Halt::NoTransition { .. }) => Status::Halted,
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Step::Halt(_))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Continue => write!(f, "running"),
            Step::Halt(halt) => write!(f, "{halt}"),
        }
    }
}

/// Why a machine stopped. Both are ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Halt {
    /// The machine is in an accepting state.
    Accept,
    /// No transition is defined for the current state and symbols.
    NoTransition { state: String, symbols: Vec<Symbol> },
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Accept => write!(f, "accept"),
            Halt::NoTransition { state, symbols } => write!(
                f,
                "halted: no transition from state {} reading [{}]",
                state,
                format_symbols(symbols)
            ),
        }
    }
}

/// Joins symbols as `a, b, _`.
pub fn format_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Represents the errors that can occur while building or loading a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutomatonError {
    /// Indicates an error during the parsing of a definition.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a malformed model: undeclared states, duplicate rules, arity mismatches.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}
