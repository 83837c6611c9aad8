//! This crate provides the core logic for an automata workbench.
//! It parses definitions of Turing machines, finite automata and pushdown automata, runs
//! them, and transforms finite automata into minimal deterministic ones.

pub mod analyzer;
pub mod encoder;
pub mod evaluator;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod pda;
pub mod program;
pub mod programs;
pub mod relation;
pub mod tape;
pub mod transform;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisError};
pub use encoder::encode;
pub use evaluator::Evaluation;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
pub use machine::{Snapshot, TuringMachine};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
pub use pda::{Configuration, PdaOutcome, Verdict};
pub use program::{Definition, FiniteAutomaton, Kind, PushdownAutomaton, TuringProgram};
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
pub use tape::Tape;
pub use transform::{Pipeline, Stage, StateSet};
/// Re-exports the value types shared by every machine kind.
pub use types::{
    Action, AutomatonError, Direction, Halt, Label, Letter, Status, Step, Symbol,
    MAX_PROGRAM_SIZE,
};
