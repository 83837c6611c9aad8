//! This module provides functions for validating machine definitions before anything runs
//! them. Every engine entry point relies on these checks: a model that references an
//! undeclared state, or a Turing machine whose relation is not a partial function, never
//! reaches the stepper, the evaluators or the transformation pipeline.

use crate::program::{Definition, FiniteAutomaton, PushdownAutomaton, TuringProgram};
use crate::relation::TransitionRelation;
use crate::types::{format_symbols, AutomatonError, Label, Symbol};
use std::collections::BTreeSet;

/// Represents the problems that can be found while analyzing a definition.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// The start state is not among the declared states.
    InvalidStartState(String),
    /// Accept states or transition endpoints that are not declared.
    UndeclaredStates(Vec<String>),
    /// Two Turing machine rules share the same state and read tuple.
    DuplicateTransition(String, Vec<Symbol>),
    /// Structural problems (no tapes, arity mismatches, empty labels, etc.).
    StructuralError(String),
}

impl From<AnalysisError> for AutomatonError {
    /// Converts an `AnalysisError` into an `AutomatonError::ValidationError`.
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::InvalidStartState(state) => {
                AutomatonError::ValidationError(format!("Invalid start state: {}", state))
            }
            AnalysisError::UndeclaredStates(states) => {
                AutomatonError::ValidationError(format!("Undeclared states: {:?}", states))
            }
            AnalysisError::DuplicateTransition(state, symbols) => {
                AutomatonError::ValidationError(format!(
                    "Duplicate transition for state {} reading [{}]",
                    state,
                    format_symbols(&symbols)
                ))
            }
            AnalysisError::StructuralError(msg) => AutomatonError::ValidationError(msg),
        }
    }
}

/// Analyzes any definition, dispatching on its kind.
pub fn analyze(definition: &Definition) -> Result<(), AutomatonError> {
    match definition {
        Definition::Turing(program) => analyze_turing(program),
        Definition::Finite(automaton) => analyze_finite(automaton),
        Definition::Pushdown(automaton) => analyze_pushdown(automaton),
    }
}

/// Validates a Turing machine program.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(AutomatonError::ValidationError)` describing the first failing check.
pub fn analyze_turing(program: &TuringProgram) -> Result<(), AutomatonError> {
    let checks: [fn(&TuringProgram) -> Result<(), AnalysisError>; 4] = [
        check_tm_structure,
        check_tm_start,
        check_tm_states,
        check_tm_determinism,
    ];
    run_checks(program, &checks)?;

    log::debug!(
        "analyzed turing machine '{}': {} states, {} tapes, {} rules",
        program.name,
        program.states.len(),
        program.tape_count(),
        program.transitions.len()
    );
    Ok(())
}

/// Validates a finite automaton.
pub fn analyze_finite(automaton: &FiniteAutomaton) -> Result<(), AutomatonError> {
    let checks: [fn(&FiniteAutomaton) -> Result<(), AnalysisError>; 4] = [
        check_fa_start,
        check_fa_states,
        check_fa_labels,
        check_fa_alphabet,
    ];
    run_checks(automaton, &checks)?;

    log::debug!(
        "analyzed finite automaton '{}': {} states, {} edges",
        automaton.name,
        automaton.states.len(),
        automaton.transition_count()
    );
    Ok(())
}

/// Validates a pushdown automaton.
pub fn analyze_pushdown(automaton: &PushdownAutomaton) -> Result<(), AutomatonError> {
    let checks: [fn(&PushdownAutomaton) -> Result<(), AnalysisError>; 2] = [
        check_pda_start,
        check_pda_states,
    ];
    run_checks(automaton, &checks)?;

    log::debug!(
        "analyzed pushdown automaton '{}': {} states, {} rules",
        automaton.name,
        automaton.states.len(),
        automaton.transitions.len()
    );
    Ok(())
}

/// Runs every check and reports the first failure.
fn run_checks<T>(
    model: &T,
    checks: &[fn(&T) -> Result<(), AnalysisError>],
) -> Result<(), AutomatonError> {
    match checks.iter().find_map(|check| check(model).err()) {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Checks that the start state is declared.
fn check_start_state(states: &BTreeSet<String>, start: &str) -> Result<(), AnalysisError> {
    if !states.contains(start) {
        return Err(AnalysisError::InvalidStartState(start.to_string()));
    }

    Ok(())
}

/// Collects every referenced name missing from `states`, sorted and deduplicated.
fn check_declared<'a>(
    states: &BTreeSet<String>,
    referenced: impl Iterator<Item = &'a String>,
) -> Result<(), AnalysisError> {
    let undeclared: BTreeSet<String> = referenced
        .filter(|state| !states.contains(*state))
        .cloned()
        .collect();

    if !undeclared.is_empty() {
        return Err(AnalysisError::UndeclaredStates(
            undeclared.into_iter().collect(),
        ));
    }

    Ok(())
}

/// Checks basic structural requirements of a Turing machine program:
/// - at least one tape is defined
/// - every rule reads one symbol and carries one action per tape
fn check_tm_structure(program: &TuringProgram) -> Result<(), AnalysisError> {
    if program.tapes.is_empty() {
        return Err(AnalysisError::StructuralError(
            "No tapes defined".to_string(),
        ));
    }

    let tapes = program.tape_count();
    for transition in &program.transitions {
        if transition.read.len() != tapes || transition.actions.len() != tapes {
            return Err(AnalysisError::StructuralError(format!(
                "Transition in state '{}' has inconsistent tape counts: read={}, actions={}, tapes={}",
                transition.from,
                transition.read.len(),
                transition.actions.len(),
                tapes
            )));
        }
    }

    Ok(())
}

fn check_tm_start(program: &TuringProgram) -> Result<(), AnalysisError> {
    check_start_state(&program.states, &program.start)
}

fn check_tm_states(program: &TuringProgram) -> Result<(), AnalysisError> {
    check_declared(
        &program.states,
        program
            .accept
            .iter()
            .chain(program.transitions.iter().flat_map(|t| [&t.from, &t.to])),
    )
}

/// Builds the relation once to reject duplicate (state, read tuple) keys.
fn check_tm_determinism(program: &TuringProgram) -> Result<(), AnalysisError> {
    TransitionRelation::build(program.tape_count(), &program.transitions).map(|_| ())
}

fn check_fa_start(automaton: &FiniteAutomaton) -> Result<(), AnalysisError> {
    check_start_state(&automaton.states, &automaton.start)
}

fn check_fa_states(automaton: &FiniteAutomaton) -> Result<(), AnalysisError> {
    let edges = automaton.transitions.iter().flat_map(|(from, edges)| {
        std::iter::once(from).chain(edges.values().flat_map(|targets| targets.iter()))
    });

    check_declared(&automaton.states, automaton.accept.iter().chain(edges))
}

/// Word labels must consume at least one character; the empty word is spelled epsilon.
fn check_fa_labels(automaton: &FiniteAutomaton) -> Result<(), AnalysisError> {
    for (from, edges) in &automaton.transitions {
        if edges
            .keys()
            .any(|label| matches!(label, Label::Word(w) if w.is_empty()))
        {
            return Err(AnalysisError::StructuralError(format!(
                "Empty label on a transition from state '{}'",
                from
            )));
        }
    }

    Ok(())
}

/// Subset construction only moves on alphabet symbols, so every word label must be one.
fn check_fa_alphabet(automaton: &FiniteAutomaton) -> Result<(), AnalysisError> {
    for (from, edges) in &automaton.transitions {
        let missing = edges.keys().find_map(|label| match label {
            Label::Word(word) if !automaton.alphabet.contains(word) => Some(word),
            _ => None,
        });
        if let Some(word) = missing {
            return Err(AnalysisError::StructuralError(format!(
                "Label '{}' on a transition from state '{}' is not in the alphabet",
                word, from
            )));
        }
    }

    Ok(())
}

fn check_pda_start(automaton: &PushdownAutomaton) -> Result<(), AnalysisError> {
    check_start_state(&automaton.states, &automaton.start)
}

fn check_pda_states(automaton: &PushdownAutomaton) -> Result<(), AnalysisError> {
    check_declared(
        &automaton.states,
        automaton
            .accept
            .iter()
            .chain(automaton.transitions.iter().flat_map(|t| [&t.from, &t.to])),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{PdaTransition, Transition};
    use crate::types::{Action, Direction, Letter};

    fn states(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn create_single_tape_transition(from: &str, read: char, to: &str) -> Transition {
        Transition {
            from: from.to_string(),
            read: vec![Symbol::Mark(read)],
            actions: vec![Action::shift(Direction::Right)],
            to: to.to_string(),
        }
    }

    fn create_test_program(transitions: Vec<Transition>) -> TuringProgram {
        TuringProgram {
            name: "Test Program".to_string(),
            states: states(&["start", "stop"]),
            start: "start".to_string(),
            accept: states(&["stop"]),
            tapes: vec![vec![Symbol::Mark('a')]],
            transitions,
        }
    }

    #[test]
    fn test_valid_program() {
        let program = create_test_program(vec![create_single_tape_transition("start", 'a', "stop")]);
        assert!(analyze_turing(&program).is_ok());
    }

    #[test]
    fn test_invalid_start_state() {
        let mut program = create_test_program(vec![]);
        program.start = "nowhere".to_string();

        let error = analyze_turing(&program).unwrap_err();
        assert_eq!(
            error,
            AutomatonError::ValidationError("Invalid start state: nowhere".to_string())
        );
    }

    #[test]
    fn test_undeclared_next_state() {
        let program = create_test_program(vec![
            create_single_tape_transition("start", 'a', "q9"),
            create_single_tape_transition("start", 'b', "q3"),
        ]);

        let error = analyze_turing(&program).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Program validation error: Undeclared states: [\"q3\", \"q9\"]"
        );
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let program = create_test_program(vec![
            create_single_tape_transition("start", 'a', "stop"),
            create_single_tape_transition("start", 'a', "start"),
        ]);

        let error = analyze_turing(&program).unwrap_err();
        assert!(error
            .to_string()
            .contains("Duplicate transition for state start reading [a]"));
    }

    #[test]
    fn test_inconsistent_tape_counts() {
        let mut transition = create_single_tape_transition("start", 'a', "stop");
        transition.read.push(Symbol::Blank);
        let program = create_test_program(vec![transition]);

        let error = analyze_turing(&program).unwrap_err();
        assert!(error.to_string().contains("inconsistent tape counts"));
    }

    #[test]
    fn test_no_tapes() {
        let mut program = create_test_program(vec![]);
        program.tapes.clear();

        assert_eq!(
            analyze_turing(&program).unwrap_err(),
            AutomatonError::ValidationError("No tapes defined".to_string())
        );
    }

    #[test]
    fn test_finite_automaton_undeclared_target() {
        let mut automaton = FiniteAutomaton::new("fa", "q0");
        automaton.add_transition("q0", Label::word("a"), "q1");

        let error = analyze_finite(&automaton).unwrap_err();
        assert!(error.to_string().contains("q1"));

        automaton.add_state("q1");
        assert!(analyze_finite(&automaton).is_ok());
    }

    #[test]
    fn test_finite_automaton_undeclared_accept() {
        let mut automaton = FiniteAutomaton::new("fa", "q0");
        automaton.accept.insert("qf".to_string());

        assert!(analyze_finite(&automaton).is_err());
    }

    #[test]
    fn test_finite_automaton_empty_label() {
        let mut automaton = FiniteAutomaton::new("fa", "q0");
        automaton.add_transition("q0", Label::word(""), "q0");

        let error = analyze_finite(&automaton).unwrap_err();
        assert!(error.to_string().contains("Empty label"));
    }

    #[test]
    fn test_finite_automaton_label_outside_alphabet() {
        let mut automaton = FiniteAutomaton::new("fa", "q0");
        automaton.add_accept("q1");
        automaton.add_transition("q0", Label::word("x"), "q1");
        automaton.alphabet.clear();

        let error = analyze_finite(&automaton).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Program validation error: Label 'x' on a transition from state 'q0' is not in the alphabet"
        );
        assert!(crate::transform::Pipeline::run(&automaton).is_err());

        automaton.alphabet.insert("x".to_string());
        assert!(analyze_finite(&automaton).is_ok());
    }

    #[test]
    fn test_pushdown_undeclared_source() {
        let automaton = PushdownAutomaton {
            name: "pda".to_string(),
            states: states(&["p"]),
            start: "p".to_string(),
            accept: BTreeSet::new(),
            initial_stack: 'Z',
            transitions: vec![PdaTransition {
                from: "ghost".to_string(),
                input: Letter::Char('a'),
                top: Letter::Epsilon,
                to: "p".to_string(),
                push: String::new(),
            }],
        };

        let error = analyze(&Definition::Pushdown(automaton)).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Program validation error: Undeclared states: [\"ghost\"]"
        );
    }
}
