//! This module defines the `TuringMachine` struct, which simulates a multi-tape Turing
//! machine one configuration at a time. Pacing is up to the caller: `step` advances exactly
//! one configuration and `run` simply loops over it with a step bound.

use crate::analyzer::analyze_turing;
use crate::program::{Transition, TuringProgram};
use crate::relation::TransitionRelation;
use crate::tape::{Tape, TapeWindow};
use crate::types::{AutomatonError, Halt, Status, Step, Symbol, MAX_EXECUTION_STEPS};
use serde::{Deserialize, Serialize};

/// Represents a multi-tape Turing Machine.
///
/// Each instance owns its tapes and configuration; independent simulations use independent
/// instances.
#[derive(Debug, Clone)]
pub struct TuringMachine {
    program: TuringProgram,
    relation: TransitionRelation,
    state: String,
    tapes: Vec<Tape>,
    step_count: usize,
    halted: Option<Halt>,
    last_transition: Option<Transition>,
}

/// Everything a renderer needs to draw the machine at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: String,
    pub step_count: usize,
    pub status: Status,
    pub halt: Option<Halt>,
    pub tapes: Vec<TapeWindow>,
    pub last_transition: Option<Transition>,
}

impl TuringMachine {
    /// Creates a new `TuringMachine` from a `TuringProgram`.
    ///
    /// The program is analyzed and its relation built before anything else happens, so an
    /// invalid program never produces a machine.
    ///
    /// # Returns
    ///
    /// * `Ok(TuringMachine)` reset to the program's initial tapes.
    /// * `Err(AutomatonError::ValidationError)` if the program is malformed.
    pub fn new(program: TuringProgram) -> Result<Self, AutomatonError> {
        analyze_turing(&program)?;
        let relation = TransitionRelation::build(program.tape_count(), &program.transitions)?;

        let mut machine = Self {
            state: program.start.clone(),
            tapes: vec![Tape::new(); program.tape_count()],
            relation,
            program,
            step_count: 0,
            halted: None,
            last_transition: None,
        };
        machine.reset();

        Ok(machine)
    }

    /// Resets the machine to the program's own initial tapes.
    pub fn reset(&mut self) {
        let initial = self.program.tapes.clone();
        self.load(&initial);
    }

    /// Resets the machine with new initial content, one symbol sequence per tape.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the machine was reset.
    /// * `Err(AutomatonError::ValidationError)` if the number of sequences does not match the
    ///   number of tapes; the machine is left untouched.
    pub fn reset_with(&mut self, initial: &[Vec<Symbol>]) -> Result<(), AutomatonError> {
        if initial.len() != self.tapes.len() {
            return Err(AutomatonError::ValidationError(format!(
                "Expected content for {} tapes, got {}",
                self.tapes.len(),
                initial.len()
            )));
        }

        self.load(initial);
        Ok(())
    }

    fn load(&mut self, initial: &[Vec<Symbol>]) {
        for (tape, symbols) in self.tapes.iter_mut().zip(initial) {
            tape.reset(symbols);
        }
        self.state = self.program.start.clone();
        self.step_count = 0;
        self.halted = None;
        self.last_transition = None;
    }

    /// Executes a single step.
    ///
    /// Acceptance is checked before the relation is consulted, and again after the state
    /// changes. Once halted, every further call returns the same halt without touching the
    /// configuration.
    pub fn step(&mut self) -> Step {
        if let Some(halt) = &self.halted {
            return Step::Halt(halt.clone());
        }

        if self.is_accepting() {
            return self.halt(Halt::Accept);
        }

        let symbols = self.symbols();
        let transition = match self.relation.lookup(&self.state, &symbols) {
            Some(t) => t.clone(),
            None => {
                self.last_transition = None;
                let state = self.state.clone();
                return self.halt(Halt::NoTransition { state, symbols });
            }
        };

        for (tape, action) in self.tapes.iter_mut().zip(&transition.actions) {
            if let Some(symbol) = action.write {
                tape.write(symbol);
            }
            tape.shift(action.direction);
        }

        log::trace!(
            "step {}: {} -> {}",
            self.step_count + 1,
            transition.from,
            transition.to
        );

        self.state = transition.to.clone();
        self.step_count += 1;
        self.last_transition = Some(transition);

        if self.is_accepting() {
            return self.halt(Halt::Accept);
        }

        Step::Continue
    }

    fn halt(&mut self, halt: Halt) -> Step {
        log::debug!("machine halted after {} steps: {}", self.step_count, halt);
        self.halted = Some(halt.clone());
        Step::Halt(halt)
    }

    /// Runs the machine until it halts or `MAX_EXECUTION_STEPS` steps have been taken.
    ///
    /// Returns `Step::Continue` if the bound was reached first.
    pub fn run(&mut self) -> Step {
        for _ in 0..MAX_EXECUTION_STEPS {
            match self.step() {
                Step::Continue => continue,
                halt => return halt,
            }
        }

        log::warn!(
            "machine '{}' still running after {} steps",
            self.program.name,
            MAX_EXECUTION_STEPS
        );
        Step::Continue
    }

    /// Returns the symbol under the head of `tape_index`, or blank for an unknown tape.
    pub fn read(&self, tape_index: usize) -> Symbol {
        self.tapes.get(tape_index).map_or(Symbol::Blank, Tape::read)
    }

    /// Writes under the head of `tape_index`. Writing blank clears the cell.
    pub fn write(&mut self, tape_index: usize, symbol: Symbol) -> Result<(), AutomatonError> {
        let count = self.tapes.len();
        let tape = self.tapes.get_mut(tape_index).ok_or_else(|| {
            AutomatonError::ValidationError(format!(
                "Tape index {} is out of bounds (machine has {} tapes)",
                tape_index, count
            ))
        })?;

        tape.write(symbol);
        Ok(())
    }

    /// Returns the current state of the Turing Machine.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn program(&self) -> &TuringProgram {
        &self.program
    }

    /// Returns the total number of steps executed since the last reset.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn is_accepting(&self) -> bool {
        self.program.accept.contains(&self.state)
    }

    pub fn halt_reason(&self) -> Option<&Halt> {
        self.halted.as_ref()
    }

    /// The rule applied by the most recent successful step.
    pub fn last_transition(&self) -> Option<&Transition> {
        self.last_transition.as_ref()
    }

    pub fn tapes(&self) -> &[Tape] {
        &self.tapes
    }

    /// Returns the head position of every tape.
    pub fn heads(&self) -> Vec<i64> {
        self.tapes.iter().map(Tape::head).collect()
    }

    /// Returns the symbol currently under each head.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tapes.iter().map(Tape::read).collect()
    }

    pub fn status(&self) -> Status {
        match &self.halted {
            None => Status::Running,
            Some(halt) => Step::Halt(halt.clone()).status(),
        }
    }

    /// Captures the configuration with `radius` cells shown on each side of every head.
    pub fn snapshot(&self, radius: usize) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            step_count: self.step_count,
            status: self.status(),
            halt: self.halted.clone(),
            tapes: self.tapes.iter().map(|t| t.window(radius)).collect(),
            last_transition: self.last_transition.clone(),
        }
    }
}

#[cfg(test)]
mod multi_tape_tests {
    use super::*;
    use crate::types::{Action, Direction};
    use std::collections::BTreeSet;

    fn marks(text: &str) -> Vec<Symbol> {
        text.chars().map(Symbol::from).collect()
    }

    fn names(states: &[&str]) -> BTreeSet<String> {
        states.iter().map(|s| s.to_string()).collect()
    }

    fn create_simple_multi_tape_program() -> TuringProgram {
        // Replace [a, x] with [b, y], move right on both tapes, then stop in `done`.
        TuringProgram {
            name: "Simple Multi-Tape Test".to_string(),
            states: names(&["start", "done"]),
            start: "start".to_string(),
            accept: BTreeSet::new(),
            tapes: vec![marks("a"), marks("x")],
            transitions: vec![Transition {
                from: "start".to_string(),
                read: marks("ax"),
                actions: vec![
                    Action::new(Some(Symbol::Mark('b')), Direction::Right),
                    Action::new(Some(Symbol::Mark('y')), Direction::Right),
                ],
                to: "done".to_string(),
            }],
        }
    }

    /// Copies a unary number from tape 0 to tape 1.
    fn create_unary_copy_program(count: usize) -> TuringProgram {
        TuringProgram {
            name: "Unary Copy".to_string(),
            states: names(&["e0", "ef"]),
            start: "e0".to_string(),
            accept: names(&["ef"]),
            tapes: vec![vec![Symbol::Mark('1'); count], vec![]],
            transitions: vec![
                Transition {
                    from: "e0".to_string(),
                    read: vec![Symbol::Mark('1'), Symbol::Blank],
                    actions: vec![
                        Action::shift(Direction::Right),
                        Action::new(Some(Symbol::Mark('1')), Direction::Right),
                    ],
                    to: "e0".to_string(),
                },
                Transition {
                    from: "e0".to_string(),
                    read: vec![Symbol::Blank, Symbol::Blank],
                    actions: vec![Action::shift(Direction::Stay), Action::shift(Direction::Stay)],
                    to: "ef".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_multi_tape_machine_creation() {
        let machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();

        assert_eq!(machine.state(), "start");
        assert_eq!(machine.heads(), vec![0, 0]);
        assert_eq!(machine.symbols(), marks("ax"));
        assert_eq!(machine.step_count(), 0);
        assert_eq!(machine.status(), Status::Running);
    }

    #[test]
    fn test_multi_tape_single_step() {
        let mut machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();

        assert_eq!(machine.step(), Step::Continue);
        assert_eq!(machine.state(), "done");
        assert_eq!(machine.heads(), vec![1, 1]);
        assert_eq!(machine.tapes()[0].contents(), marks("b"));
        assert_eq!(machine.tapes()[1].contents(), marks("y"));
        assert_eq!(machine.step_count(), 1);
        assert_eq!(
            machine.last_transition().map(|t| t.to.as_str()),
            Some("done")
        );
    }

    #[test]
    fn test_no_applicable_transition() {
        let mut machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();
        machine.step();

        let result = machine.step();
        assert_eq!(
            result,
            Step::Halt(Halt::NoTransition {
                state: "done".to_string(),
                symbols: vec![Symbol::Blank, Symbol::Blank],
            })
        );
        assert_eq!(result.status(), Status::Halted);
        assert!(machine.last_transition().is_none());
        assert!(machine.is_halted());
    }

    #[test]
    fn test_step_on_halted_machine_is_idempotent() {
        let mut machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();
        machine.step();
        let first = machine.step();

        let heads = machine.heads();
        let contents: Vec<_> = machine.tapes().iter().map(Tape::contents).collect();

        for _ in 0..3 {
            assert_eq!(machine.step(), first);
            assert_eq!(machine.heads(), heads);
            assert_eq!(machine.step_count(), 1);
            let now: Vec<_> = machine.tapes().iter().map(Tape::contents).collect();
            assert_eq!(now, contents);
        }
    }

    #[test]
    fn test_accept_state_checked_before_lookup() {
        let mut program = create_simple_multi_tape_program();
        program.accept = names(&["start"]);
        let mut machine = TuringMachine::new(program).unwrap();

        assert_eq!(machine.step(), Step::Halt(Halt::Accept));
        assert_eq!(machine.step_count(), 0);
        assert_eq!(machine.symbols(), marks("ax"));
    }

    #[test]
    fn test_multi_tape_reset() {
        let mut machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();
        machine.step();
        machine.step();
        assert!(machine.is_halted());

        machine.reset();
        assert_eq!(machine.state(), "start");
        assert_eq!(machine.heads(), vec![0, 0]);
        assert_eq!(machine.step_count(), 0);
        assert!(!machine.is_halted());
        assert!(machine.halt_reason().is_none());
        assert!(machine.last_transition().is_none());
        assert_eq!(machine.tapes()[0].contents(), marks("a"));
    }

    #[test]
    fn test_reset_with_new_input() {
        let mut machine = TuringMachine::new(create_unary_copy_program(0)).unwrap();
        machine
            .reset_with(&[vec![Symbol::Mark('1'), Symbol::Blank, Symbol::Mark('1')], vec![]])
            .unwrap();

        // The blank in the middle is not stored.
        assert_eq!(machine.tapes()[0].len(), 2);
        assert_eq!(machine.run(), Step::Halt(Halt::Accept));
        assert_eq!(machine.tapes()[1].contents(), marks("1"));
    }

    #[test]
    fn test_reset_with_wrong_tape_count() {
        let mut machine = TuringMachine::new(create_unary_copy_program(2)).unwrap();
        machine.step();

        let error = machine.reset_with(&[marks("1")]).unwrap_err();
        assert!(matches!(error, AutomatonError::ValidationError(_)));
        assert_eq!(machine.step_count(), 1);
    }

    #[test]
    fn test_unary_copy_to_second_tape() {
        let mut machine = TuringMachine::new(create_unary_copy_program(5)).unwrap();

        let result = machine.run();
        assert_eq!(result, Step::Halt(Halt::Accept));
        assert_eq!(machine.state(), "ef");
        assert_eq!(machine.tapes()[1].contents(), marks("11111"));
        assert_eq!(machine.tapes()[0].contents(), marks("11111"));
        assert_eq!(machine.step_count(), 6);
    }

    #[test]
    fn test_identical_machines_produce_identical_traces() {
        let trace = |machine: &mut TuringMachine| {
            let mut steps = Vec::new();
            loop {
                let step = machine.step();
                steps.push((step.clone(), machine.snapshot(4)));
                if step.is_halt() {
                    break steps;
                }
            }
        };

        let mut first = TuringMachine::new(create_unary_copy_program(4)).unwrap();
        let mut second = TuringMachine::new(create_unary_copy_program(4)).unwrap();
        let a = trace(&mut first);
        let b = trace(&mut second);
        assert_eq!(a, b);

        first.reset();
        assert_eq!(trace(&mut first), a);
    }

    #[test]
    fn test_multi_tape_stay_direction() {
        let mut program = create_simple_multi_tape_program();
        program.transitions[0].actions[0].direction = Direction::Stay;

        let mut machine = TuringMachine::new(program).unwrap();
        machine.step();

        assert_eq!(machine.heads(), vec![0, 1]);
        assert_eq!(machine.read(0), Symbol::Mark('b'));
        assert_eq!(machine.read(1), Symbol::Blank);
    }

    #[test]
    fn test_read_and_write_under_head() {
        let mut machine = TuringMachine::new(create_simple_multi_tape_program()).unwrap();

        machine.write(1, Symbol::Blank).unwrap();
        assert_eq!(machine.read(1), Symbol::Blank);
        assert!(machine.tapes()[1].is_empty());

        machine.write(0, Symbol::Mark('z')).unwrap();
        assert_eq!(machine.read(0), Symbol::Mark('z'));

        assert!(machine.write(7, Symbol::Mark('z')).is_err());
        assert_eq!(machine.read(7), Symbol::Blank);
    }

    #[test]
    fn test_duplicate_rules_are_rejected_before_running() {
        let mut program = create_unary_copy_program(1);
        let mut duplicate = program.transitions[0].clone();
        duplicate.to = "ef".to_string();
        program.transitions.push(duplicate);

        let error = TuringMachine::new(program).unwrap_err();
        assert!(error.to_string().contains("Duplicate transition for state e0"));
    }

    #[test]
    fn test_snapshot_window() {
        let machine = TuringMachine::new(create_unary_copy_program(3)).unwrap();
        let snapshot = machine.snapshot(1);

        assert_eq!(snapshot.state, "e0");
        assert_eq!(snapshot.tapes[0].origin, -1);
        assert_eq!(
            snapshot.tapes[0].cells,
            vec![Symbol::Blank, Symbol::Mark('1'), Symbol::Mark('1')]
        );
        assert_eq!(snapshot.status, Status::Running);
    }
}
