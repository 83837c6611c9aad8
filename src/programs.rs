use crate::program::{Definition, Kind};
use crate::types::AutomatonError;
use serde::Serialize;

// Built-in definitions, embedded at compile time
const PROGRAM_TEXTS: [&str; 5] = [
    include_str!("../programs/unary-copy.aut"),
    include_str!("../programs/binary-increment.aut"),
    include_str!("../programs/balanced-parentheses.aut"),
    include_str!("../programs/epsilon-chain.aut"),
    include_str!("../programs/even-zeros.aut"),
];

lazy_static::lazy_static! {
    /// The parsed built-in catalog. Entries that fail to parse are logged and left out.
    pub static ref PROGRAMS: Vec<Definition> = PROGRAM_TEXTS
        .iter()
        .filter_map(|text| match crate::parser::parse(text) {
            Ok(definition) => Some(definition),
            Err(e) => {
                log::warn!("Failed to parse built-in program: {}", e);
                None
            }
        })
        .collect();
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its index
    pub fn by_index(index: usize) -> Result<Definition, AutomatonError> {
        PROGRAMS.get(index).cloned().ok_or_else(|| {
            AutomatonError::ValidationError(format!("Program index {} out of range", index))
        })
    }

    /// Get a program by its name, ignoring case
    pub fn by_name(name: &str) -> Result<Definition, AutomatonError> {
        PROGRAMS
            .iter()
            .find(|definition| definition.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| AutomatonError::ValidationError(format!("Program '{}' not found", name)))
    }

    pub fn list_names() -> Vec<String> {
        PROGRAMS
            .iter()
            .map(|definition| definition.name().to_string())
            .collect()
    }

    /// Get information about a program by its index
    pub fn info(index: usize) -> Result<ProgramInfo, AutomatonError> {
        let definition = Self::by_index(index)?;

        Ok(ProgramInfo {
            index,
            name: definition.name().to_string(),
            kind: definition.kind(),
            state_count: definition.states().len(),
            transition_count: definition.transition_count(),
        })
    }

    /// Search for programs by name
    pub fn search(query: &str) -> Vec<usize> {
        let query = query.to_lowercase();

        PROGRAMS
            .iter()
            .enumerate()
            .filter(|(_, definition)| definition.name().to_lowercase().contains(&query))
            .map(|(index, _)| index)
            .collect()
    }

    /// Get the original text of a program by its index
    pub fn text(index: usize) -> Result<&'static str, AutomatonError> {
        PROGRAM_TEXTS.get(index).copied().ok_or_else(|| {
            AutomatonError::ValidationError(format!("Program text index {} out of range", index))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub kind: Kind,
    pub state_count: usize,
    pub transition_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TuringMachine;
    use crate::types::{Status, Symbol};
    use crate::{evaluator, pda};

    #[test]
    fn test_all_programs_parse() {
        assert_eq!(ProgramManager::count(), PROGRAM_TEXTS.len());
    }

    #[test]
    fn test_program_manager_list_names() {
        let names = ProgramManager::list_names();
        assert_eq!(
            names,
            vec![
                "Unary Copy",
                "Binary Increment",
                "Balanced Parentheses",
                "Epsilon Chain",
                "Even Zeros",
            ]
        );
    }

    #[test]
    fn test_program_manager_by_index() {
        assert!(ProgramManager::by_index(0).is_ok());
        assert!(ProgramManager::by_index(999).is_err());
        assert!(ProgramManager::text(0).unwrap().contains("Unary Copy"));
        assert!(ProgramManager::text(999).is_err());
    }

    #[test]
    fn test_program_manager_by_name() {
        let definition = ProgramManager::by_name("even zeros").unwrap();
        assert_eq!(definition.kind(), Kind::Finite);

        let result = ProgramManager::by_name("Nonexistent");
        assert_eq!(
            result.unwrap_err(),
            AutomatonError::ValidationError("Program 'Nonexistent' not found".to_string())
        );
    }

    #[test]
    fn test_program_manager_info() {
        let info = ProgramManager::info(2).unwrap();
        assert_eq!(
            info,
            ProgramInfo {
                index: 2,
                name: "Balanced Parentheses".to_string(),
                kind: Kind::Pushdown,
                state_count: 2,
                transition_count: 4,
            }
        );

        assert!(ProgramManager::info(999).is_err());
    }

    #[test]
    fn test_program_manager_search() {
        assert_eq!(ProgramManager::search("binary"), vec![1]);
        assert_eq!(ProgramManager::search("E"), vec![1, 2, 3, 4]);
        assert!(ProgramManager::search("nonexistent").is_empty());
    }

    #[test]
    fn test_turing_programs_accept() {
        let Definition::Turing(program) = ProgramManager::by_name("Binary Increment").unwrap()
        else {
            panic!("expected a turing machine");
        };

        let mut machine = TuringMachine::new(program).unwrap();
        machine.run();

        assert_eq!(machine.status(), Status::Accept);
        let tape: String = machine.tapes()[0]
            .contents()
            .iter()
            .map(Symbol::to_string)
            .collect();
        assert_eq!(tape, "1100");
    }

    #[test]
    fn test_automata_programs_accept() {
        let Definition::Finite(even) = ProgramManager::by_name("Even Zeros").unwrap() else {
            panic!("expected a finite automaton");
        };
        assert!(evaluator::evaluate(&even, "1001").accepted);
        assert!(!evaluator::evaluate(&even, "10").accepted);

        let Definition::Pushdown(parens) = ProgramManager::by_name("Balanced Parentheses").unwrap()
        else {
            panic!("expected a pushdown automaton");
        };
        assert!(pda::evaluate(&parens, "(()())").accepted());
        assert!(!pda::evaluate(&parens, "())").accepted());
    }
}
