//! This module renders definitions back into the text format accepted by the parser.
//!
//! Any validated `Definition` can be encoded, including automata produced by the
//! transformation pipeline whose state names (`{q0,q1}`, `A+C`) need quoting.

use crate::program::{Definition, FiniteAutomaton, PushdownAutomaton, Transition, TuringProgram};
use crate::types::{
    Direction, Label, Letter, Symbol, EPSILON, EPSILON_ALIAS, INPUT_BLANK_SYMBOL,
    INPUT_KEEP_SYMBOL,
};
use std::collections::BTreeSet;

/// Encodes a definition into its textual form.
///
/// Sections are always written in the same order (`name`, `kind`, `states`, `start`,
/// `accept`, then the kind specific ones and `rules`), so encoding is deterministic.
/// Parsing the result yields the same definition.
pub fn encode(definition: &Definition) -> String {
    let mut out = String::new();

    out.push_str(&format!("name: {}\n", definition.name()));
    out.push_str(&format!("kind: {}\n", definition.kind()));

    match definition {
        Definition::Turing(program) => encode_turing(&mut out, program),
        Definition::Finite(automaton) => encode_finite(&mut out, automaton),
        Definition::Pushdown(automaton) => encode_pushdown(&mut out, automaton),
    }

    out
}

fn encode_header(out: &mut String, states: &BTreeSet<String>, start: &str, accept: &BTreeSet<String>) {
    out.push_str(&format!("states: {}\n", state_list(states)));
    out.push_str(&format!("start: {}\n", state(start)));
    out.push_str(&format!("accept: {}\n", state_list(accept)));
}

fn encode_turing(out: &mut String, program: &TuringProgram) {
    encode_header(out, &program.states, &program.start, &program.accept);

    if program.is_single_tape() {
        let tape = program.tapes[0].iter().map(symbol).collect::<Vec<_>>();
        out.push_str(&format!("tape: {}\n", tape.join(", ")));
    } else {
        out.push_str("tapes:\n");
        for tape in &program.tapes {
            out.push_str(&format!("  {}\n", symbol_list(tape)));
        }
    }

    out.push_str("rules:\n");
    for (from, transitions) in group_by_source(&program.transitions) {
        out.push_str(&format!("  {}:\n", state(from)));
        for transition in transitions {
            out.push_str(&format!("    {}\n", tm_action(transition, program.is_single_tape())));
        }
    }
}

/// Groups transitions by source state, keeping the order in which sources first appear.
fn group_by_source(transitions: &[Transition]) -> Vec<(&str, Vec<&Transition>)> {
    let mut groups: Vec<(&str, Vec<&Transition>)> = Vec::new();
    for transition in transitions {
        match groups.iter_mut().find(|(from, _)| *from == transition.from) {
            Some((_, group)) => group.push(transition),
            None => groups.push((transition.from.as_str(), vec![transition])),
        }
    }

    groups
}

fn tm_action(transition: &Transition, single_tape: bool) -> String {
    let to = state(&transition.to);

    match (single_tape, transition.read.first(), transition.actions.first()) {
        (true, Some(read), Some(action)) => match &action.write {
            Some(write) => format!(
                "{} -> {}, {}, {}",
                symbol(read),
                symbol(write),
                direction(action.direction),
                to
            ),
            None => format!("{}, {}, {}", symbol(read), direction(action.direction), to),
        },
        _ => {
            let writes = transition
                .actions
                .iter()
                .map(|action| match &action.write {
                    Some(write) => symbol(write),
                    None => INPUT_KEEP_SYMBOL.to_string(),
                })
                .collect::<Vec<_>>();
            let directions = transition
                .actions
                .iter()
                .map(|action| direction(action.direction).to_string())
                .collect::<Vec<_>>();

            format!(
                "{} -> [{}], [{}], {}",
                symbol_list(&transition.read),
                writes.join(", "),
                directions.join(", "),
                to
            )
        }
    }
}

fn encode_finite(out: &mut String, automaton: &FiniteAutomaton) {
    encode_header(out, &automaton.states, &automaton.start, &automaton.accept);

    out.push_str("rules:\n");
    for (from, edges) in &automaton.transitions {
        if edges.values().all(BTreeSet::is_empty) {
            continue;
        }

        out.push_str(&format!("  {}:\n", state(from)));
        for (label, targets) in edges {
            for target in targets {
                out.push_str(&format!("    {} -> {}\n", self::label(label), state(target)));
            }
        }
    }
}

fn encode_pushdown(out: &mut String, automaton: &PushdownAutomaton) {
    encode_header(out, &automaton.states, &automaton.start, &automaton.accept);
    out.push_str(&format!("stack: {}\n", letter(Letter::Char(automaton.initial_stack))));

    out.push_str("rules:\n");
    let mut sources: Vec<&str> = Vec::new();
    for transition in &automaton.transitions {
        if !sources.contains(&transition.from.as_str()) {
            sources.push(&transition.from);
        }
    }

    for from in sources {
        out.push_str(&format!("  {}:\n", state(from)));
        for transition in automaton.transitions_from(from) {
            let push = if transition.push.is_empty() {
                EPSILON.to_string()
            } else {
                token(&transition.push)
            };
            out.push_str(&format!(
                "    {}, {} -> {}, {}\n",
                letter(transition.input),
                letter(transition.top),
                push,
                state(&transition.to)
            ));
        }
    }
}

fn direction(direction: Direction) -> &'static str {
    match direction {
        Direction::Left => "L",
        Direction::Right => "R",
        Direction::Stay => "S",
    }
}

fn symbol(symbol: &Symbol) -> String {
    match symbol {
        Symbol::Blank => INPUT_BLANK_SYMBOL.to_string(),
        Symbol::Mark(c) => token(&c.to_string()),
    }
}

fn symbol_list(symbols: &[Symbol]) -> String {
    format!(
        "[{}]",
        symbols.iter().map(symbol).collect::<Vec<_>>().join(", ")
    )
}

fn label(label: &Label) -> String {
    match label {
        Label::Epsilon => EPSILON.to_string(),
        Label::Word(word) => token(word),
    }
}

fn letter(letter: Letter) -> String {
    match letter {
        Letter::Epsilon => EPSILON.to_string(),
        Letter::Char(c) => token(&c.to_string()),
    }
}

/// Quotes a token whenever its bare form would be read as something else.
fn token(text: &str) -> String {
    let special = text.is_empty()
        || text == EPSILON
        || text == EPSILON_ALIAS
        || text == INPUT_BLANK_SYMBOL.to_string()
        || text == INPUT_KEEP_SYMBOL.to_string()
        || text.contains("->")
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '[' | ']' | '#' | ':' | '\''));

    if special {
        format!("'{text}'")
    } else {
        text.to_string()
    }
}

/// Quotes state names that are not plain identifiers or that would read as a section header.
fn state(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+'))
        && !matches!(name, "tapes" | "rules");

    if bare {
        name.to_string()
    } else {
        format!("'{name}'")
    }
}

fn state_list(states: &BTreeSet<String>) -> String {
    format!(
        "[{}]",
        states
            .iter()
            .map(|s| state(s))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::programs::PROGRAMS;
    use crate::transform::Pipeline;

    #[test]
    fn test_encode_single_tape_program() {
        let definition = parse(
            r#"
name: Flip
states: [start, halt]
tape: a, _
rules:
  start:
    a -> b, R, start
    _, S, halt
"#,
        )
        .unwrap();

        let expected = "\
name: Flip
kind: turing
states: [halt, start]
start: start
accept: []
tape: a, _
rules:
  start:
    a -> b, R, start
    _, S, halt
";
        assert_eq!(encode(&definition), expected);
    }

    #[test]
    fn test_encode_finite_and_pushdown_text() {
        let mut fa = FiniteAutomaton::new("Tail", "s");
        fa.add_state("{m}");
        fa.add_accept("f");
        fa.add_transition("s", Label::word("ab"), "{m}");
        fa.add_transition("{m}", Label::Epsilon, "f");

        let expected = "\
name: Tail
kind: finite
states: [f, s, '{m}']
start: s
accept: [f]
rules:
  s:
    ab -> '{m}'
  '{m}':
    ε -> f
";
        assert_eq!(encode(&Definition::Finite(fa)), expected);

        let parens = PROGRAMS
            .iter()
            .find(|definition| definition.name() == "Balanced Parentheses")
            .unwrap();
        let expected = "\
name: Balanced Parentheses
kind: pushdown
states: [f, p]
start: p
accept: [f]
stack: Z
rules:
  p:
    (, Z -> (Z, p
    (, ( -> ((, p
    ), ( -> ε, p
    ε, Z -> Z, f
";
        assert_eq!(encode(parens), expected);
    }

    #[test]
    fn test_encode_quotes_special_tokens() {
        assert_eq!(symbol(&Symbol::Mark('_')), "'_'");
        assert_eq!(symbol(&Symbol::Blank), "_");
        assert_eq!(symbol(&Symbol::Mark(',')), "','");
        assert_eq!(label(&Label::word("eps")), "'eps'");
        assert_eq!(label(&Label::Epsilon), "ε");
        assert_eq!(state("{q0,q1}"), "'{q0,q1}'");
        assert_eq!(state("A+C"), "A+C");
        assert_eq!(state("rules"), "'rules'");
    }

    #[test]
    fn test_catalog_round_trips() {
        for definition in PROGRAMS.iter() {
            let encoded = encode(definition);
            let decoded = parse(&encoded)
                .unwrap_or_else(|e| panic!("{} failed to parse: {e}\n{encoded}", definition.name()));
            assert_eq!(&decoded, definition, "{}", definition.name());
        }
    }

    #[test]
    fn test_derived_automata_round_trip() {
        let source = PROGRAMS
            .iter()
            .find_map(|definition| match definition {
                Definition::Finite(fa) if !fa.is_unit() => Some(fa.clone()),
                _ => None,
            })
            .expect("catalog has an automaton with a multi-character label");

        let pipeline = Pipeline::run(&source).unwrap();
        for stage in [pipeline.unit, pipeline.dfa, pipeline.minimal] {
            let encoded = encode(&Definition::Finite(stage));
            let Definition::Finite(decoded) = parse(&encoded).unwrap() else {
                panic!("expected a finite automaton");
            };

            assert_eq!(encode(&Definition::Finite(decoded)), encoded);
        }
    }
}
