//! This module provides the parser for machine definitions, utilizing the `pest` crate.
//! It turns the text format described in `grammar.pest` into a validated `Definition`.

use crate::{
    analyzer::analyze,
    program::{
        Definition, FiniteAutomaton, Kind, PdaTransition, PushdownAutomaton, Transition,
        TuringProgram,
    },
    types::{
        Action, AutomatonError, Direction, Label, Letter, Symbol, EPSILON, EPSILON_ALIAS,
        INPUT_BLANK_SYMBOL, INPUT_KEEP_SYMBOL, MAX_PROGRAM_SIZE,
    },
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Derives a `PestParser` for the definition grammar in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DefinitionParser;

/// Parses the given input string into a `Definition`.
///
/// The kind is taken from the `kind:` section, or inferred: a `tape`/`tapes` section means a
/// Turing machine, a `stack` section a pushdown automaton, anything else a finite automaton.
/// The parsed definition is analyzed before being returned.
///
/// # Returns
///
/// * `Ok(Definition)` if the input is successfully parsed and validated.
/// * `Err(AutomatonError::ParseError)` if there are any syntax errors.
/// * `Err(AutomatonError::ValidationError)` if the definition fails validation.
pub fn parse(input: &str) -> Result<Definition, AutomatonError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(AutomatonError::ValidationError(format!(
            "Definition is {} bytes, the limit is {}",
            input.len(),
            MAX_PROGRAM_SIZE
        )));
    }

    let root = DefinitionParser::parse(Rule::program, input.trim())
        .map_err(|e| AutomatonError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| AutomatonError::ValidationError("Empty definition".to_string()))?;

    let definition = parse_program(root)?;

    analyze(&definition)?;
    log::debug!(
        "parsed {} '{}' with {} states",
        definition.kind(),
        definition.name(),
        definition.states().len()
    );

    Ok(definition)
}

/// Header sections common to every kind.
struct Header {
    name: String,
    states: BTreeSet<String>,
    start: String,
    accept: BTreeSet<String>,
}

/// Parses the top-level structure of a definition from a `Pair<Rule::program>`.
fn parse_program(pair: Pair<Rule>) -> Result<Definition, AutomatonError> {
    let mut name: Option<String> = None;
    let mut kind: Option<Kind> = None;
    let mut states: Option<Vec<String>> = None;
    let mut start: Option<String> = None;
    let mut accept: Option<Vec<String>> = None;
    let mut stack: Option<Pair<Rule>> = None;
    let mut tapes: Option<Pair<Rule>> = None;
    let mut rules: Option<Pair<Rule>> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p).trim().to_string()),
            Rule::kind => kind = Some(parse_kind(p)?),
            Rule::states => states = Some(parse_state_list(p)),
            Rule::start => start = p.into_inner().next().map(parse_state),
            Rule::accept => accept = Some(parse_state_list(p)),
            Rule::stack => stack = Some(p),
            Rule::tape | Rule::tapes => {
                check_exclusive_rule(&tapes, &["tape", "tapes"], span)?;
                tapes = Some(p);
            }
            Rule::rules => rules = Some(p),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, &["name"])?;
    let states = check_required_rule(states, &["states"])?;
    let rules = check_required_rule(rules, &["rules"])?;
    let start = check_required_rule(start.or_else(|| states.first().cloned()), &["start"])?;

    let kind = kind.unwrap_or(if tapes.is_some() {
        Kind::Turing
    } else if stack.is_some() {
        Kind::Pushdown
    } else {
        Kind::Finite
    });

    let header = Header {
        name,
        states: states.into_iter().collect(),
        start,
        accept: accept.unwrap_or_default().into_iter().collect(),
    };

    match kind {
        Kind::Turing => {
            reject_section(stack, "stack", kind)?;
            let tapes = check_required_rule(tapes, &["tape", "tapes"])?;
            parse_turing(header, tapes, rules).map(Definition::Turing)
        }
        Kind::Finite => {
            reject_section(stack, "stack", kind)?;
            reject_section(tapes, "tape", kind)?;
            parse_finite(header, rules).map(Definition::Finite)
        }
        Kind::Pushdown => {
            reject_section(tapes, "tape", kind)?;
            let stack = check_required_rule(stack, &["stack"])?;
            parse_pushdown(header, stack, rules).map(Definition::Pushdown)
        }
    }
}

fn parse_turing(
    header: Header,
    tapes: Pair<Rule>,
    rules: Pair<Rule>,
) -> Result<TuringProgram, AutomatonError> {
    let tapes = parse_tapes(tapes)?;
    let mut transitions = Vec::new();

    for (state, actions) in parse_rule_blocks(rules)? {
        for action in actions {
            transitions.push(parse_tm_action(&state, action)?);
        }
    }

    Ok(TuringProgram {
        name: header.name,
        states: header.states,
        start: header.start,
        accept: header.accept,
        tapes,
        transitions,
    })
}

fn parse_finite(header: Header, rules: Pair<Rule>) -> Result<FiniteAutomaton, AutomatonError> {
    let mut automaton = FiniteAutomaton {
        name: header.name,
        states: header.states,
        alphabet: BTreeSet::new(),
        start: header.start,
        accept: header.accept,
        transitions: BTreeMap::new(),
    };

    for (state, actions) in parse_rule_blocks(rules)? {
        for action in actions {
            let span = action.as_span();
            if action.as_rule() != Rule::fa_action {
                return Err(parse_error(
                    "Expected a finite automaton action: label -> state",
                    span,
                ));
            }

            let mut pairs = action.into_inner();
            let label = parse_label(next_pair(&mut pairs, span)?);
            let target = parse_state(next_pair(&mut pairs, span)?);
            automaton.add_transition(state.clone(), label, target);
        }
    }

    Ok(automaton)
}

fn parse_pushdown(
    header: Header,
    stack: Pair<Rule>,
    rules: Pair<Rule>,
) -> Result<PushdownAutomaton, AutomatonError> {
    let span = stack.as_span();
    let initial_stack = match stack.into_inner().next().map(parse_letter).transpose()? {
        Some(Letter::Char(c)) => c,
        _ => return Err(parse_error("Initial stack symbol must be one character", span)),
    };

    let mut transitions = Vec::new();
    for (state, actions) in parse_rule_blocks(rules)? {
        for action in actions {
            let span = action.as_span();
            if action.as_rule() != Rule::pda_action {
                return Err(parse_error(
                    "Expected a pushdown action: input, top -> push, state",
                    span,
                ));
            }

            let mut pairs = action.into_inner();
            let input = parse_letter(next_pair(&mut pairs, span)?)?;
            let top = parse_letter(next_pair(&mut pairs, span)?)?;
            let push = parse_push(next_pair(&mut pairs, span)?);
            let to = parse_state(next_pair(&mut pairs, span)?);

            transitions.push(PdaTransition {
                from: state.clone(),
                input,
                top,
                to,
                push,
            });
        }
    }

    Ok(PushdownAutomaton {
        name: header.name,
        states: header.states,
        start: header.start,
        accept: header.accept,
        initial_stack,
        transitions,
    })
}

/// Splits the rules section into `(state, actions)` blocks, rejecting repeated states.
fn parse_rule_blocks(pair: Pair<Rule>) -> Result<Vec<(String, Vec<Pair<Rule>>)>, AutomatonError> {
    let mut blocks = Vec::new();
    let mut seen = HashSet::new();

    for block in pair.into_inner() {
        let span = block.as_span();
        let mut pairs = block.into_inner();
        let state = parse_state(next_pair(&mut pairs, span)?);

        // Prevent duplicated transition rule
        if !seen.insert(state.clone()) {
            return Err(parse_error(
                &format!("Duplicate transition rule: {state}"),
                span,
            ));
        }

        blocks.push((state, pairs.collect()));
    }

    Ok(blocks)
}

/// Parses one of the three Turing machine action shapes into a `Transition`.
fn parse_tm_action(from: &str, pair: Pair<Rule>) -> Result<Transition, AutomatonError> {
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut pairs = pair.into_inner();

    let (read, actions) = match rule {
        Rule::multi_tape_action => {
            let read = parse_symbol_list(next_pair(&mut pairs, span)?)?;
            let writes = parse_write_list(next_pair(&mut pairs, span)?)?;
            let directions = parse_direction_list(next_pair(&mut pairs, span)?)?;

            // Validate that all lists have the same length
            if read.len() != writes.len() || read.len() != directions.len() {
                return Err(parse_error(
                    &format!(
                        "Inconsistent multi-tape action: read={}, write={}, directions={}",
                        read.len(),
                        writes.len(),
                        directions.len()
                    ),
                    span,
                ));
            }

            let actions = writes
                .into_iter()
                .zip(directions)
                .map(|(write, direction)| Action::new(write, direction))
                .collect();
            (read, actions)
        }
        Rule::tm_action => {
            let read = parse_symbol(next_pair(&mut pairs, span)?)?;
            let write = parse_write(next_pair(&mut pairs, span)?)?;
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            (vec![read], vec![Action::new(write, direction)])
        }
        Rule::tm_short_action => {
            // The write is omitted: the cell keeps what was read.
            let read = parse_symbol(next_pair(&mut pairs, span)?)?;
            let direction = parse_direction(next_pair(&mut pairs, span)?)?;
            (vec![read], vec![Action::shift(direction)])
        }
        _ => {
            return Err(parse_error(
                "Expected a turing machine action: read -> write, direction, state",
                span,
            ))
        }
    };

    let to = parse_state(next_pair(&mut pairs, span)?);

    Ok(Transition {
        from: from.to_string(),
        read,
        actions,
        to,
    })
}

/// Parses tape definitions from a `Pair<Rule::tape>` or `Pair<Rule::tapes>`.
fn parse_tapes(pair: Pair<Rule>) -> Result<Vec<Vec<Symbol>>, AutomatonError> {
    match pair.as_rule() {
        Rule::tape => Ok(vec![pair
            .into_inner()
            .map(parse_symbol)
            .collect::<Result<_, _>>()?]),
        _ => pair.into_inner().map(parse_symbol_list).collect(),
    }
}

fn parse_kind(pair: Pair<Rule>) -> Result<Kind, AutomatonError> {
    let span = pair.as_span();
    match parse_inner_string(pair).as_str() {
        "turing" => Ok(Kind::Turing),
        "finite" => Ok(Kind::Finite),
        "pushdown" => Ok(Kind::Pushdown),
        other => Err(parse_error(&format!("Unsupported kind: {other}"), span)),
    }
}

fn parse_state_list(pair: Pair<Rule>) -> Vec<String> {
    // Rule: (states | accept) > state_list > [state]
    pair.into_inner()
        .flat_map(|list| list.into_inner())
        .map(parse_state)
        .collect()
}

fn parse_symbol_list(pair: Pair<Rule>) -> Result<Vec<Symbol>, AutomatonError> {
    pair.into_inner().map(parse_symbol).collect()
}

fn parse_write_list(pair: Pair<Rule>) -> Result<Vec<Option<Symbol>>, AutomatonError> {
    pair.into_inner().map(parse_write).collect()
}

fn parse_direction_list(pair: Pair<Rule>) -> Result<Vec<Direction>, AutomatonError> {
    pair.into_inner().map(parse_direction).collect()
}

/// Parses a single direction.
///
/// Supports '<' or 'L' for Left, '>' or 'R' for Right, and '-' or 'S' for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, AutomatonError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        "-" | "S" => Ok(Direction::Stay),
        _ => Err(parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            span,
        )),
    }
}

/// A token's text and whether it was quoted. Quoted text is always taken literally.
fn token_text(pair: &Pair<Rule>) -> (String, bool) {
    let raw = pair.as_str();
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => (inner.to_string(), true),
        None => (raw.to_string(), false),
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn is_epsilon(text: &str) -> bool {
    text == EPSILON || text == EPSILON_ALIAS
}

/// Parses a tape symbol. A bare `_` is blank; a quoted `'_'` is an ordinary symbol.
fn parse_symbol(pair: Pair<Rule>) -> Result<Symbol, AutomatonError> {
    let span = pair.as_span();
    let (text, quoted) = token_text(&pair);

    match single_char(&text) {
        Some(INPUT_BLANK_SYMBOL) if !quoted => Ok(Symbol::Blank),
        Some(c) => Ok(Symbol::Mark(c)),
        None => Err(parse_error(
            &format!("Expected a single character symbol, found '{text}'"),
            span,
        )),
    }
}

/// Parses a write slot: a bare `*` leaves the cell unchanged.
fn parse_write(pair: Pair<Rule>) -> Result<Option<Symbol>, AutomatonError> {
    let (text, quoted) = token_text(&pair);
    if !quoted && single_char(&text) == Some(INPUT_KEEP_SYMBOL) {
        return Ok(None);
    }

    parse_symbol(pair).map(Some)
}

fn parse_label(pair: Pair<Rule>) -> Label {
    match token_text(&pair) {
        (text, false) if is_epsilon(&text) => Label::Epsilon,
        (text, _) => Label::Word(text),
    }
}

fn parse_letter(pair: Pair<Rule>) -> Result<Letter, AutomatonError> {
    let span = pair.as_span();
    let (text, quoted) = token_text(&pair);

    if !quoted && is_epsilon(&text) {
        return Ok(Letter::Epsilon);
    }

    single_char(&text).map(Letter::Char).ok_or_else(|| {
        parse_error(
            &format!("Expected a single character or epsilon, found '{text}'"),
            span,
        )
    })
}

fn parse_push(pair: Pair<Rule>) -> String {
    match token_text(&pair) {
        (text, false) if is_epsilon(&text) => String::new(),
        (text, _) => text,
    }
}

fn parse_state(pair: Pair<Rule>) -> String {
    token_text(&pair).0
}

/// Creates an `AutomatonError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> AutomatonError {
    AutomatonError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Takes the next pair of a production whose shape the grammar already guarantees.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span) -> Result<Pair<'i, Rule>, AutomatonError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Incomplete definition", span))
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

/// Checks if a given rule has already been declared, ensuring uniqueness for top-level sections.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), AutomatonError> {
    if !matches!(
        rule,
        Rule::name
            | Rule::kind
            | Rule::states
            | Rule::start
            | Rule::accept
            | Rule::stack
            | Rule::tape
            | Rule::tapes
            | Rule::rules
    ) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if an exclusive rule (e.g., `tape` vs. `tapes`) has been violated.
fn check_exclusive_rule<T>(
    value: &Option<T>,
    names: &[&str],
    span: Span,
) -> Result<(), AutomatonError> {
    if value.is_some() {
        return Err(parse_error(
            &format!("Only one of {} is allowed", format_rules(names)),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required rule is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, names: &[&str]) -> Result<T, AutomatonError> {
    value.ok_or_else(|| {
        AutomatonError::ValidationError(format!("Missing {} section", format_rules(names)))
    })
}

/// Rejects a section that makes no sense for `kind`.
fn reject_section(section: Option<Pair<Rule>>, name: &str, kind: Kind) -> Result<(), AutomatonError> {
    match section {
        Some(pair) => Err(parse_error(
            &format!("'{name}' is not allowed in a {kind} definition"),
            pair.as_span(),
        )),
        None => Ok(()),
    }
}

/// Formats a list of rule names into a human-readable string for error messages.
fn format_rules(names: &[&str]) -> String {
    names
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}
