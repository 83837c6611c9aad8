//! Finite automaton transformations: unit-label expansion, epsilon-closure, subset
//! construction and partition-refinement minimization.
//!
//! Every stage is a pure function that returns a new `FiniteAutomaton`; inputs are never
//! modified. `Pipeline::run` validates its input once and chains all stages.

use crate::analyzer::analyze_finite;
use crate::program::FiniteAutomaton;
use crate::types::{AutomatonError, Label};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

/// A canonically ordered set of NFA states.
///
/// Two sets are equal exactly when their sorted members are equal, so the same subset always
/// maps to the same DFA state and the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateSet(BTreeSet<String>);

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(state: impl Into<String>) -> Self {
        Self(BTreeSet::from([state.into()]))
    }

    pub fn insert(&mut self, state: impl Into<String>) -> bool {
        self.0.insert(state.into())
    }

    pub fn contains(&self, state: &str) -> bool {
        self.0.contains(state)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn intersects(&self, other: &BTreeSet<String>) -> bool {
        self.0.iter().any(|state| other.contains(state))
    }

    /// Canonical name, e.g. `{q0,q1}`.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = self.0.iter().map(String::as_str).collect::<Vec<_>>();
        write!(f, "{{{}}}", members.join(","))
    }
}

impl<S: Into<String>> FromIterator<S> for StateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Hands out state names that do not clash with existing ones.
struct FreshNames {
    taken: BTreeSet<String>,
    counter: usize,
}

impl FreshNames {
    fn new(taken: &BTreeSet<String>) -> Self {
        Self {
            taken: taken.clone(),
            counter: 0,
        }
    }

    fn next(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{}_{}", prefix, self.counter);
            self.counter += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Takes `name` if nobody holds it yet, otherwise a fresh name derived from it.
    fn claim(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            name
        } else {
            self.next(&name)
        }
    }
}

/// Rewrites every multi-character label as a chain of single-character edges through fresh
/// intermediate states. Epsilon and single-character edges are copied as they are.
pub fn expand_labels(automaton: &FiniteAutomaton) -> FiniteAutomaton {
    let mut unit = FiniteAutomaton {
        name: automaton.name.clone(),
        states: automaton.states.clone(),
        alphabet: BTreeSet::new(),
        start: automaton.start.clone(),
        accept: automaton.accept.clone(),
        transitions: BTreeMap::new(),
    };
    let mut fresh = FreshNames::new(&automaton.states);

    for (from, edges) in &automaton.transitions {
        for (label, targets) in edges {
            for to in targets {
                match label {
                    Label::Word(word) if label.len() > 1 => {
                        let chars: Vec<char> = word.chars().collect();
                        let mut current = from.clone();

                        for (i, c) in chars.iter().enumerate() {
                            let next = if i + 1 == chars.len() {
                                to.clone()
                            } else {
                                let state = fresh.next(from);
                                unit.add_state(state.clone());
                                state
                            };
                            unit.add_transition(current, Label::Word(c.to_string()), next.clone());
                            current = next;
                        }
                    }
                    _ => unit.add_transition(from.clone(), label.clone(), to.clone()),
                }
            }
        }
    }

    log::debug!(
        "expanded '{}': {} -> {} states",
        automaton.name,
        automaton.states.len(),
        unit.states.len()
    );
    unit
}

/// Every state reachable from `states` through epsilon edges alone, `states` included.
pub fn epsilon_closure(automaton: &FiniteAutomaton, states: &StateSet) -> StateSet {
    let mut closure = states.clone();
    let mut worklist: Vec<&String> = states.iter().collect();

    while let Some(state) = worklist.pop() {
        if let Some(targets) = automaton.targets(state, &Label::Epsilon) {
            for target in targets {
                if closure.insert(target.clone()) {
                    worklist.push(target);
                }
            }
        }
    }

    closure
}

/// States reachable from any member of `states` by one `symbol` edge (no closure applied).
pub fn move_on(automaton: &FiniteAutomaton, states: &StateSet, symbol: &str) -> StateSet {
    let label = Label::word(symbol);
    states
        .iter()
        .filter_map(|state| automaton.targets(state, &label))
        .flatten()
        .cloned()
        .collect()
}

/// Subset construction.
///
/// Multi-character labels are expanded first when present. A symbol that leads nowhere
/// from a subset produces no edge, so the result may be partial.
///
/// Each subset is named once, when it is discovered. It gets its canonical name unless a
/// different subset already holds that name (member names may themselves contain braces
/// and commas), in which case it gets a fresh one.
pub fn determinize(automaton: &FiniteAutomaton) -> FiniteAutomaton {
    let expanded;
    let nfa = if automaton.is_unit() {
        automaton
    } else {
        expanded = expand_labels(automaton);
        &expanded
    };

    let mut fresh = FreshNames::new(&BTreeSet::new());
    let start = epsilon_closure(nfa, &StateSet::single(nfa.start.clone()));
    let start_name = fresh.claim(start.name());

    let mut dfa = FiniteAutomaton::new(nfa.name.clone(), start_name.clone());
    dfa.alphabet = nfa.alphabet.clone();
    if start.intersects(&nfa.accept) {
        dfa.add_accept(start_name.clone());
    }

    let mut names = HashMap::from([(start.clone(), start_name)]);
    let mut worklist = VecDeque::from([start]);

    while let Some(subset) = worklist.pop_front() {
        let Some(source) = names.get(&subset).cloned() else {
            continue;
        };

        for symbol in &nfa.alphabet {
            let moved = move_on(nfa, &subset, symbol);
            if moved.is_empty() {
                continue;
            }

            let target = epsilon_closure(nfa, &moved);
            let name = match names.get(&target) {
                Some(name) => name.clone(),
                None => {
                    let name = fresh.claim(target.name());
                    dfa.add_state(name.clone());
                    if target.intersects(&nfa.accept) {
                        dfa.add_accept(name.clone());
                    }
                    names.insert(target.clone(), name.clone());
                    worklist.push_back(target);
                    name
                }
            };

            dfa.add_transition(source.clone(), Label::word(symbol.clone()), name);
        }
    }

    log::debug!(
        "determinized '{}': {} NFA states -> {} DFA states",
        nfa.name,
        nfa.states.len(),
        dfa.states.len()
    );
    dfa
}

/// States reachable from the start state of a deterministic automaton.
fn reachable_states(dfa: &FiniteAutomaton) -> BTreeSet<String> {
    let mut reachable = BTreeSet::from([dfa.start.clone()]);
    let mut worklist = vec![dfa.start.as_str()];

    while let Some(state) = worklist.pop() {
        for (_, targets) in dfa.edges(state) {
            for target in targets {
                if reachable.insert(target.clone()) {
                    worklist.push(target);
                }
            }
        }
    }

    reachable
}

/// Splits every block by the blocks its members move to under each symbol.
/// A missing edge leads to `sink`, which loops on every symbol.
fn refine(
    dfa: &FiniteAutomaton,
    symbols: &[&String],
    partition: &[BTreeSet<String>],
    sink: &str,
) -> Vec<BTreeSet<String>> {
    let block_of = index_blocks(partition);
    let mut refined = Vec::with_capacity(partition.len());

    for block in partition {
        let mut groups: BTreeMap<Vec<Option<usize>>, BTreeSet<String>> = BTreeMap::new();
        for state in block {
            let signature = symbols
                .iter()
                .map(|symbol| {
                    let target = dfa.next(state, symbol).map_or(sink, String::as_str);
                    block_of.get(target).copied()
                })
                .collect();
            groups.entry(signature).or_default().insert(state.clone());
        }
        refined.extend(groups.into_values());
    }

    refined.sort();
    refined
}

fn index_blocks(partition: &[BTreeSet<String>]) -> HashMap<&str, usize> {
    partition
        .iter()
        .enumerate()
        .flat_map(|(i, block)| block.iter().map(move |state| (state.as_str(), i)))
        .collect()
}

/// Names for the blocks of a partition, in order.
///
/// Singletons keep their member's name and are named first. Larger blocks join their sorted
/// members with `+`, falling back to a fresh name when that is already taken, since member
/// names may contain `+` themselves.
fn block_names(blocks: &[&BTreeSet<String>]) -> Vec<String> {
    let mut fresh = FreshNames::new(&BTreeSet::new());
    let mut names = vec![String::new(); blocks.len()];

    for (i, block) in blocks.iter().enumerate() {
        if let (1, Some(member)) = (block.len(), block.iter().next()) {
            names[i] = fresh.claim(member.clone());
        }
    }
    for (i, block) in blocks.iter().enumerate() {
        if block.len() != 1 {
            let joined = block.iter().map(String::as_str).collect::<Vec<_>>().join("+");
            names[i] = fresh.claim(joined);
        }
    }

    names
}

/// Partition-refinement minimization.
///
/// Non-deterministic input is determinized first. Unreachable states are dropped and the
/// automaton is completed with a virtual dead state that every missing edge leads to. The
/// states start out split into accepting and non-accepting blocks, and blocks are refined
/// until a full pass splits nothing. Each round adds at least one block, so there are at
/// most as many rounds as reachable states.
///
/// The dead state's block holds every state that can never accept. It is left out of the
/// result, edges into it included, unless the start state is in it.
pub fn minimize(automaton: &FiniteAutomaton) -> FiniteAutomaton {
    let determinized;
    let dfa = if automaton.is_deterministic() {
        automaton
    } else {
        determinized = determinize(automaton);
        &determinized
    };

    let symbols: Vec<&String> = dfa.alphabet.iter().collect();
    let sink = FreshNames::new(&dfa.states).next("dead");
    let (accepting, mut rejecting): (BTreeSet<String>, BTreeSet<String>) =
        reachable_states(dfa)
            .into_iter()
            .partition(|state| dfa.is_accepting(state));
    rejecting.insert(sink.clone());

    let mut partition: Vec<BTreeSet<String>> = [accepting, rejecting]
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect();
    partition.sort();

    let mut rounds = 0;
    loop {
        rounds += 1;
        let refined = refine(dfa, &symbols, &partition, &sink);
        if refined.len() == partition.len() {
            break;
        }
        partition = refined;
    }

    let block_of = index_blocks(&partition);
    let dead = block_of.get(sink.as_str()).copied();
    let start_block = block_of.get(dfa.start.as_str()).copied();

    let kept: Vec<(usize, BTreeSet<String>)> = partition
        .iter()
        .enumerate()
        .filter(|&(i, _)| Some(i) != dead || Some(i) == start_block)
        .map(|(i, block)| (i, block.iter().filter(|s| **s != sink).cloned().collect()))
        .collect();
    let names: HashMap<usize, String> = kept
        .iter()
        .map(|(i, _)| *i)
        .zip(block_names(&kept.iter().map(|(_, block)| block).collect::<Vec<_>>()))
        .collect();

    let start = start_block
        .and_then(|i| names.get(&i))
        .cloned()
        .unwrap_or_else(|| dfa.start.clone());
    let mut minimal = FiniteAutomaton::new(dfa.name.clone(), start);
    minimal.alphabet = dfa.alphabet.clone();

    for (i, block) in &kept {
        // Every member agrees on acceptance and destinations; any one will do.
        let (Some(name), Some(representative)) = (names.get(i), block.iter().next()) else {
            continue;
        };

        minimal.add_state(name.clone());
        if dfa.is_accepting(representative) {
            minimal.add_accept(name.clone());
        }
        for symbol in &symbols {
            let target = dfa
                .next(representative, symbol)
                .and_then(|t| block_of.get(t.as_str()))
                .and_then(|target| names.get(target));
            if let Some(target) = target {
                minimal.add_transition(name.clone(), Label::word(*symbol), target.clone());
            }
        }
    }

    log::debug!(
        "minimized '{}': {} -> {} states in {} rounds",
        dfa.name,
        dfa.states.len(),
        minimal.states.len(),
        rounds
    );
    minimal
}

/// Which derived automaton of a pipeline run to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Unit,
    Dfa,
    Minimal,
}

/// All derived automata of one transformation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub unit: FiniteAutomaton,
    pub dfa: FiniteAutomaton,
    pub minimal: FiniteAutomaton,
}

impl Pipeline {
    /// Validates `automaton` and runs expansion, subset construction and minimization.
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` with every derived automaton.
    /// * `Err(AutomatonError::ValidationError)` if the automaton references undeclared states.
    pub fn run(automaton: &FiniteAutomaton) -> Result<Self, AutomatonError> {
        analyze_finite(automaton)?;

        let unit = expand_labels(automaton);
        let dfa = determinize(&unit);
        let minimal = minimize(&dfa);

        Ok(Self { unit, dfa, minimal })
    }

    pub fn stage(&self, stage: Stage) -> &FiniteAutomaton {
        match stage {
            Stage::Unit => &self.unit,
            Stage::Dfa => &self.dfa,
            Stage::Minimal => &self.minimal,
        }
    }
}
