//! Sparse, two-way infinite tape storage.
//!
//! Only non-blank cells are stored. A position with no entry holds `Symbol::Blank`,
//! which keeps memory proportional to the number of written cells regardless of how
//! far a head wanders.

use crate::types::{Direction, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tape together with its head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tape {
    cells: BTreeMap<i64, Symbol>,
    head: i64,
}

/// A rendered slice of a tape around its head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeWindow {
    /// Position of the first cell in `cells`.
    pub origin: i64,
    pub head: i64,
    pub cells: Vec<Symbol>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tape holding `initial` from position 0 with the head at 0.
    pub fn with_symbols(initial: &[Symbol]) -> Self {
        let mut tape = Self::new();
        tape.reset(initial);
        tape
    }

    /// Clears the tape, lays `initial` out from position 0 and parks the head at 0.
    /// Blank symbols are skipped so the store stays sparse.
    pub fn reset(&mut self, initial: &[Symbol]) {
        self.cells = initial
            .iter()
            .enumerate()
            .filter(|(_, symbol)| !symbol.is_blank())
            .map(|(i, &symbol)| (i as i64, symbol))
            .collect();
        self.head = 0;
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.get(self.head)
    }

    /// Returns the symbol at an arbitrary position.
    pub fn get(&self, position: i64) -> Symbol {
        self.cells.get(&position).copied().unwrap_or(Symbol::Blank)
    }

    /// Writes under the head. Writing blank removes the cell.
    pub fn write(&mut self, symbol: Symbol) {
        if symbol.is_blank() {
            self.cells.remove(&self.head);
        } else {
            self.cells.insert(self.head, symbol);
        }
    }

    pub fn shift(&mut self, direction: Direction) {
        self.head += direction.offset();
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    /// Number of non-blank cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Leftmost and rightmost non-blank positions, if any.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        let first = self.cells.keys().next()?;
        let last = self.cells.keys().next_back()?;
        Some((*first, *last))
    }

    /// Symbols from the leftmost to the rightmost non-blank cell, inner blanks included.
    pub fn contents(&self) -> Vec<Symbol> {
        match self.bounds() {
            Some((first, last)) => (first..=last).map(|p| self.get(p)).collect(),
            None => Vec::new(),
        }
    }

    /// `radius` cells on each side of the head, plus the head cell.
    pub fn window(&self, radius: usize) -> TapeWindow {
        let radius = radius as i64;
        let origin = self.head - radius;
        TapeWindow {
            origin,
            head: self.head,
            cells: (origin..=self.head + radius).map(|p| self.get(p)).collect(),
        }
    }
}

impl std::fmt::Display for Tape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for symbol in self.contents() {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}
