//! # Rejected basis changes
//!
//! Basis changes that led to trouble are remembered for a while. While a record is taboo, the
//! pivoting rules skip it.
use std::collections::VecDeque;

/// Why a basis change was rejected.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BadBasisChangeKind {
    /// It would revisit a basis seen before in this solve.
    Cycling,
    /// The resulting basis matrix was singular.
    Singular,
    /// The pivot could not be computed accurately.
    NumericalTrouble,
}

/// A rejected basis change.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BadBasisChange {
    /// Why it was rejected.
    pub kind: BadBasisChangeKind,
    /// Row in which the basis change would take place.
    pub row_out: usize,
    /// Variable that would leave the basis.
    pub variable_out: usize,
    /// Variable that would enter the basis.
    pub variable_in: usize,
    /// Whether the pivoting rules currently avoid it.
    pub taboo: bool,
}

/// Bounded first-in first-out record of rejected basis changes.
#[derive(Debug, Clone)]
pub struct BadBasisChanges {
    records: VecDeque<BadBasisChange>,
    capacity: usize,
}

impl BadBasisChanges {
    /// Create an empty record that holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self { records: VecDeque::with_capacity(capacity), capacity }
    }

    /// Remember a rejected basis change as taboo, forgetting the oldest one when full.
    pub fn add(&mut self, kind: BadBasisChangeKind, row_out: usize, variable_out: usize, variable_in: usize) {
        if self.capacity == 0 {
            return;
        }

        let existing = self.records.iter_mut()
            .find(|change| change.row_out == row_out && change.variable_in == variable_in);
        match existing {
            Some(change) => {
                change.kind = kind;
                change.taboo = true;
            },
            None => {
                if self.records.len() == self.capacity {
                    self.records.pop_front();
                }
                self.records.push_back(BadBasisChange { kind, row_out, variable_out, variable_in, taboo: true });
            },
        }
    }

    /// Whether leaving in this row is currently avoided.
    pub fn is_taboo_row(&self, row: usize) -> bool {
        self.records.iter().any(|change| change.taboo && change.row_out == row)
    }

    /// Whether entering with this variable is currently avoided.
    pub fn is_taboo_variable(&self, variable: usize) -> bool {
        self.records.iter().any(|change| change.taboo && change.variable_in == variable)
    }

    /// Whether this exact basis change is currently avoided.
    pub fn is_taboo(&self, row_out: usize, variable_in: usize) -> bool {
        self.records.iter()
            .any(|change| change.taboo && change.row_out == row_out && change.variable_in == variable_in)
    }

    /// Stop avoiding the remembered changes; they stay in the history.
    pub fn clear_taboo(&mut self) {
        for change in &mut self.records {
            change.taboo = false;
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of remembered changes of a kind.
    pub fn count(&self, kind: BadBasisChangeKind) -> usize {
        self.records.iter().filter(|change| change.kind == kind).count()
    }

    /// Number of remembered changes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::algorithm::simplex::taboo::{BadBasisChangeKind, BadBasisChanges};

    #[test]
    fn fifo() {
        let mut taboo = BadBasisChanges::new(2);
        taboo.add(BadBasisChangeKind::Cycling, 0, 10, 1);
        taboo.add(BadBasisChangeKind::Cycling, 0, 10, 1);
        assert_eq!(taboo.len(), 1);
        taboo.add(BadBasisChangeKind::Singular, 1, 11, 2);
        taboo.add(BadBasisChangeKind::Cycling, 2, 12, 3);
        assert_eq!(taboo.len(), 2);
        assert!(!taboo.is_taboo_row(0));
        assert!(taboo.is_taboo_row(1));
        assert!(taboo.is_taboo_variable(3));
        assert!(taboo.is_taboo(2, 3));
        assert!(!taboo.is_taboo(2, 2));
        assert_eq!(taboo.count(BadBasisChangeKind::Cycling), 1);
    }

    #[test]
    fn clear() {
        let mut taboo = BadBasisChanges::new(4);
        taboo.add(BadBasisChangeKind::Cycling, 0, 10, 1);
        taboo.add(BadBasisChangeKind::NumericalTrouble, 1, 11, 2);
        taboo.clear_taboo();
        assert_eq!(taboo.len(), 2);
        assert!(!taboo.is_taboo_row(1));
        assert!(!taboo.is_taboo_variable(1));

        // Adding again makes it taboo again
        taboo.add(BadBasisChangeKind::Cycling, 0, 10, 1);
        assert!(taboo.is_taboo_row(0));
        taboo.clear();
        assert!(taboo.is_empty());
    }

    #[test]
    fn zero_capacity() {
        let mut taboo = BadBasisChanges::new(0);
        taboo.add(BadBasisChangeKind::Cycling, 0, 10, 1);
        assert!(taboo.is_empty());
    }
}
