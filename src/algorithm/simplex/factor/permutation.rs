//! # Pivot order
//!
//! The factorization pivots rows and basis positions in some order. Both directions of that order
//! are stored explicitly.
use std::fmt;

/// Bijection between indices and the pivot steps at which they were pivoted.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct FullPermutation {
    /// Step of each index.
    forward: Vec<usize>,
    /// Index of each step.
    backward: Vec<usize>,
}

impl FullPermutation {
    /// Create a new instance from the index pivoted at each step.
    ///
    /// Computes the inverse by sorting.
    pub fn from_order(backward: Vec<usize>) -> Self {
        let mut forward = backward.iter()
            .enumerate()
            .map(|(step, &index)| (index, step))
            .collect::<Vec<_>>();
        forward.sort_unstable_by_key(|&(index, _)| index);
        debug_assert!(forward.iter().enumerate().all(|(i, &(index, _))| i == index));
        let forward = forward.into_iter().map(|(_, step)| step).collect();

        Self { forward, backward }
    }

    /// The permutation that pivots every index at the step with the same number.
    pub fn identity(n: usize) -> Self {
        Self {
            forward: (0..n).collect(),
            backward: (0..n).collect(),
        }
    }

    /// Step at which an index was pivoted.
    pub fn step(&self, index: usize) -> usize {
        debug_assert!(index < self.len());

        self.forward[index]
    }

    /// Index pivoted at a step.
    pub fn index(&self, step: usize) -> usize {
        debug_assert!(step < self.len());

        self.backward[step]
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.forward.len()
        // == self.backward.len()
    }
}

impl fmt::Display for FullPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        if let Some((first, rest)) = self.backward.split_first() {
            first.fmt(f)?;
            for index in rest {
                write!(f, ", {}", index)?;
            }
        }
        f.write_str(")")
    }
}
