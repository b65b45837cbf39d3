//! # Product form updates
//!
//! Replacing the basic variable at position `r` by a variable with transformed column
//! `a_q = B^-1 a` gives the new basis matrix `B E` with `E = I + (a_q - e_r) e_r^T`. Its inverse
//! is applied as an eta matrix after the solves with the factorization of `B`.
use crate::data::linear_algebra::SparseTuple;
use crate::data::linear_algebra::vector::WorkVector;

/// A single eta matrix `E^-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct EtaFile {
    /// Basis position that was replaced.
    pivot: usize,
    /// Value of the transformed column at the pivot position.
    pivot_value: f64,
    /// The other nonzero values of the transformed column.
    values: Vec<SparseTuple<f64>>,
}

impl EtaFile {
    /// Create a new instance.
    ///
    /// # Arguments
    ///
    /// * `column`: Transformed entering column `B^-1 a`, indexed by basis position.
    /// * `pivot`: Basis position of the leaving variable.
    pub fn new(column: &WorkVector, pivot: usize) -> Self {
        let pivot_value = column.get(pivot);
        debug_assert_ne!(pivot_value, 0_f64);

        let values = column.iter()
            .filter(|&(i, _)| i != pivot)
            .collect();

        Self { pivot, pivot_value, values }
    }

    /// Position that was replaced.
    pub fn pivot(&self) -> usize {
        self.pivot
    }

    /// Column-multiply with this matrix (from the right, i.e. `E^-1 x`).
    pub fn apply_right(&self, vector: &mut WorkVector) {
        let pivot_value = vector.get(self.pivot);
        if pivot_value == 0_f64 {
            return;
        }

        let result = pivot_value / self.pivot_value;
        vector.set(self.pivot, result);
        for &(i, value) in &self.values {
            vector.add(i, -value * result);
        }
    }

    /// Row-multiply with this matrix (from the left, i.e. `x^T E^-1`).
    pub fn apply_left(&self, vector: &mut WorkVector) {
        let total = self.values.iter()
            .map(|&(i, value)| value * vector.get(i))
            .sum::<f64>();
        let pivot_value = vector.get(self.pivot);
        if pivot_value == 0_f64 && total == 0_f64 {
            return;
        }

        vector.set(self.pivot, (pivot_value - total) / self.pivot_value);
    }

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.values.len() + 1
    }
}
