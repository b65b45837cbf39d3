//! # Work vectors
//!
//! The basis solves, pricing and updates all operate on vectors that are usually sparse but whose
//! sparsity is not known beforehand. A `WorkVector` keeps a dense array of values together with a
//! list of the indices that might be nonzero, so that operations only touch those.
use std::fmt;

use crate::data::linear_algebra::{SparseTuple, TINY};

const ZERO_MARKER: f64 = 1e-50;

/// Dense values with a list of (possibly) nonzero indices.
///
/// Invariant: every index `i` with `array[i] != 0` is in `index[..count]`. The index list may
/// contain indices of values that became zero, `rebuild_index` and `tight` remove those.
#[derive(Clone, PartialEq)]
pub struct WorkVector {
    array: Vec<f64>,
    index: Vec<usize>,
    count: usize,
}

impl WorkVector {
    /// Create a zero vector.
    pub fn new(size: usize) -> Self {
        Self {
            array: vec![0_f64; size],
            index: vec![0; size],
            count: 0,
        }
    }

    /// Create a vector from sparse tuples.
    pub fn from_sparse(size: usize, values: &[SparseTuple<f64>]) -> Self {
        let mut vector = Self::new(size);
        for &(i, value) in values {
            vector.add(i, value);
        }
        vector
    }

    /// Create a vector from a dense slice.
    pub fn from_dense(values: &[f64]) -> Self {
        let mut vector = Self::new(values.len());
        vector.array.copy_from_slice(values);
        vector.rebuild_index();
        vector
    }

    /// Dimension of the vector.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Whether the vector has dimension zero.
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Number of entries in the index list.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Set to zero, touching only the indexed entries when the index is small.
    pub fn clear(&mut self) {
        if self.count * 3 < self.array.len() {
            for &i in &self.index[..self.count] {
                self.array[i] = 0_f64;
            }
        } else {
            self.array.iter_mut().for_each(|v| *v = 0_f64);
        }
        self.count = 0;
    }

    /// Resize, clearing all values.
    pub fn resize(&mut self, size: usize) {
        self.array.clear();
        self.array.resize(size, 0_f64);
        self.index.clear();
        self.index.resize(size, 0);
        self.count = 0;
    }

    /// Make this the unit vector `e_i`.
    pub fn set_unit(&mut self, i: usize) {
        self.clear();
        self.array[i] = 1_f64;
        self.index[0] = i;
        self.count = 1;
    }

    /// Value at an index.
    pub fn get(&self, i: usize) -> f64 {
        self.array[i]
    }

    /// Overwrite a value.
    pub fn set(&mut self, i: usize, value: f64) {
        if self.array[i] == 0_f64 && value != 0_f64 {
            self.index[self.count] = i;
            self.count += 1;
        }
        // Cancelled values keep a marker, so that the index stays free of duplicates
        self.array[i] = if value == 0_f64 && self.array[i] != 0_f64 { ZERO_MARKER } else { value };
    }

    /// Add to a value.
    pub fn add(&mut self, i: usize, value: f64) {
        let old = self.array[i];
        self.set(i, old + value);
    }

    /// The dense values.
    pub fn array(&self) -> &[f64] {
        &self.array
    }

    /// Mutable access to the dense values.
    ///
    /// After changing the values through this, `rebuild_index` needs to be called.
    pub fn array_mut(&mut self) -> &mut [f64] {
        &mut self.array
    }

    /// The indices that might be nonzero.
    pub fn indices(&self) -> &[usize] {
        &self.index[..self.count]
    }

    /// Recompute the index list from the dense values.
    pub fn rebuild_index(&mut self) {
        let mut count = 0;
        for (i, &value) in self.array.iter().enumerate() {
            if value != 0_f64 {
                self.index[count] = i;
                count += 1;
            }
        }
        self.count = count;
    }

    /// Drop values that are numerically zero from both the values and the index.
    pub fn tight(&mut self) {
        let mut count = 0;
        for k in 0..self.count {
            let i = self.index[k];
            if self.array[i].abs() < TINY {
                self.array[i] = 0_f64;
            } else {
                self.index[count] = i;
                count += 1;
            }
        }
        self.count = count;
    }

    /// Fraction of the entries that are indexed.
    pub fn density(&self) -> f64 {
        if self.array.is_empty() {
            0_f64
        } else {
            self.count as f64 / self.array.len() as f64
        }
    }

    /// Squared Euclidean norm.
    pub fn norm2(&self) -> f64 {
        self.iter().map(|(_, v)| v * v).sum()
    }

    /// Largest absolute value.
    pub fn max_abs(&self) -> f64 {
        self.iter().map(|(_, v)| v.abs()).fold(0_f64, f64::max)
    }

    /// Iterate over the indexed (index, value) pairs, skipping exact zeros.
    pub fn iter(&self) -> impl Iterator<Item = SparseTuple<f64>> + '_ {
        self.index[..self.count].iter()
            .map(move |&i| (i, self.array[i]))
            .filter(|&(_, v)| v != 0_f64)
    }

    /// Copy the values of another vector of the same size.
    pub fn copy_from(&mut self, other: &WorkVector) {
        debug_assert_eq!(self.len(), other.len());

        self.clear();
        for (i, v) in other.iter() {
            self.array[i] = v;
            self.index[self.count] = i;
            self.count += 1;
        }
    }

    /// Sorted sparse representation, without numerically zero values.
    pub fn to_sparse(&self) -> Vec<SparseTuple<f64>> {
        let mut values = self.iter().filter(|&(_, v)| v.abs() >= TINY).collect::<Vec<_>>();
        values.sort_unstable_by_key(|&(i, _)| i);
        values
    }

    /// Dense copy of the values.
    pub fn to_dense(&self) -> Vec<f64> {
        self.array.clone()
    }

    /// Whether the index invariant holds.
    pub fn is_consistent(&self) -> bool {
        let mut indexed = vec![false; self.array.len()];
        for &i in &self.index[..self.count] {
            if indexed[i] {
                return false;
            }
            indexed[i] = true;
        }

        self.array.iter().zip(indexed).all(|(&v, is_indexed)| v == 0_f64 || is_indexed)
    }
}

impl fmt::Debug for WorkVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkVector({}, {:?})", self.len(), self.to_sparse())
    }
}

#[cfg(test)]
mod test {
    use crate::data::linear_algebra::vector::WorkVector;

    #[test]
    fn set_and_clear() {
        let mut v = WorkVector::new(5);
        v.set(3, 2_f64);
        v.add(1, -1_f64);
        v.add(3, 1_f64);
        assert_eq!(v.count(), 2);
        assert_eq!(v.to_sparse(), vec![(1, -1_f64), (3, 3_f64)]);
        assert!(v.is_consistent());

        v.clear();
        assert_eq!(v.count(), 0);
        assert_eq!(v.to_dense(), vec![0_f64; 5]);
    }

    #[test]
    fn cancellation_keeps_index() {
        let mut v = WorkVector::new(3);
        v.set(0, 1_f64);
        v.add(0, -1_f64);
        assert!(v.is_consistent());
        v.tight();
        assert_eq!(v.count(), 0);
        assert_eq!(v.get(0), 0_f64);
    }

    #[test]
    fn unit_and_dense() {
        let mut v = WorkVector::from_dense(&[0_f64, 4_f64, 0_f64, -3_f64]);
        assert_eq!(v.count(), 2);
        assert_eq!(v.norm2(), 25_f64);
        assert_eq!(v.max_abs(), 4_f64);
        assert_eq!(v.density(), 0.5);

        v.set_unit(2);
        assert_eq!(v.to_sparse(), vec![(2, 1_f64)]);
        assert!(v.is_consistent());
    }
}
