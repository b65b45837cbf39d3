//! # Linear algebra primitives
//!
//! Sparse matrices stored as major-ordered lists of `(index, value)` tuples, and a work vector
//! combining a dense value array with a list of nonzero indices.
pub mod matrix;
pub mod vector;

/// A single nonzero element of a sparse vector: its index and its value.
pub type SparseTuple<F> = (usize, F);

/// Values with an absolute value below this are considered zero in work vectors.
pub const TINY: f64 = 1e-14;
