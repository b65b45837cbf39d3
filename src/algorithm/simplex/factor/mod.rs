//! # Basis factorization
//!
//! Solves with the basis matrix `B` and its transpose, using an LU decomposition of the matrix as
//! it was at the last factorization followed by product form updates for each basis change since.
use std::fmt;

use log::trace;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::algorithm::simplex::options::Options;
use crate::data::linear_algebra::matrix::ColumnMatrix;
use crate::data::linear_algebra::SparseTuple;
use crate::data::linear_algebra::vector::WorkVector;

pub use decomposition::{LUDecomposition, RankDeficiency};
pub use eta_file::EtaFile;

mod decomposition;
mod eta_file;
mod permutation;

/// A basis change could not be applied to the factorization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UpdateError {
    /// The pivot is too small relative to the other values in the transformed column.
    SmallPivot {
        /// The pivot value.
        pivot: f64,
        /// Largest absolute value in the transformed column.
        max: f64,
    },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::SmallPivot { pivot, max } => {
                write!(f, "pivot {:e} too small relative to column maximum {:e}", pivot, max)
            },
        }
    }
}

/// Factorization of the basis matrix with its updates.
#[derive(Debug, Clone)]
pub struct Factor {
    lu: LUDecomposition,
    updates: Vec<EtaFile>,

    update_limit: usize,
    pivot_tolerance: f64,
    pivot_threshold: f64,
    singularity_tolerance: f64,
    hyper_sparse_density: f64,
}

impl Factor {
    /// Create a factorization of the empty basis with the thresholds of the options.
    pub fn new(options: &Options) -> Self {
        Self {
            lu: LUDecomposition::identity(0),
            updates: Vec::new(),

            update_limit: options.update_limit,
            pivot_tolerance: options.pivot_tolerance,
            pivot_threshold: options.factor_pivot_threshold,
            singularity_tolerance: options.factor_pivot_tolerance,
            hyper_sparse_density: options.hyper_sparse_density,
        }
    }

    /// Factorize the basis matrix from scratch.
    ///
    /// # Arguments
    ///
    /// * `matrix`: Structural columns of the constraint matrix.
    /// * `basic_index`: Basic variable of each basis position. Indices of at least
    /// `matrix.nr_columns()` refer to logical variables, whose columns are unit vectors.
    ///
    /// # Return value
    ///
    /// Nothing if successful. Otherwise, the factorization is not usable and the positions and
    /// rows that could not be pivoted are returned.
    pub fn build(&mut self, matrix: &ColumnMatrix, basic_index: &[usize]) -> Result<(), RankDeficiency> {
        debug_assert_eq!(basic_index.len(), matrix.nr_rows());

        let columns = basic_index.iter()
            .map(|&variable| basis_column(matrix, variable))
            .collect::<Vec<_>>();

        self.updates.clear();
        let lu = LUDecomposition::decompose(&columns, self.pivot_threshold, self.singularity_tolerance)?;
        trace!("Factorized basis of dimension {} with {} nonzeros", lu.m(), lu.nnz());
        self.lu = lu;

        Ok(())
    }

    /// Dimension of the basis matrix.
    pub fn m(&self) -> usize {
        self.lu.m()
    }

    /// Solve `B x = rhs` in place.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Indexed by row; overwritten with the solution, indexed by basis position.
    /// * `expected_density`: Expected fraction of nonzeros in the result, used to choose how to
    /// traverse the factors. It does not influence the result.
    pub fn ftran(&self, rhs: &mut WorkVector, expected_density: f64) {
        let hyper_sparse = self.is_hyper_sparse(rhs, expected_density);
        self.lu.solve_right(rhs, hyper_sparse);
        for eta in &self.updates {
            eta.apply_right(rhs);
        }
    }

    /// Solve `B^T y = rhs` in place.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Indexed by basis position; overwritten with the solution, indexed by row.
    /// * `expected_density`: Expected fraction of nonzeros in the result, used to choose how to
    /// traverse the factors. It does not influence the result.
    pub fn btran(&self, rhs: &mut WorkVector, expected_density: f64) {
        for eta in self.updates.iter().rev() {
            eta.apply_left(rhs);
        }
        let hyper_sparse = self.is_hyper_sparse(rhs, expected_density);
        self.lu.solve_left(rhs, hyper_sparse);
    }

    fn is_hyper_sparse(&self, rhs: &WorkVector, expected_density: f64) -> bool {
        expected_density < self.hyper_sparse_density && rhs.density() < self.hyper_sparse_density
    }

    /// Replace the basic variable at a position.
    ///
    /// # Arguments
    ///
    /// * `aq`: Transformed column `B^-1 a_q` of the entering variable, indexed by basis position.
    /// * `row_out`: Basis position of the leaving variable.
    pub fn update(&mut self, aq: &WorkVector, row_out: usize) -> Result<(), UpdateError> {
        let pivot = aq.get(row_out);
        let max = aq.max_abs();
        if pivot == 0_f64 || pivot.abs() < self.pivot_tolerance * max {
            return Err(UpdateError::SmallPivot { pivot, max });
        }

        self.updates.push(EtaFile::new(aq, row_out));
        Ok(())
    }

    /// Number of updates since the last factorization.
    pub fn nr_updates(&self) -> usize {
        self.updates.len()
    }

    /// Whether the basis matrix should be factorized from scratch.
    pub fn should_refactor(&self) -> bool {
        self.updates.len() >= self.update_limit
    }

    /// Estimate the accuracy of the factorization.
    ///
    /// Solves `B x = e_r` for a random row `r` and measures the largest absolute residual.
    pub fn solve_error(&self, matrix: &ColumnMatrix, basic_index: &[usize], seed: u64) -> f64 {
        let m = self.m();
        if m == 0 {
            return 0_f64;
        }

        let row = StdRng::seed_from_u64(seed).gen_range(0..m);
        let mut x = WorkVector::new(m);
        x.set_unit(row);
        self.ftran(&mut x, 1_f64);

        let mut residual = vec![0_f64; m];
        residual[row] = -1_f64;
        for (position, value) in x.iter() {
            for (i, a) in basis_column(matrix, basic_index[position]) {
                residual[i] += a * value;
            }
        }

        residual.into_iter().map(f64::abs).fold(0_f64, f64::max)
    }

    /// Improve a solution of `B^T y = rhs` with one step of iterative refinement.
    ///
    /// # Arguments
    ///
    /// * `matrix`, `basic_index`: The basis matrix, as in `build`.
    /// * `rhs`: The original right-hand side, indexed by basis position.
    /// * `y`: The solution to improve, indexed by row.
    pub fn refine_btran(&self, matrix: &ColumnMatrix, basic_index: &[usize], rhs: &WorkVector, y: &mut WorkVector) {
        let mut residual = WorkVector::new(self.m());
        for (position, &variable) in basic_index.iter().enumerate() {
            let product = basis_column(matrix, variable).into_iter()
                .map(|(i, a)| a * y.get(i))
                .sum::<f64>();
            let difference = rhs.get(position) - product;
            if difference != 0_f64 {
                residual.set(position, difference);
            }
        }

        self.btran(&mut residual, y.density());
        for (i, correction) in residual.iter() {
            y.add(i, correction);
        }
    }
}

/// Column of a variable: structural from the matrix, logical as a unit vector.
pub fn basis_column(matrix: &ColumnMatrix, variable: usize) -> Vec<SparseTuple<f64>> {
    let nr_columns = matrix.nr_columns();
    if variable < nr_columns {
        matrix.column(variable).to_vec()
    } else {
        vec![(variable - nr_columns, 1_f64)]
    }
}
