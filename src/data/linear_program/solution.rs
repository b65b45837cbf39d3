//! # Representation of solutions
//!
//! Values for the columns and rows of a linear program, together with the dual values. Once a
//! linear program is solved, these are expressed in terms of the problem as it was given: any
//! dualization or permutation applied for solving has been undone.

/// Primal and dual values of a linear program.
///
/// The dual values satisfy `col_dual = c - A^T row_dual` with `c` the cost vector as given, so for a
/// maximization problem the signs are those of the maximization problem.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Solution {
    /// Value of each column (variable).
    pub col_value: Vec<f64>,
    /// Activity `A x` of each row.
    pub row_value: Vec<f64>,
    /// Reduced cost of each column.
    pub col_dual: Vec<f64>,
    /// Dual value of each row.
    pub row_dual: Vec<f64>,
    /// Value of the objective function including the offset.
    pub objective_value: f64,
}

impl Solution {
    /// Largest absolute difference between the primal values of two solutions.
    pub fn max_primal_difference(&self, other: &Self) -> f64 {
        max_difference(&self.col_value, &other.col_value)
            .max(max_difference(&self.row_value, &other.row_value))
    }

    /// Largest absolute difference between the dual values of two solutions.
    pub fn max_dual_difference(&self, other: &Self) -> f64 {
        max_difference(&self.col_dual, &other.col_dual)
            .max(max_difference(&self.row_dual, &other.row_dual))
    }
}

/// Position of a column or row with respect to a basis.
///
/// For rows, `Lower` and `Upper` refer to the bounds of the row activity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BasisStatus {
    /// Nonbasic at the lower bound. Also used for fixed variables.
    Lower,
    /// Basic.
    Basic,
    /// Nonbasic at the upper bound.
    Upper,
    /// Nonbasic, free and at zero.
    Zero,
}

/// Basis of a linear program, described by a status for every column and row.
///
/// A valid basis has exactly as many `Basic` statuses as there are rows.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Basis {
    /// Status of each column.
    pub col_status: Vec<BasisStatus>,
    /// Status of each row.
    pub row_status: Vec<BasisStatus>,
}

impl Basis {
    /// Number of basic columns and rows.
    pub fn nr_basic(&self) -> usize {
        self.col_status.iter().chain(&self.row_status)
            .filter(|&&status| status == BasisStatus::Basic)
            .count()
    }
}

fn max_difference(left: &[f64], right: &[f64]) -> f64 {
    debug_assert_eq!(left.len(), right.len());

    left.iter().zip(right).map(|(a, b)| (a - b).abs()).fold(0_f64, f64::max)
}
