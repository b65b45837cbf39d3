//! A small program with every kind of bound.
//!
//! ```text
//! min 2 x1 + 3 x2 + x3 + 4 x4
//! s.t.      x1 + x2 + x3 + x4 >= 5
//!      -1 <= x1 - x2           <= 2
//!                     x3 + x4 <= 3
//!      0 <= x1 <= 10, x2 >= 0, 0 <= x3 <= 2, x4 >= 0
//! ```
//!
//! The unique optimum is `(2.5, 0.5, 2, 0)` with row duals `(2.5, -0.5, 0)`.
use crate::data::linear_algebra::matrix::ColumnMatrix;
use crate::data::linear_program::LinearProgram;
use crate::data::linear_program::elements::Objective;

/// Optimal objective value.
pub const OBJECTIVE: f64 = 8.5;
/// Optimal column values.
pub const COLUMN_VALUES: [f64; 4] = [2.5, 0.5, 2_f64, 0_f64];
/// Optimal row duals.
pub const ROW_DUALS: [f64; 3] = [2.5, -0.5, 0_f64];

/// Build the program.
pub fn create() -> LinearProgram {
    LinearProgram::new(
        Objective::Minimize,
        vec![2_f64, 3_f64, 1_f64, 4_f64],
        vec![0_f64; 4],
        vec![10_f64, f64::INFINITY, 2_f64, f64::INFINITY],
        vec![5_f64, -1_f64, f64::NEG_INFINITY],
        vec![f64::INFINITY, 2_f64, 3_f64],
        ColumnMatrix::from_dense_rows(&[
            vec![1_f64, 1_f64, 1_f64, 1_f64],
            vec![1_f64, -1_f64, 0_f64, 0_f64],
            vec![0_f64, 0_f64, 1_f64, 1_f64],
        ]),
    ).unwrap()
}
