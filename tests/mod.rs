//! # Integration tests
//!
//! Integration tests completely external from the crate. All code written in this module could be
//! written by an external user of the crate.
use relp_simplex::data::linear_algebra::matrix::ColumnMatrix;
use relp_simplex::data::linear_program::LinearProgram;
use relp_simplex::data::linear_program::elements::Objective;

mod cross_check;
mod modification;
mod scenarios;
mod transform;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a program from dense rows.
fn program(
    objective: Objective,
    cost: &[f64],
    bounds: &[(f64, f64)],
    rows: &[(f64, Vec<f64>, f64)],
) -> LinearProgram {
    let matrix = ColumnMatrix::from_dense_rows(&rows.iter().map(|(_, row, _)| row.clone()).collect::<Vec<_>>());
    LinearProgram::new(
        objective,
        cost.to_vec(),
        bounds.iter().map(|&(lower, _)| lower).collect(),
        bounds.iter().map(|&(_, upper)| upper).collect(),
        rows.iter().map(|&(lower, _, _)| lower).collect(),
        rows.iter().map(|&(_, _, upper)| upper).collect(),
        matrix,
    ).unwrap()
}

/// `min x + y` over two covering rows and a redundant one; the optimum is unique.
fn covering() -> LinearProgram {
    program(
        Objective::Minimize,
        &[1_f64, 1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[
            (2_f64, vec![2_f64, 1_f64], f64::INFINITY),
            (2_f64, vec![1_f64, 2_f64], f64::INFINITY),
            (1_f64, vec![1_f64, 1_f64], f64::INFINITY),
        ],
    )
}
