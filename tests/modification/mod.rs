//! Modifying a program between solves, starting each solve from the previous basis.
use approx::assert_abs_diff_eq;

use relp_simplex::algorithm::{ModelStatus, Solver};
use relp_simplex::data::linear_program::elements::Objective;
use relp_simplex::error::Error;

use crate::{init, program};

/// Solve again from scratch and compare.
fn assert_matches_cold_start(solver: &Solver) {
    let program = solver.program().clone();
    let mut cold = Solver::new(&program);
    assert_eq!(cold.solve(), Ok(solver.status()));
    if solver.status() == ModelStatus::Optimal {
        assert_abs_diff_eq!(
            cold.solution().unwrap().objective_value,
            solver.solution().unwrap().objective_value,
            epsilon = 1e-9,
        );
    }
}

#[test]
fn add_and_delete() {
    init();
    let program = program(
        Objective::Minimize,
        &[-1_f64, -1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[(f64::NEG_INFINITY, vec![1_f64, 1_f64], 10_f64)],
    );
    let mut solver = Solver::new(&program);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));

    // A cheaper column in the same row
    solver.add_columns(&[-2_f64], &[0_f64], &[f64::INFINITY], vec![vec![(0, 1_f64)]]).unwrap();
    assert_eq!(solver.status(), ModelStatus::NotSet);
    assert_eq!(solver.basis().unwrap().col_status.len(), 3);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    let solution = solver.solution().unwrap();
    assert_abs_diff_eq!(solution.objective_value, -20_f64, epsilon = 1e-9);
    assert_abs_diff_eq!(solution.col_value[2], 10_f64, epsilon = 1e-9);
    assert_matches_cold_start(&solver);

    // Limit the new column
    solver.add_rows(&[f64::NEG_INFINITY], &[4_f64], vec![vec![(2, 1_f64)]]).unwrap();
    assert_eq!(solver.basis().unwrap().row_status.len(), 2);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().objective_value, -14_f64, epsilon = 1e-9);
    assert_matches_cold_start(&solver);

    solver.change_row_bounds(1, f64::NEG_INFINITY, 8_f64).unwrap();
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().objective_value, -18_f64, epsilon = 1e-9);

    solver.delete_columns(&[2]).unwrap();
    assert_eq!(solver.program().nr_columns(), 2);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().objective_value, -10_f64, epsilon = 1e-9);
    assert_matches_cold_start(&solver);

    // Without the only row that bounds the columns
    solver.delete_rows(&[0, 0]).unwrap();
    assert_eq!(solver.program().nr_rows(), 1);
    assert_eq!(solver.solve(), Ok(ModelStatus::Unbounded));
    assert_eq!(solver.primal_ray().map(|ray| ray.len()), Some(2));
    assert_matches_cold_start(&solver);

    // The original program is untouched
    assert_eq!(program.nr_columns(), 2);
    assert_eq!(program.nr_rows(), 1);
}

#[test]
fn change() {
    init();
    let program = program(
        Objective::Minimize,
        &[-1_f64, -1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[(f64::NEG_INFINITY, vec![1_f64, 1_f64], 10_f64)],
    );
    let mut solver = Solver::new(&program);
    solver.solve().unwrap();

    solver.change_cost(1, 0_f64).unwrap();
    solver.change_column_bounds(0, 0_f64, 3_f64).unwrap();
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().objective_value, -3_f64, epsilon = 1e-9);
    assert_matches_cold_start(&solver);

    solver.change_coefficient(0, 0, 5_f64).unwrap();
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().col_value[0], 2_f64, epsilon = 1e-9);
    assert_matches_cold_start(&solver);

    // Crossing bounds through a modification is allowed, and infeasible
    solver.change_row_bounds(0, 11_f64, 10_f64).unwrap();
    assert_eq!(solver.solve(), Ok(ModelStatus::Infeasible));
}

#[test]
fn rejected() {
    init();
    let program = program(
        Objective::Minimize,
        &[1_f64],
        &[(0_f64, 1_f64)],
        &[(0_f64, vec![1_f64], 1_f64)],
    );
    let mut solver = Solver::new(&program);

    assert!(matches!(
        solver.add_columns(&[1_f64], &[0_f64, 0_f64], &[1_f64], vec![vec![]]),
        Err(Error::Dimension { .. }),
    ));
    assert!(matches!(
        solver.add_rows(&[0_f64], &[1_f64], vec![vec![(3, 1_f64)]]),
        Err(Error::IndexOutOfRange { .. }),
    ));
    assert!(matches!(solver.delete_rows(&[1]), Err(Error::IndexOutOfRange { .. })));
    assert!(matches!(solver.change_cost(0, f64::NAN), Err(Error::InvalidValue { .. })));
    assert_eq!(solver.program(), &program);
}
