//! Small programs with a known outcome, solved through the public interface.
use std::sync::atomic::Ordering;

use approx::assert_abs_diff_eq;

use relp_simplex::algorithm::{ModelStatus, Solver};
use relp_simplex::algorithm::simplex::options::{Algorithm, DualEdgeWeightStrategy, Options};
use relp_simplex::algorithm::simplex::ray::{farkas_gap, is_primal_ray};
use relp_simplex::data::linear_algebra::matrix::ColumnMatrix;
use relp_simplex::data::linear_program::LinearProgram;
use relp_simplex::data::linear_program::elements::Objective;
use relp_simplex::data::linear_program::solution::{Basis, BasisStatus};
use relp_simplex::error::Error;

use crate::{covering, init, program};

const METHODS: [Algorithm; 3] = [Algorithm::Dual, Algorithm::Primal, Algorithm::Choose];

#[test]
fn trivial() {
    init();
    let program = program(
        Objective::Minimize,
        &[-1_f64, -1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[(f64::NEG_INFINITY, vec![1_f64, 1_f64], 10_f64)],
    );

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        let solution = solver.solution().unwrap();
        assert_abs_diff_eq!(solution.objective_value, -10_f64, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.row_value[0], 10_f64, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.row_dual[0], -1_f64, epsilon = 1e-9);
        assert_eq!(solver.basis().unwrap().row_status, vec![BasisStatus::Upper]);
    }
}

#[test]
fn maximize() {
    init();
    let program = program(
        Objective::Maximize,
        &[1_f64, 1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[
            (f64::NEG_INFINITY, vec![1_f64, 2_f64], 4_f64),
            (f64::NEG_INFINITY, vec![3_f64, 1_f64], 6_f64),
        ],
    );

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        let solution = solver.solution().unwrap();
        assert_abs_diff_eq!(solution.objective_value, 2.8, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.col_value[0], 1.6, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.col_value[1], 1.2, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.row_dual[0], 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.row_dual[1], 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.col_dual[0], 0_f64, epsilon = 1e-9);
    }
}

#[test]
fn infeasible() {
    init();
    // x <= 1 and x >= 2
    let program = program(
        Objective::Minimize,
        &[1_f64],
        &[(0_f64, f64::INFINITY)],
        &[
            (f64::NEG_INFINITY, vec![1_f64], 1_f64),
            (2_f64, vec![1_f64], f64::INFINITY),
        ],
    );

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Infeasible));
        assert_eq!(solver.primal_ray(), None);
        let ray = solver.dual_ray().unwrap();
        assert_eq!(ray.len(), 2);
        assert!(ray[0].abs() > 1e-9 && ray[1].abs() > 1e-9);
        assert!(farkas_gap(&program, &ray, 1e-9) < 0_f64);
    }
}

#[test]
fn crossed_bounds() {
    init();
    let program = program(
        Objective::Minimize,
        &[1_f64],
        &[(3_f64, 2_f64)],
        &[(f64::NEG_INFINITY, vec![1_f64], 10_f64)],
    );

    let mut solver = Solver::new(&program);
    assert_eq!(solver.solve(), Ok(ModelStatus::Infeasible));
    assert_eq!(solver.iteration_count(), 0);
}

#[test]
fn unbounded() {
    init();
    // min -x, x >= 0, with a row that doesn't bound x from above
    let program = program(
        Objective::Minimize,
        &[-1_f64],
        &[(0_f64, f64::INFINITY)],
        &[(-5_f64, vec![1_f64], f64::INFINITY)],
    );

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Unbounded));
        assert_eq!(solver.dual_ray(), None);
        let ray = solver.primal_ray().unwrap();
        assert_eq!(ray.len(), 1);
        assert_abs_diff_eq!(ray[0] / ray[0].abs(), 1_f64);
        assert!(is_primal_ray(&program, &ray, 1e-9));
    }
}

#[test]
fn unbounded_without_rows() {
    init();
    let program = LinearProgram::new(
        Objective::Minimize,
        vec![-1_f64],
        vec![0_f64],
        vec![f64::INFINITY],
        Vec::new(),
        Vec::new(),
        ColumnMatrix::zeros(0, 1),
    ).unwrap();

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Unbounded));
        assert_eq!(solver.primal_ray(), Some(vec![1_f64]));
    }
}

/// Beale's example, on which the textbook simplex method cycles.
#[test]
fn beale() {
    init();
    let program = program(
        Objective::Minimize,
        &[-0.75, 20_f64, -0.5, 6_f64],
        &[(0_f64, f64::INFINITY); 4],
        &[
            (f64::NEG_INFINITY, vec![0.25, -8_f64, -1_f64, 9_f64], 0_f64),
            (f64::NEG_INFINITY, vec![0.5, -12_f64, -0.5, 3_f64], 0_f64),
            (f64::NEG_INFINITY, vec![0_f64, 0_f64, 1_f64, 0_f64], 1_f64),
        ],
    );

    for algorithm in METHODS {
        let mut solver = Solver::with_options(&program, Options { algorithm, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        assert_abs_diff_eq!(solver.solution().unwrap().objective_value, -1.25, epsilon = 1e-9);
        assert!(solver.iteration_count() < 100);
    }
}

/// Feasible in a single point, where the dual ratio test meets a breakpoint at which flipping
/// removes the infeasibility exactly.
#[test]
fn degenerate_breakpoint() {
    init();
    let program = program(
        Objective::Minimize,
        &[1_f64, 0_f64, 3_f64, 1_f64, -2_f64],
        &[
            (0_f64, f64::INFINITY),
            (f64::NEG_INFINITY, 1_f64),
            (-3_f64, -3_f64),
            (-4_f64, -1_f64),
            (f64::NEG_INFINITY, -4_f64),
        ],
        &[
            (-2_f64, vec![0_f64, -2_f64, 0_f64, 0_f64, 3_f64], f64::INFINITY),
            (-3_f64, vec![0_f64, 3_f64, -4_f64, 0_f64, 0_f64], -1_f64),
        ],
    );

    let mut configurations = METHODS.map(|algorithm| Options { algorithm, ..Options::default() }).to_vec();
    configurations.push(Options { dual_edge_weight_strategy: DualEdgeWeightStrategy::Devex, ..Options::default() });
    for options in configurations {
        let mut solver = Solver::with_options(&program, options);
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        let solution = solver.solution().unwrap();
        assert_abs_diff_eq!(solution.objective_value, -5_f64, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.col_value[1], -5_f64, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.col_value[4], -4_f64, epsilon = 1e-9);
    }
}

#[test]
fn resolve_is_idempotent() {
    init();
    let program = covering();
    let mut solver = Solver::new(&program);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    let first = solver.solution().unwrap().clone();
    assert!(solver.iteration_count() > 0);

    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_eq!(solver.iteration_count(), 0);
    assert!(solver.solution().unwrap().max_primal_difference(&first) < 1e-12);
}

#[test]
fn basis_solves() {
    init();
    let program = covering();
    let mut solver = Solver::new(&program);
    solver.solve().unwrap();
    let basic = solver.basic_variables();
    let nr_columns = program.nr_columns();
    let column = |variable: usize| -> Vec<f64> {
        (0..program.nr_rows())
            .map(|i| match variable < nr_columns {
                true => program.matrix().get(i, variable),
                false if i == variable - nr_columns => 1_f64,
                false => 0_f64,
            })
            .collect()
    };

    for (position, &variable) in basic.iter().enumerate() {
        // The transformed basic column is a unit vector
        let x = solver.ftran(&column(variable)).unwrap();
        for (p, value) in x.into_iter().enumerate() {
            assert_abs_diff_eq!(value, if p == position { 1_f64 } else { 0_f64 }, epsilon = 1e-12);
        }

        // Row `position` of the inverse times the basis matrix
        let mut unit = vec![0_f64; basic.len()];
        unit[position] = 1_f64;
        let y = solver.btran(&unit).unwrap();
        for (p, &other) in basic.iter().enumerate() {
            let product = column(other).iter().zip(&y).map(|(a, b)| a * b).sum::<f64>();
            assert_abs_diff_eq!(product, unit[p], epsilon = 1e-12);
        }
    }

    assert!(matches!(solver.btran(&[1_f64]), Err(Error::Dimension { .. })));
}

#[test]
fn limits() {
    init();
    let program = covering();

    let mut solver = Solver::with_options(&program, Options { iteration_limit: 0, ..Options::default() });
    assert_eq!(solver.solve(), Ok(ModelStatus::IterationLimit));
    assert!(solver.solution().is_some());

    let mut solver = Solver::new(&program);
    solver.interrupt_handle().store(true, Ordering::Relaxed);
    assert_eq!(solver.solve(), Ok(ModelStatus::Interrupt));
    solver.interrupt_handle().store(false, Ordering::Relaxed);
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
}

#[test]
fn singular_basis_is_repaired() {
    init();
    // Parallel columns
    let program = program(
        Objective::Minimize,
        &[1_f64, 1_f64],
        &[(0_f64, f64::INFINITY); 2],
        &[
            (2_f64, vec![1_f64, 2_f64], f64::INFINITY),
            (4_f64, vec![2_f64, 4_f64], f64::INFINITY),
        ],
    );

    let mut solver = Solver::new(&program);
    solver.set_basis(Basis {
        col_status: vec![BasisStatus::Basic; 2],
        row_status: vec![BasisStatus::Lower; 2],
    }).unwrap();
    assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
    assert_abs_diff_eq!(solver.solution().unwrap().objective_value, 1_f64, epsilon = 1e-9);
    assert!(solver.statistics().rank_deficiencies > 0);
}
