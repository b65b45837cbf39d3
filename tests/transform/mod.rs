//! Solving through the dual program or with permuted columns gives the same results as solving
//! directly.
use approx::assert_abs_diff_eq;

use relp_simplex::algorithm::{ModelStatus, Solver};
use relp_simplex::algorithm::simplex::options::{DualizeStrategy, Options};
use relp_simplex::data::linear_program::LinearProgram;
use relp_simplex::data::linear_program::elements::Objective;
use relp_simplex::data::linear_program::solution::Solution;

use crate::{covering, init, program};

fn solve(program: &LinearProgram, options: Options) -> (ModelStatus, Option<Solution>) {
    let mut solver = Solver::with_options(program, options);
    let status = solver.solve().unwrap();
    (status, solver.solution().cloned())
}

fn ranged() -> LinearProgram {
    program(
        Objective::Maximize,
        &[3_f64, 2_f64, -1_f64],
        &[(0_f64, 4_f64), (f64::NEG_INFINITY, f64::INFINITY), (1_f64, f64::INFINITY)],
        &[
            (f64::NEG_INFINITY, vec![1_f64, 1_f64, 0_f64], 6_f64),
            (-2_f64, vec![1_f64, -1_f64, 1_f64], 3_f64),
            (0_f64, vec![0_f64, 1_f64, 1_f64], 5_f64),
            (2_f64, vec![1_f64, 0_f64, 1_f64], f64::INFINITY),
        ],
    )
}

#[test]
fn dualized() {
    init();
    for program in [covering(), ranged()] {
        let (status, direct) = solve(&program, Options::default());
        assert_eq!(status, ModelStatus::Optimal);
        let direct = direct.unwrap();

        for dualize in [DualizeStrategy::On, DualizeStrategy::Choose] {
            let options = Options { dualize, dualize_ratio: 1_f64, ..Options::default() };
            let (status, solution) = solve(&program, options);
            assert_eq!(status, ModelStatus::Optimal);
            let solution = solution.unwrap();
            assert_abs_diff_eq!(solution.objective_value, direct.objective_value, epsilon = 1e-9);
            assert!(solution.max_primal_difference(&direct) < 1e-8);
        }
    }

    let (_, solution) = solve(&covering(), Options { dualize: DualizeStrategy::On, ..Options::default() });
    let solution = solution.unwrap();
    assert_abs_diff_eq!(solution.row_dual[0], 1_f64 / 3_f64, epsilon = 1e-9);
    assert_abs_diff_eq!(solution.row_dual[1], 1_f64 / 3_f64, epsilon = 1e-9);
    assert_abs_diff_eq!(solution.row_dual[2], 0_f64, epsilon = 1e-9);
}

#[test]
fn dualized_unbounded() {
    init();
    let program = program(
        Objective::Minimize,
        &[-1_f64],
        &[(0_f64, f64::INFINITY)],
        &[(-5_f64, vec![1_f64], f64::INFINITY)],
    );
    let (status, _) = solve(&program, Options { dualize: DualizeStrategy::On, ..Options::default() });
    assert_eq!(status, ModelStatus::UnboundedOrInfeasible);
}

#[test]
fn permuted() {
    init();
    for program in [covering(), ranged()] {
        let (_, direct) = solve(&program, Options::default());
        let direct = direct.unwrap();

        for random_seed in 0..4 {
            let (status, solution) = solve(&program, Options { permute: true, random_seed, ..Options::default() });
            assert_eq!(status, ModelStatus::Optimal);
            let solution = solution.unwrap();
            assert_abs_diff_eq!(solution.objective_value, direct.objective_value, epsilon = 1e-9);
            assert!(solution.max_primal_difference(&direct) < 1e-8);
        }
    }
}

#[test]
fn permuted_ray() {
    init();
    // Only the second column is unbounded
    let program = program(
        Objective::Minimize,
        &[1_f64, -1_f64, 0_f64],
        &[(0_f64, f64::INFINITY); 3],
        &[(f64::NEG_INFINITY, vec![1_f64, 0_f64, 1_f64], 4_f64)],
    );

    for random_seed in 0..4 {
        let mut solver = Solver::with_options(&program, Options { permute: true, random_seed, ..Options::default() });
        assert_eq!(solver.solve(), Ok(ModelStatus::Unbounded));
        let ray = solver.primal_ray().unwrap();
        assert!(ray[1] > 0_f64);
        assert!(relp_simplex::algorithm::simplex::ray::is_primal_ray(&program, &ray, 1e-9));
    }
}
