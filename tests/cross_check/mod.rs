//! Random small programs solved in every way the solver offers. All ways should agree on the
//! status and the objective value, and every certificate should check out.
use approx::assert_abs_diff_eq;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use relp_simplex::algorithm::{ModelStatus, Solver};
use relp_simplex::algorithm::simplex::options::{Algorithm, DualEdgeWeightStrategy, DualizeStrategy, Options};
use relp_simplex::algorithm::simplex::ray::{farkas_gap, is_primal_ray};
use relp_simplex::data::linear_program::LinearProgram;
use relp_simplex::data::linear_program::elements::Objective;

use crate::{init, program};

const NR_PROGRAMS: u64 = 100;

fn configurations() -> Vec<Options> {
    vec![
        Options { algorithm: Algorithm::Dual, ..Options::default() },
        Options { algorithm: Algorithm::Dual, dual_edge_weight_strategy: DualEdgeWeightStrategy::Devex, ..Options::default() },
        Options { algorithm: Algorithm::Primal, ..Options::default() },
        Options { dualize: DualizeStrategy::On, ..Options::default() },
        Options { permute: true, ..Options::default() },
    ]
}

fn objective(rng: &mut StdRng) -> Objective {
    if rng.gen_bool(0.5) { Objective::Minimize } else { Objective::Maximize }
}

fn coefficients(rng: &mut StdRng, nr_rows: usize, nr_columns: usize) -> Vec<Vec<f64>> {
    (0..nr_rows)
        .map(|_| (0..nr_columns)
            .map(|_| if rng.gen_bool(0.4) { 0_f64 } else { rng.gen_range(-3..=3) as f64 })
            .collect())
        .collect()
}

/// Row bounds of one of the four kinds around `center`.
fn row_bounds(rng: &mut StdRng, center: f64) -> (f64, f64) {
    let width = rng.gen_range(0..=4) as f64;
    match rng.gen_range(0..4) {
        0 => (center, f64::INFINITY),
        1 => (f64::NEG_INFINITY, center),
        2 => (center, center),
        _ => (center - width, center),
    }
}

/// All columns are boxed, so the program is either infeasible or has an optimum.
fn boxed(rng: &mut StdRng) -> LinearProgram {
    let nr_columns = rng.gen_range(2..=5);
    let nr_rows = rng.gen_range(1..=4);

    let cost = (0..nr_columns).map(|_| rng.gen_range(-3..=3) as f64).collect::<Vec<_>>();
    let bounds = (0..nr_columns)
        .map(|_| {
            let lower = rng.gen_range(-5..=0) as f64;
            (lower, lower + rng.gen_range(0..=6) as f64)
        })
        .collect::<Vec<_>>();
    let rows = coefficients(rng, nr_rows, nr_columns).into_iter()
        .map(|row| {
            let center = rng.gen_range(-6..=6) as f64;
            let (lower, upper) = row_bounds(rng, center);
            (lower, row, upper)
        })
        .collect::<Vec<_>>();

    program(objective(rng), &cost, &bounds, &rows)
}

/// Columns have at most one finite bound, and the rows are built around a feasible point, so
/// the program is either unbounded or has an optimum.
fn feasible(rng: &mut StdRng) -> LinearProgram {
    let nr_columns = rng.gen_range(2..=5);
    let nr_rows = rng.gen_range(1..=4);

    let cost = (0..nr_columns).map(|_| rng.gen_range(-3..=3) as f64).collect::<Vec<_>>();
    let bounds = (0..nr_columns)
        .map(|_| match rng.gen_range(0..3) {
            0 => (0_f64, f64::INFINITY),
            1 => (f64::NEG_INFINITY, 0_f64),
            _ => (f64::NEG_INFINITY, f64::INFINITY),
        })
        .collect::<Vec<_>>();
    let point = bounds.iter()
        .map(|&(lower, upper)| {
            let size = rng.gen_range(0..=3) as f64;
            if lower.is_finite() { size } else if upper.is_finite() { -size } else { size - 1_f64 }
        })
        .collect::<Vec<_>>();
    let rows = coefficients(rng, nr_rows, nr_columns).into_iter()
        .map(|row| {
            let activity = row.iter().zip(&point).map(|(a, x)| a * x).sum::<f64>();
            let (lower, upper) = row_bounds(rng, activity);
            // Shift ranged rows such that the point stays inside
            let shift = if lower.is_finite() && upper.is_finite() && lower < upper {
                rng.gen_range(0..=(upper - lower) as i32) as f64
            } else {
                0_f64
            };
            (lower + shift, row, upper + shift)
        })
        .collect::<Vec<_>>();

    program(objective(rng), &cost, &bounds, &rows)
}

/// Solve in every configuration and compare against the first one.
fn check(seed: u64, program: &LinearProgram) {
    let mut reference = None;
    for options in configurations() {
        let dualize = options.dualize == DualizeStrategy::On;
        let mut solver = Solver::with_options(program, options);
        let status = solver.solve().unwrap();

        match status {
            ModelStatus::Optimal => {
                let value = solver.solution().unwrap().objective_value;
                match reference {
                    None => reference = Some((status, value)),
                    Some((expected, expected_value)) => {
                        assert_eq!(status, expected, "seed {}", seed);
                        assert_abs_diff_eq!(value, expected_value, epsilon = 1e-6);
                    },
                }
            },
            ModelStatus::Infeasible => {
                let ray = solver.dual_ray().unwrap_or_else(|| panic!("seed {}: no dual ray", seed));
                assert!(farkas_gap(program, &ray, 1e-9) < 0_f64, "seed {}: {:?}", seed, ray);
                match reference {
                    None => reference = Some((status, 0_f64)),
                    Some((expected, _)) => assert_eq!(status, expected, "seed {}", seed),
                }
            },
            ModelStatus::Unbounded => {
                let ray = solver.primal_ray().unwrap_or_else(|| panic!("seed {}: no primal ray", seed));
                assert!(is_primal_ray(program, &ray, 1e-7), "seed {}: {:?}", seed, ray);
                match reference {
                    None => reference = Some((status, 0_f64)),
                    Some((expected, _)) => assert_eq!(status, expected, "seed {}", seed),
                }
            },
            // The dual of an unbounded program is infeasible
            ModelStatus::UnboundedOrInfeasible if dualize => {
                assert!(matches!(reference, Some((ModelStatus::Unbounded, _))), "seed {}", seed);
            },
            other => panic!("seed {}: unexpected status {}", seed, other),
        }
    }
}

#[test]
fn boxed_programs() {
    init();
    for seed in 0..NR_PROGRAMS {
        let mut rng = StdRng::seed_from_u64(seed);
        let program = boxed(&mut rng);
        check(seed, &program);
    }
}

#[test]
fn feasible_programs() {
    init();
    for seed in 0..NR_PROGRAMS {
        let mut rng = StdRng::seed_from_u64(seed);
        let program = feasible(&mut rng);
        check(seed, &program);
    }
}
