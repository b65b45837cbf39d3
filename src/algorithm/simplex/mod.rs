//! # The Simplex algorithm
//!
//! A bounded revised simplex engine. The primal and dual methods share a `State`; the driver in
//! this module decides which one runs, switches between them when one of them can't finish the
//! job and checks the outcome before reporting it.
use log::{debug, info, warn};

use crate::algorithm::simplex::dual::dual;
use crate::algorithm::simplex::options::Algorithm;
use crate::algorithm::simplex::primal::primal;
use crate::algorithm::simplex::state::{Singular, State};
use crate::algorithm::simplex::status::{ModelStatus, Outcome, RebuildReason};

pub mod basis;
mod dual;
pub mod factor;
pub mod options;
pub mod pricing;
mod primal;
pub mod ray;
pub mod state;
pub mod status;
pub mod taboo;

/// Number of times the driver may hand over from one method to the other in a single solve.
const MAX_SWITCHES: usize = 6;

/// Solve from the current basis of the state.
///
/// `State::begin_solve` should be called first.
pub fn solve(state: &mut State) -> ModelStatus {
    if state.has_crossed_bounds() {
        info!("A lower bound exceeds its upper bound");
        return finish(state, ModelStatus::Infeasible);
    }
    if rebuild(state, RebuildReason::Initial).is_err() {
        return finish(state, ModelStatus::SolveError);
    }
    if state.is_optimal() {
        debug!("Starting basis is optimal");
        return finish(state, ModelStatus::Optimal);
    }

    let mut algorithm = match state.options().algorithm {
        Algorithm::Choose if state.has_primal_infeasibility() => Algorithm::Dual,
        Algorithm::Choose => Algorithm::Primal,
        algorithm => algorithm,
    };
    let mut escalated = false;
    let mut switches = 0;

    let status = loop {
        let outcome = match algorithm {
            Algorithm::Primal => primal(state),
            Algorithm::Dual | Algorithm::Choose => dual(state),
        };
        debug!("{:?} simplex method stopped: {:?}", algorithm, outcome);

        let next = match outcome {
            Outcome::Optimal => {
                if state.is_perturbed() {
                    state.remove_perturbations();
                    if rebuild(state, RebuildReason::CleanUp).is_err() {
                        break ModelStatus::SolveError;
                    }
                }
                state.compute_infeasibilities();
                if state.is_optimal() {
                    break ModelStatus::Optimal;
                }
                if state.dual_infeasibilities().count > 0 {
                    Algorithm::Primal
                } else {
                    Algorithm::Dual
                }
            },
            Outcome::Infeasible => {
                // With perturbed bounds, a proof for the widened bounds is also one for the original
                state.materialize_dual_ray();
                break ModelStatus::Infeasible;
            },
            Outcome::Unproven => match algorithm {
                Algorithm::Primal => Algorithm::Dual,
                Algorithm::Dual | Algorithm::Choose => Algorithm::Primal,
            },
            Outcome::Unbounded => {
                if !state.is_perturbed() {
                    break ModelStatus::Unbounded;
                }
                state.remove_perturbations();
                if rebuild(state, RebuildReason::CleanUp).is_err() {
                    break ModelStatus::SolveError;
                }
                Algorithm::Primal
            },
            Outcome::DualInfeasible => Algorithm::Primal,
            Outcome::Cycling => {
                if escalated {
                    warn!("Cycling persists after perturbation");
                    break ModelStatus::Unknown;
                }
                escalated = true;
                escalate(state, algorithm);
                algorithm
            },
            Outcome::Stopped(status) => break status,
        };

        switches += 1;
        if switches > MAX_SWITCHES {
            warn!("Giving up after {} switches between the simplex methods", switches);
            break match outcome {
                Outcome::DualInfeasible => ModelStatus::UnboundedOrInfeasible,
                _ => ModelStatus::Unknown,
            };
        }
        if next != algorithm {
            debug!("Switching from the {:?} to the {:?} simplex method", algorithm, next);
        }
        algorithm = next;
    };

    if state.is_perturbed() {
        // Report values in terms of the original costs and bounds
        state.remove_perturbations();
        if state.status().has_invert() {
            state.refresh();
        }
    }

    finish(state, status)
}

/// Perturb the problem to break a cycle, and forget the visited bases.
fn escalate(state: &mut State, algorithm: Algorithm) {
    match algorithm {
        Algorithm::Primal => state.perturb_bounds(),
        Algorithm::Dual | Algorithm::Choose => state.perturb_costs(),
    }
    state.reset_cycle_history();
    state.refresh();
}

fn finish(state: &State, status: ModelStatus) -> ModelStatus {
    let statistics = state.statistics();
    info!(
        "Simplex solve finished with status \"{}\" after {} iterations and {} factorizations, objective {:.10e}",
        status, statistics.iterations, statistics.factorizations, state.objective_value(),
    );

    status
}

/// Rebuild, treating an unrepairable basis as a solve error.
pub(crate) fn rebuild(state: &mut State, reason: RebuildReason) -> Result<(), Outcome> {
    state.rebuild(reason).map_err(|Singular| Outcome::Stopped(ModelStatus::SolveError))
}

/// Whether the pivot computed from the transformed column and from the tableau row differ too
/// much, relative to the smallest of the two.
pub(crate) fn is_numerical_trouble(alpha_column: f64, alpha_row: f64, tolerance: f64) -> bool {
    let smallest = alpha_column.abs().min(alpha_row.abs());

    smallest == 0_f64 || (alpha_column - alpha_row).abs() / smallest > tolerance
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::algorithm::simplex::{is_numerical_trouble, solve};
    use crate::algorithm::simplex::options::{Algorithm, Options};
    use crate::algorithm::simplex::state::State;
    use crate::algorithm::simplex::status::ModelStatus;

    fn solve_with(options: Options, interrupt: bool) -> (State, ModelStatus) {
        let program = crate::tests::problem_2::create();
        let mut state = State::new(&program, options.clone(), Arc::new(AtomicBool::new(interrupt)));
        state.begin_solve(options);
        let status = solve(&mut state);
        (state, status)
    }

    #[test]
    fn trouble() {
        assert!(!is_numerical_trouble(1_f64, 1_f64 + 1e-12, 1e-7));
        assert!(is_numerical_trouble(1_f64, 1.1, 1e-7));
        assert!(is_numerical_trouble(0_f64, 1_f64, 1e-7));
    }

    #[test]
    fn both_methods() {
        for algorithm in [Algorithm::Dual, Algorithm::Primal, Algorithm::Choose] {
            let (state, status) = solve_with(Options { algorithm, ..Options::default() }, false);
            assert_eq!(status, ModelStatus::Optimal);
            assert!((state.solution().objective_value - crate::tests::problem_2::OBJECTIVE).abs() < 1e-8);
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        let (mut state, status) = solve_with(Options::default(), false);
        assert_eq!(status, ModelStatus::Optimal);
        assert!(state.statistics().iterations > 0);

        state.begin_solve(Options::default());
        assert_eq!(solve(&mut state), ModelStatus::Optimal);
        assert_eq!(state.statistics().iterations, 0);
    }

    #[test]
    fn limits() {
        let (_, status) = solve_with(Options { iteration_limit: 0, ..Options::default() }, false);
        assert_eq!(status, ModelStatus::IterationLimit);

        let (state, status) = solve_with(Options::default(), true);
        assert_eq!(status, ModelStatus::Interrupt);
        assert_eq!(state.statistics().iterations, 0);
    }

    #[test]
    fn perturbed_costs() {
        let options = Options { perturb_costs: true, ..Options::default() };
        let (state, status) = solve_with(options, false);
        assert_eq!(status, ModelStatus::Optimal);
        assert!(!state.is_perturbed());
        assert!((state.solution().objective_value - crate::tests::problem_2::OBJECTIVE).abs() < 1e-8);
    }

    #[test]
    fn stopped_solve_is_unperturbed() {
        let options = Options { perturb_costs: true, iteration_limit: 0, ..Options::default() };
        let (state, status) = solve_with(options, false);
        assert_eq!(status, ModelStatus::IterationLimit);
        assert_eq!(state.statistics().perturbations, 1);
        assert!(!state.is_perturbed());

        let program = crate::tests::problem_2::create();
        let solution = state.solution();
        let objective = program.col_cost().iter().zip(&solution.col_value)
            .map(|(c, x)| c * x)
            .sum::<f64>() + program.offset();
        assert!((solution.objective_value - objective).abs() < 1e-12);
    }

    #[test]
    fn cycling_is_broken_by_perturbation() {
        let options = Options { cycling_escalation_limit: 1, ..Options::default() };
        let program = crate::tests::problem_2::create();
        let mut state = State::new(&program, options.clone(), Arc::new(AtomicBool::new(false)));
        state.begin_solve(options);
        // The first basis change revisits a basis
        state.visit_neighbours();

        assert_eq!(solve(&mut state), ModelStatus::Optimal);
        assert_eq!(state.statistics().perturbations, 1);
        assert!(state.statistics().bad_basis_changes > 0);
        assert!(!state.is_perturbed());
        assert!((state.solution().objective_value - crate::tests::problem_2::OBJECTIVE).abs() < 1e-8);
    }

    #[test]
    fn cycling_persists() {
        let options = Options { cycling_escalation_limit: 3, ..Options::default() };
        let program = crate::tests::problem_2::create();
        let mut state = State::new(&program, options.clone(), Arc::new(AtomicBool::new(false)));
        state.begin_solve(options);
        // Every basis change revisits a basis
        state.collide_basis_hashes();

        assert_eq!(solve(&mut state), ModelStatus::Unknown);
        assert_eq!(state.statistics().perturbations, 1);
        assert!(state.cycles() >= 3);
        assert_eq!(state.statistics().iterations, 0);
        assert!(!state.is_perturbed());
    }

    #[test]
    fn interrupt_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let program = crate::tests::problem_2::create();
        let state = State::new(&program, Options::default(), Arc::clone(&flag));
        flag.store(true, Ordering::Relaxed);
        assert_eq!(state.check_limits(), Some(ModelStatus::Interrupt));
    }
}
