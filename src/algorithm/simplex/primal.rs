//! # Primal simplex method
//!
//! Keeps the basic variables within their bounds and removes dual infeasibilities one column at
//! a time. While some basic variables are infeasible, the sum of infeasibilities is minimized
//! instead, with costs that are recomputed every iteration.
use log::{debug, trace, warn};

use crate::algorithm::simplex::{is_numerical_trouble, rebuild};
use crate::algorithm::simplex::basis::Move;
use crate::algorithm::simplex::options::PrimalEdgeWeightStrategy;
use crate::algorithm::simplex::state::State;
use crate::algorithm::simplex::status::{ModelStatus, Outcome, Phase, RebuildReason};
use crate::algorithm::simplex::taboo::BadBasisChangeKind;
use crate::data::linear_algebra::vector::WorkVector;

/// Run the primal simplex method from the current basis.
///
/// The values in the state should be fresh.
pub(crate) fn primal(state: &mut State) -> Outcome {
    PrimalSimplex::new(state).solve()
}

/// Result of the primal ratio test.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Step {
    /// The entering variable reaches its other bound first.
    Flip,
    /// A basic variable reaches a bound first.
    Pivot {
        row_out: usize,
        /// Change of the value of the entering variable.
        theta: f64,
        move_out: Move,
    },
    /// Nothing limits the step.
    Unbounded,
}

struct PrimalSimplex<'a> {
    state: &'a mut State,
    /// Reduced costs of the phase one objective, only valid in phase one.
    phase_one_dual: Vec<f64>,
    aq: WorkVector,
    row_ep: WorkVector,
    row_ap: WorkVector,
    numerical_failures: usize,
}

impl<'a> PrimalSimplex<'a> {
    fn new(state: &'a mut State) -> Self {
        let m = state.nr_rows();
        let nr_total = state.nr_total();

        Self {
            state,
            phase_one_dual: vec![0_f64; nr_total],
            aq: WorkVector::new(m),
            row_ep: WorkVector::new(m),
            row_ap: WorkVector::new(nr_total),
            numerical_failures: 0,
        }
    }

    fn solve(&mut self) -> Outcome {
        self.state.reset_primal_weights();
        let mut last_phase = None;

        loop {
            if let Some(status) = self.state.check_limits() {
                break Outcome::Stopped(status);
            }
            if self.state.should_refactor() {
                if let Err(outcome) = rebuild(self.state, RebuildReason::UpdateLimitReached) {
                    break outcome;
                }
            }

            let phase = if self.state.has_primal_infeasibility() { Phase::One } else { Phase::Two };
            if last_phase != Some(phase) {
                debug!("Primal simplex phase {:?} from iteration {}", phase, self.state.statistics().iterations);
                last_phase = Some(phase);
            }
            if phase == Phase::One {
                self.compute_phase_one_dual();
            }

            let Some((variable_in, direction)) = self.choose_column(phase) else {
                if let Some(outcome) = self.no_entering_candidate(phase) {
                    break outcome;
                }
                continue;
            };

            self.state.ftran_column(variable_in, &mut self.aq);
            let step = self.choose_row(phase, variable_in, direction);
            trace!("Variable {} enters in direction {}: {:?}", variable_in, direction, step);

            match step {
                Step::Unbounded => {
                    if self.state.status().has_fresh_invert() {
                        if phase == Phase::Two {
                            debug!("Primal ratio test found no bound for variable {}", variable_in);
                            self.state.record_primal_ray(variable_in, direction);
                            break Outcome::Unbounded;
                        }
                        warn!("Unbounded step while minimizing infeasibilities");
                        break Outcome::Stopped(ModelStatus::Unknown);
                    }
                    if let Err(outcome) = rebuild(self.state, RebuildReason::PossiblyPrimalUnbounded) {
                        break outcome;
                    }
                },
                Step::Flip => {
                    self.state.flip_bound(variable_in);
                    self.state.statistics_mut().iterations += 1;
                },
                Step::Pivot { row_out, theta, move_out } => {
                    if let Some(outcome) = self.pivot(phase, variable_in, row_out, theta, move_out) {
                        break outcome;
                    }
                },
            }
        }
    }

    /// Decide what it means that no variable can enter.
    ///
    /// Returns `None` when the search should continue.
    fn no_entering_candidate(&mut self, phase: Phase) -> Option<Outcome> {
        if !self.state.taboo().is_empty() && self.has_taboo_candidate(phase) {
            self.state.clear_taboo();
            return rebuild(self.state, RebuildReason::ChooseColumnFail).err();
        }
        if !self.state.status().has_fresh_invert() {
            return rebuild(self.state, RebuildReason::PossiblyOptimal).err();
        }

        match phase {
            Phase::One => {
                debug!("No improving direction with {} primal infeasibilities", self.state.primal_infeasibilities().count);
                self.state.record_phase_one_ray();
                if self.state.proves_infeasibility() {
                    return Some(Outcome::Infeasible);
                }
                warn!("Dual ray of the first phase is not a certificate of infeasibility");
                self.state.clear_ray();
                Some(Outcome::Unproven)
            },
            Phase::Two => Some(Outcome::Optimal),
        }
    }

    /// Perform a basis change.
    fn pivot(
        &mut self,
        phase: Phase,
        variable_in: usize,
        row_out: usize,
        theta: f64,
        move_out: Move,
    ) -> Option<Outcome> {
        if self.state.is_bad_basis_change(variable_in, row_out) {
            if self.state.cycles() >= self.state.options().cycling_escalation_limit {
                return Some(Outcome::Cycling);
            }
            return None;
        }

        self.state.unit_btran(row_out, &mut self.row_ep);
        self.state.tableau_row(&self.row_ep, &mut self.row_ap);
        let alpha_column = self.aq.get(row_out);
        let alpha_row = self.row_ap.get(variable_in);
        let options = self.state.options();
        if is_numerical_trouble(alpha_column, alpha_row, options.numerical_trouble_tolerance) {
            self.numerical_failures += 1;
            warn!(
                "Numerical trouble in row {} with variable {}: pivot {:e} from the column, {:e} from the row",
                row_out, variable_in, alpha_column, alpha_row,
            );
            if self.numerical_failures > options.max_numerical_retries {
                return Some(Outcome::Stopped(ModelStatus::SolveError));
            }
            if self.state.status().has_fresh_invert() {
                self.state.add_bad_basis_change(BadBasisChangeKind::NumericalTrouble, row_out, variable_in);
                return None;
            }
            self.state.invalidate_invert();
            return rebuild(self.state, RebuildReason::NumericalTrouble).err();
        }
        self.numerical_failures = 0;

        if self.state.options().primal_edge_weight_strategy == PrimalEdgeWeightStrategy::Devex {
            self.state.update_primal_weights(variable_in, &self.aq, row_out, &self.row_ap);
        }

        let theta_dual = self.state.work_dual(variable_in) / alpha_row;
        let variable_out = self.state.basis().basic_index()[row_out];
        self.state.update_dual(theta_dual, &self.row_ap);
        self.state.set_work_dual(variable_out, -theta_dual);
        self.state.update_primal(variable_in, theta, &self.aq);
        self.state.update_pivots(variable_in, row_out, move_out);

        if self.state.update_factor(&self.aq, row_out).is_err() {
            return rebuild(self.state, RebuildReason::PossiblySingularBasis).err();
        }
        if phase == Phase::Two && self.state.has_primal_infeasibility() {
            return rebuild(self.state, RebuildReason::PrimalInfeasibleInPrimalSimplex).err();
        }

        None
    }

    /// Reduced costs of the sum of infeasibilities.
    ///
    /// Basic variables below their lower bound cost `-1`, those above their upper bound `1`.
    fn compute_phase_one_dual(&mut self) {
        let m = self.state.nr_rows();
        let tolerance = self.state.options().primal_feasibility_tolerance;

        let mut costs = WorkVector::new(m);
        for row in 0..m {
            let violation = self.state.base_violation(row);
            if violation.abs() > tolerance {
                costs.set(row, violation.signum());
            }
        }
        self.state.btran(&mut costs, 1_f64);
        self.state.tableau_row(&costs, &mut self.row_ap);

        for (j, dual) in self.phase_one_dual.iter_mut().enumerate() {
            *dual = if self.state.basis().is_basic(j) { 0_f64 } else { -self.row_ap.get(j) };
        }
    }

    /// The reduced cost used for pricing in a phase.
    fn dual(&self, phase: Phase, variable: usize) -> f64 {
        match phase {
            Phase::One => self.phase_one_dual[variable],
            Phase::Two => self.state.work_dual(variable),
        }
    }

    /// How much a nonbasic variable violates dual feasibility, with the direction in which it
    /// should move.
    fn dual_infeasibility(&self, phase: Phase, variable: usize) -> Option<(f64, f64)> {
        let dual = self.dual(phase, variable);
        let (infeasibility, direction) = match self.state.basis().nonbasic_move(variable) {
            Move::Up => (-dual, 1_f64),
            Move::Down => (dual, -1_f64),
            Move::Zero => (dual.abs(), -dual.signum()),
        };

        (infeasibility > self.state.options().dual_feasibility_tolerance).then_some((infeasibility, direction))
    }

    fn is_candidate(&self, variable: usize) -> bool {
        !self.state.basis().is_basic(variable) && self.state.work_range(variable) != 0_f64
    }

    /// Choose the entering variable with the largest weighted dual infeasibility.
    fn choose_column(&self, phase: Phase) -> Option<(usize, f64)> {
        let devex = self.state.options().primal_edge_weight_strategy == PrimalEdgeWeightStrategy::Devex;
        let taboo = self.state.taboo();

        (0..self.state.nr_total())
            .filter(|&j| self.is_candidate(j) && !taboo.is_taboo_variable(j))
            .filter_map(|j| self.dual_infeasibility(phase, j).map(|(infeasibility, direction)| {
                let weight = if devex { self.state.primal_weights().weight(j) } else { 1_f64 };
                (j, direction, infeasibility * infeasibility / weight)
            }))
            .max_by(|(_, _, a), (_, _, b)| a.total_cmp(b))
            .map(|(j, direction, _)| (j, direction))
    }

    /// Whether a variable is only excluded from entering because of a taboo record.
    fn has_taboo_candidate(&self, phase: Phase) -> bool {
        (0..self.state.nr_total())
            .filter(|&j| self.is_candidate(j) && self.state.taboo().is_taboo_variable(j))
            .any(|j| self.dual_infeasibility(phase, j).is_some())
    }

    /// Harris two-pass ratio test.
    ///
    /// The first pass finds the largest step for which all bounds are satisfied within the
    /// tolerance, the second pass chooses among the rows that block before that step the one
    /// with the largest pivot. In phase one, infeasible basic variables block at the bound they
    /// violate when moving towards it and don't block when moving away from it.
    fn choose_row(&self, phase: Phase, variable_in: usize, direction: f64) -> Step {
        let options = self.state.options();
        let tolerance = options.primal_feasibility_tolerance;

        // (row, |alpha|, exact ratio, relaxed ratio, move of the leaving variable)
        let mut blocking = Vec::new();
        for (row, value) in self.aq.iter() {
            let alpha = direction * value;
            if alpha.abs() <= options.pivot_tolerance {
                continue;
            }

            let x = self.state.base_value(row);
            let (lower, upper) = (self.state.base_lower(row), self.state.base_upper(row));
            let fixed = lower == upper;
            // The basic variable decreases when alpha is positive
            let limit = if alpha > 0_f64 {
                if phase == Phase::One && x > upper + tolerance {
                    Some((upper, x - upper, x - upper + tolerance, Move::Down))
                } else if lower.is_finite() && (phase == Phase::Two || x >= lower - tolerance) {
                    Some((lower, x - lower, x - lower + tolerance, Move::Up))
                } else {
                    None
                }
            } else if phase == Phase::One && x < lower - tolerance {
                Some((lower, lower - x, lower - x + tolerance, Move::Up))
            } else if upper.is_finite() && (phase == Phase::Two || x <= upper + tolerance) {
                Some((upper, upper - x, upper - x + tolerance, Move::Down))
            } else {
                None
            };

            if let Some((_, distance, relaxed_distance, move_out)) = limit {
                let move_out = if fixed { Move::Zero } else { move_out };
                blocking.push((row, alpha.abs(), distance.max(0_f64) / alpha.abs(), relaxed_distance.max(0_f64) / alpha.abs(), move_out));
            }
        }

        let bound = blocking.iter()
            .map(|&(_, _, _, relaxed, _)| relaxed)
            .fold(f64::INFINITY, f64::min);
        let range = self.state.work_range(variable_in);
        if range.is_finite() && range <= bound {
            return Step::Flip;
        }

        blocking.into_iter()
            .filter(|&(_, _, ratio, _, _)| ratio <= bound)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(Step::Unbounded, |(row_out, _, ratio, _, move_out)| Step::Pivot {
                row_out,
                theta: direction * ratio,
                move_out,
            })
    }
}
