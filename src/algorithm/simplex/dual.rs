//! # Dual simplex method
//!
//! Keeps the reduced costs feasible and removes primal infeasibilities one row at a time. When
//! the starting basis is not dual feasible, a first phase solves an auxiliary problem in which
//! every variable is boxed.
use std::cmp::Ordering;

use log::{debug, trace, warn};

use crate::algorithm::simplex::{is_numerical_trouble, rebuild};
use crate::algorithm::simplex::basis::Move;
use crate::algorithm::simplex::options::DualEdgeWeightStrategy;
use crate::algorithm::simplex::state::State;
use crate::algorithm::simplex::status::{ModelStatus, Outcome, Phase, RebuildReason};
use crate::algorithm::simplex::taboo::BadBasisChangeKind;
use crate::data::linear_algebra::vector::WorkVector;

/// Run the dual simplex method from the current basis.
///
/// The values in the state should be fresh.
pub(crate) fn dual(state: &mut State) -> Outcome {
    DualSimplex::new(state).solve()
}

/// A nonbasic variable that could enter the basis in the dual ratio test.
#[derive(Debug, Copy, Clone)]
struct Candidate {
    variable: usize,
    /// Tableau row entry, oriented such that it is positive when the variable can enter.
    alpha: f64,
    /// Step length at which the reduced cost reaches zero.
    ratio: f64,
    /// Step length at which the reduced cost reaches minus the tolerance.
    relaxed: f64,
}

/// Result of the dual ratio test.
#[derive(Debug, Clone, PartialEq)]
enum ColumnChoice {
    /// A variable enters after flipping the bounds of others.
    Enter {
        variable: usize,
        flips: Vec<usize>,
    },
    /// Only variables that are taboo could enter.
    Taboo,
    /// Nothing can enter; flipping every candidate leaves this much infeasibility.
    DualUnbounded {
        remaining: f64,
    },
}

struct DualSimplex<'a> {
    state: &'a mut State,
    row_ep: WorkVector,
    row_ap: WorkVector,
    aq: WorkVector,
    tau: WorkVector,
    numerical_failures: usize,
}

impl<'a> DualSimplex<'a> {
    fn new(state: &'a mut State) -> Self {
        let m = state.nr_rows();
        let nr_total = state.nr_total();

        Self {
            state,
            row_ep: WorkVector::new(m),
            row_ap: WorkVector::new(nr_total),
            aq: WorkVector::new(m),
            tau: WorkVector::new(m),
            numerical_failures: 0,
        }
    }

    fn solve(&mut self) -> Outcome {
        if self.state.options().perturb_costs && !self.state.is_perturbed() {
            self.state.perturb_costs();
            self.state.refresh();
        }

        let remaining = self.state.correct_dual_infeasibilities();
        self.state.compute_infeasibilities();
        if remaining > 0 {
            debug!("{} dual infeasibilities can't be removed by flipping, starting phase one", remaining);
            match self.phase_one() {
                Outcome::Optimal => {},
                other => return other,
            }
        }

        self.iterate(Phase::Two)
    }

    /// Find a dual feasible basis by solving the problem with artificial bounds.
    fn phase_one(&mut self) -> Outcome {
        self.state.set_artificial_bounds();
        self.state.refresh();

        let outcome = self.iterate(Phase::One);

        self.state.restore_bounds();
        if self.state.status().has_invert() {
            self.state.refresh();
        }
        self.finish_phase_one(outcome)
    }

    /// Interpret the outcome of the first phase for the original problem.
    fn finish_phase_one(&mut self, outcome: Outcome) -> Outcome {
        match outcome {
            Outcome::Optimal => {
                let remaining = self.state.correct_dual_infeasibilities();
                self.state.compute_infeasibilities();
                if remaining > 0 {
                    debug!("Dual phase one ended with {} dual infeasibilities", remaining);
                    Outcome::DualInfeasible
                } else {
                    Outcome::Optimal
                }
            },
            // The boxed problem is always feasible, so this is numerical
            Outcome::Infeasible => {
                warn!("Dual phase one problem reported infeasible");
                self.state.clear_ray();
                Outcome::DualInfeasible
            },
            other => other,
        }
    }

    fn iterate(&mut self, phase: Phase) -> Outcome {
        debug!("Dual simplex phase {:?} from iteration {}", phase, self.state.statistics().iterations);

        loop {
            if let Some(status) = self.state.check_limits() {
                break Outcome::Stopped(status);
            }
            if self.state.should_refactor() {
                if let Err(outcome) = self.rebuild(RebuildReason::UpdateLimitReached) {
                    break outcome;
                }
            }

            let Some((row_out, violation)) = self.choose_row() else {
                if let Some(outcome) = self.no_leaving_candidate() {
                    break outcome;
                }
                continue;
            };

            self.state.unit_btran(row_out, &mut self.row_ep);
            if self.state.dual_weights().is_steepest_edge() {
                let computed = self.row_ep.norm2();
                self.state.dual_weights_mut().assess_error(row_out, computed);
            }
            self.state.tableau_row(&self.row_ep, &mut self.row_ap);

            // 1 when the leaving variable is above its upper bound, -1 when below its lower bound
            let sign = violation.signum();
            let (variable_in, flips) = match self.choose_column(row_out, sign, violation.abs()) {
                ColumnChoice::Enter { variable, flips } => (variable, flips),
                ColumnChoice::Taboo => {
                    debug!("Only taboo variables can enter for row {}", row_out);
                    self.state.clear_taboo();
                    if let Err(outcome) = self.rebuild(RebuildReason::ChooseColumnFail) {
                        break outcome;
                    }
                    continue;
                },
                ColumnChoice::DualUnbounded { remaining } => {
                    match self.no_entering_candidate(phase, row_out, sign, remaining) {
                        Some(outcome) => break outcome,
                        None => continue,
                    }
                },
            };

            if self.state.is_bad_basis_change(variable_in, row_out) {
                if self.state.cycles() >= self.state.options().cycling_escalation_limit {
                    break Outcome::Cycling;
                }
                continue;
            }

            self.state.ftran_column(variable_in, &mut self.aq);
            let alpha_column = self.aq.get(row_out);
            let alpha_row = self.row_ap.get(variable_in);
            let options = self.state.options();
            if alpha_column.abs() < options.pivot_tolerance
                || is_numerical_trouble(alpha_column, alpha_row, options.numerical_trouble_tolerance) {
                match self.numerical_trouble(row_out, variable_in, alpha_column, alpha_row) {
                    Some(outcome) => break outcome,
                    None => continue,
                }
            }
            self.numerical_failures = 0;

            self.state.flip_bounds(&flips);

            let target = if sign > 0_f64 { self.state.base_upper(row_out) } else { self.state.base_lower(row_out) };
            let theta_primal = (self.state.base_value(row_out) - target) / alpha_column;
            let theta_dual = self.state.work_dual(variable_in) / alpha_row;
            trace!(
                "Row {} leaves, variable {} enters, primal step {:.3e}, dual step {:.3e}, {} flips",
                row_out, variable_in, theta_primal, theta_dual, flips.len(),
            );

            let steepest_edge = self.state.dual_weights().is_steepest_edge();
            if steepest_edge {
                self.tau.copy_from(&self.row_ep);
                let density = self.state.options().hyper_sparse_density;
                self.state.ftran(&mut self.tau, density);
            }

            let variable_out = self.state.basis().basic_index()[row_out];
            self.state.update_dual(theta_dual, &self.row_ap);
            self.state.set_work_dual(variable_out, -theta_dual);
            self.state.update_primal(variable_in, theta_primal, &self.aq);

            let weights = self.state.dual_weights_mut();
            if steepest_edge {
                weights.update_steepest_edge(&self.aq, row_out, &self.tau);
            } else if weights.strategy() == DualEdgeWeightStrategy::Devex {
                weights.update_devex(&self.aq, row_out);
            }
            if weights.should_switch_to_devex() {
                weights.switch_to_devex();
                self.state.statistics_mut().devex_switches += 1;
            }

            let move_out = if self.state.work_range(variable_out) == 0_f64 {
                Move::Zero
            } else if sign > 0_f64 {
                Move::Down
            } else {
                Move::Up
            };
            self.state.update_pivots(variable_in, row_out, move_out);
            if self.state.update_factor(&self.aq, row_out).is_err() {
                if let Err(outcome) = self.rebuild(RebuildReason::PossiblySingularBasis) {
                    break outcome;
                }
            }
        }
    }

    /// Decide what it means that no row is infeasible enough to leave.
    ///
    /// Returns `None` when the search should continue.
    fn no_leaving_candidate(&mut self) -> Option<Outcome> {
        if !self.state.taboo().is_empty() && self.has_taboo_row() {
            self.state.clear_taboo();
            return self.rebuild(RebuildReason::BadBasisChange).err();
        }
        if !self.state.status().has_fresh_invert() {
            return self.rebuild(RebuildReason::PossiblyOptimal).err();
        }

        Some(Outcome::Optimal)
    }

    /// Decide what it means that the dual ratio test found no entering variable.
    ///
    /// Infeasibility is only reported with a fresh factorization, and in the second phase only
    /// when the dual ray is a certificate for the original bounds. Returns `None` when the
    /// search should continue.
    fn no_entering_candidate(&mut self, phase: Phase, row_out: usize, sign: f64, remaining: f64) -> Option<Outcome> {
        if !self.state.status().has_fresh_invert() {
            return self.rebuild(RebuildReason::PossiblyDualUnbounded).err();
        }

        debug!(
            "Dual ratio test found no entering variable for row {}, infeasibility {:.3e} remains",
            row_out, remaining,
        );
        self.state.record_dual_ray(row_out, -sign);
        if phase == Phase::One || self.state.proves_infeasibility() {
            return Some(Outcome::Infeasible);
        }

        warn!("Dual ray of row {} is not a certificate of infeasibility", row_out);
        self.state.clear_ray();
        Some(Outcome::Unproven)
    }

    /// Rebuild, then flip boxed variables that became dual infeasible.
    fn rebuild(&mut self, reason: RebuildReason) -> Result<(), Outcome> {
        rebuild(self.state, reason)?;
        if self.state.correct_dual_infeasibilities() > 0 {
            self.state.compute_infeasibilities();
        }
        Ok(())
    }

    fn numerical_trouble(
        &mut self,
        row_out: usize,
        variable_in: usize,
        alpha_column: f64,
        alpha_row: f64,
    ) -> Option<Outcome> {
        self.numerical_failures += 1;
        warn!(
            "Numerical trouble in row {} with variable {}: pivot {:e} from the column, {:e} from the row",
            row_out, variable_in, alpha_column, alpha_row,
        );
        if self.numerical_failures > self.state.options().max_numerical_retries {
            return Some(Outcome::Stopped(ModelStatus::SolveError));
        }

        if self.state.status().has_fresh_invert() {
            self.state.add_bad_basis_change(BadBasisChangeKind::NumericalTrouble, row_out, variable_in);
            None
        } else {
            self.state.invalidate_invert();
            self.rebuild(RebuildReason::NumericalTrouble).err()
        }
    }

    /// Whether a row is only excluded from leaving because of a taboo record.
    fn has_taboo_row(&self) -> bool {
        let tolerance = self.state.options().primal_feasibility_tolerance;

        (0..self.state.nr_rows())
            .filter(|&row| self.state.taboo().is_taboo_row(row))
            .any(|row| self.state.base_violation(row).abs() > tolerance)
    }

    /// Choose the leaving row with the largest weighted infeasibility.
    ///
    /// # Return value
    ///
    /// The basis position and the bound violation of its variable.
    fn choose_row(&self) -> Option<(usize, f64)> {
        let tolerance = self.state.options().primal_feasibility_tolerance;
        let weights = self.state.dual_weights();

        (0..self.state.nr_rows())
            .filter(|&row| !self.state.taboo().is_taboo_row(row))
            .map(|row| (row, self.state.base_violation(row)))
            .filter(|&(_, violation)| violation.abs() > tolerance)
            .map(|(row, violation)| (row, violation, violation * violation / weights.weight(row)))
            .max_by(|(_, _, a), (_, _, b)| a.total_cmp(b))
            .map(|(row, violation, _)| (row, violation))
    }

    /// Bound flipping ratio test.
    ///
    /// Passes breakpoints in groups of nearly equal ratio. A group of boxed variables is flipped
    /// as long as the slope of the dual objective stays above the primal feasibility tolerance;
    /// otherwise the variable with the largest pivot in the group enters. Taboo variables are
    /// skipped.
    ///
    /// # Arguments
    ///
    /// * `row_out`: Leaving row.
    /// * `sign`: Direction of the bound violation of the leaving variable.
    /// * `infeasibility`: Size of that violation, the initial slope.
    ///
    /// # Return value
    ///
    /// The entering variable and the variables to flip. When nothing can enter, whether that is
    /// only because of taboo variables.
    fn choose_column(&self, row_out: usize, sign: f64, infeasibility: f64) -> ColumnChoice {
        let options = self.state.options();
        let basis = self.state.basis();
        let taboo = self.state.taboo();

        let (mut candidates, skipped): (Vec<_>, Vec<_>) = self.row_ap.iter()
            .filter(|&(j, _)| !basis.is_basic(j) && self.state.work_range(j) != 0_f64)
            .filter_map(|(j, value)| {
                let alpha = sign * value;
                let eligible = match basis.nonbasic_move(j) {
                    Move::Up => alpha > options.pivot_tolerance,
                    Move::Down => alpha < -options.pivot_tolerance,
                    Move::Zero => alpha.abs() > options.pivot_tolerance,
                };
                eligible.then(|| {
                    let dual = self.state.work_dual(j) * alpha.signum();
                    Candidate {
                        variable: j,
                        alpha,
                        ratio: dual.max(0_f64) / alpha.abs(),
                        relaxed: (dual + options.dual_feasibility_tolerance).max(0_f64) / alpha.abs(),
                    }
                })
            })
            .partition(|candidate| !taboo.is_taboo_variable(candidate.variable));
        candidates.sort_unstable_by(|a, b| a.ratio.partial_cmp(&b.ratio).unwrap_or(Ordering::Equal));
        trace!("Dual ratio test for row {}: {} candidates", row_out, candidates.len());

        let mut slope = infeasibility;
        let mut flips = Vec::new();
        let mut start = 0;
        while start < candidates.len() {
            let bound = candidates[start..].iter()
                .map(|candidate| candidate.relaxed)
                .fold(f64::INFINITY, f64::min);
            let end = start + candidates[start..].iter()
                .take_while(|candidate| candidate.ratio <= bound)
                .count()
                .max(1);
            let group = &candidates[start..end];

            let reduction = group.iter()
                .map(|candidate| candidate.alpha.abs() * self.state.work_range(candidate.variable))
                .sum::<f64>();
            if reduction.is_finite() && slope - reduction > options.primal_feasibility_tolerance {
                flips.extend(group.iter().map(|candidate| candidate.variable));
                slope -= reduction;
                start = end;
                continue;
            }

            if let Some(candidate) = group.iter().max_by(|a, b| a.alpha.abs().total_cmp(&b.alpha.abs())) {
                return ColumnChoice::Enter { variable: candidate.variable, flips };
            }
        }

        if skipped.is_empty() {
            ColumnChoice::DualUnbounded { remaining: slope }
        } else {
            ColumnChoice::Taboo
        }
    }
}
