//! # Simplex state
//!
//! Everything the primal and dual simplex methods share: a copy of the problem in the internal
//! form, the values of all variables, the basis with its factorization and weights, and the
//! bookkeeping for rays, rejected basis changes and limits.
//!
//! The internal form has a logical variable for every row. With `s_i` the logical of row `i`,
//! the constraints read `A x + s = 0`, so the row activity is `-s_i` and the bounds of `s_i` are
//! `[-row_upper, -row_lower]`. Costs are multiplied by the sense of the objective, such that the
//! problem is always a minimization problem.
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, log_enabled, trace, warn, Level};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::algorithm::simplex::basis::{Move, SimplexBasis};
use crate::algorithm::simplex::factor::{basis_column, Factor, UpdateError};
use crate::algorithm::simplex::options::Options;
use crate::algorithm::simplex::pricing::{column_price, row_price, DualEdgeWeights, PrimalDevexWeights};
use crate::algorithm::simplex::ray::{RayKind, RayRecord};
use crate::algorithm::simplex::status::{ModelStatus, RebuildReason, Statistics, Status};
use crate::algorithm::simplex::taboo::{BadBasisChangeKind, BadBasisChanges};
use crate::data::linear_algebra::matrix::{ColumnMatrix, RowMatrix};
use crate::data::linear_algebra::vector::WorkVector;
use crate::data::linear_program::LinearProgram;
use crate::data::linear_program::elements::{BoundKind, Objective};
use crate::data::linear_program::solution::{Basis, Solution};
use crate::error::Error;

/// Artificial bound of free variables in the first phase of the dual simplex method.
const FREE_ARTIFICIAL_BOUND: f64 = 1000_f64;
/// Entries of a dual ray below this fraction of its largest entry are rounding noise.
const RAY_RELATIVE_CUTOFF: f64 = 1e-12;
/// Iterations of the estimate of the norm of the inverse basis matrix.
const CONDITION_ITERATIONS: usize = 5;

/// The basis matrix could not be factorized, even after replacing columns by logicals.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Singular;

/// Number, largest and sum of the infeasibilities.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Infeasibilities {
    /// Number of values outside their tolerance.
    pub count: usize,
    /// Largest violation.
    pub max: f64,
    /// Sum of the violations.
    pub sum: f64,
}

impl Infeasibilities {
    fn add(&mut self, violation: f64, tolerance: f64) {
        if violation > tolerance {
            self.count += 1;
            self.sum += violation;
        }
        self.max = self.max.max(violation);
    }
}

/// The state of a simplex solve.
#[derive(Debug)]
pub struct State {
    options: Options,
    objective: Objective,
    offset: f64,

    nr_columns: usize,
    nr_rows: usize,
    matrix: ColumnMatrix,
    row_matrix: RowMatrix,

    /// Costs of all variables, unperturbed.
    cost: Vec<f64>,
    /// Bounds of all variables, unperturbed.
    lower: Vec<f64>,
    upper: Vec<f64>,

    work_cost: Vec<f64>,
    work_lower: Vec<f64>,
    work_upper: Vec<f64>,
    work_range: Vec<f64>,
    work_value: Vec<f64>,
    work_dual: Vec<f64>,
    /// Dual values of the rows, `y = B^-T c_B`.
    row_dual: Vec<f64>,
    /// Value and bounds of the basic variable of each basis position.
    base_value: Vec<f64>,
    base_lower: Vec<f64>,
    base_upper: Vec<f64>,

    keys: Vec<u64>,
    basis: SimplexBasis,
    factor: Factor,
    /// Last basis that was factorized without trouble.
    backtracking: Option<SimplexBasis>,
    /// Row and entering variable of the last basis change.
    last_change: Option<(usize, usize)>,
    dual_weights: DualEdgeWeights,
    primal_weights: PrimalDevexWeights,
    pending_primal_reset: bool,

    ray: RayRecord,
    taboo: BadBasisChanges,
    visited: HashSet<u64>,
    cycles: usize,

    status: Status,
    statistics: Statistics,
    primal_infeasibilities: Infeasibilities,
    dual_infeasibilities: Infeasibilities,

    costs_perturbed: bool,
    bounds_perturbed: bool,
    rng: StdRng,

    start: Instant,
    interrupt: Arc<AtomicBool>,
}

impl State {
    /// Set up the internal form of a program with the logical basis.
    pub fn new(program: &LinearProgram, options: Options, interrupt: Arc<AtomicBool>) -> Self {
        let nr_columns = program.nr_columns();
        let nr_rows = program.nr_rows();
        let sense = program.objective().sense();

        let cost = program.col_cost().iter().map(|&c| sense * c)
            .chain(itertools::repeat_n(0_f64, nr_rows))
            .collect::<Vec<_>>();
        let lower = program.col_lower().iter().copied()
            .chain(program.row_upper().iter().map(|&u| -u))
            .collect::<Vec<_>>();
        let upper = program.col_upper().iter().copied()
            .chain(program.row_lower().iter().map(|&l| -l))
            .collect::<Vec<_>>();

        let mut rng = StdRng::seed_from_u64(options.random_seed);
        let keys = (0..nr_columns + nr_rows).map(|_| rng.r#gen::<u64>()).collect::<Vec<_>>();
        let basis = SimplexBasis::logical(nr_columns, &lower, &upper, &keys);
        let matrix = program.matrix().clone();
        let row_matrix = matrix.transpose();

        let mut status = Status::default();
        status.new_basis();

        let mut state = Self {
            objective: program.objective(),
            offset: program.offset(),

            nr_columns,
            nr_rows,
            matrix,
            row_matrix,

            work_cost: cost.clone(),
            work_lower: lower.clone(),
            work_upper: upper.clone(),
            work_range: Vec::new(),
            work_value: vec![0_f64; nr_columns + nr_rows],
            work_dual: vec![0_f64; nr_columns + nr_rows],
            row_dual: vec![0_f64; nr_rows],
            base_value: vec![0_f64; nr_rows],
            base_lower: vec![0_f64; nr_rows],
            base_upper: vec![0_f64; nr_rows],
            cost,
            lower,
            upper,

            keys,
            basis,
            factor: Factor::new(&options),
            backtracking: None,
            last_change: None,
            dual_weights: DualEdgeWeights::new(nr_rows, &options),
            primal_weights: PrimalDevexWeights::default(),
            pending_primal_reset: false,

            ray: RayRecord::default(),
            taboo: BadBasisChanges::new(options.taboo_capacity),
            visited: HashSet::new(),
            cycles: 0,

            status,
            statistics: Statistics::default(),
            primal_infeasibilities: Infeasibilities::default(),
            dual_infeasibilities: Infeasibilities::default(),

            costs_perturbed: false,
            bounds_perturbed: false,
            rng,

            start: Instant::now(),
            interrupt,
            options,
        };
        state.update_ranges();
        state.set_nonbasic_values();

        state
    }

    /// Prepare for a new solve: reset counters, history and the clock.
    pub fn begin_solve(&mut self, options: Options) {
        if options != self.options {
            self.factor = Factor::new(&options);
            self.dual_weights = DualEdgeWeights::new(self.nr_rows, &options);
            self.taboo = BadBasisChanges::new(options.taboo_capacity);
            self.status.invalidate_invert();
            self.status.invalidate_weights();
            self.options = options;
        }
        self.remove_perturbations();
        self.statistics = Statistics::default();
        self.taboo.clear();
        self.visited.clear();
        self.visited.insert(self.basis.hash());
        self.cycles = 0;
        self.backtracking = None;
        self.last_change = None;
        self.start = Instant::now();
    }

    /// The options of the solve.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of structural variables.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// Number of rows and logical variables.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of variables.
    pub fn nr_total(&self) -> usize {
        self.nr_columns + self.nr_rows
    }

    /// The current basis.
    pub fn basis(&self) -> &SimplexBasis {
        &self.basis
    }

    /// Validity flags.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Counters of the current solve.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Mutable counters of the current solve.
    pub fn statistics_mut(&mut self) -> &mut Statistics {
        &mut self.statistics
    }

    /// The rejected basis changes.
    pub fn taboo(&self) -> &BadBasisChanges {
        &self.taboo
    }

    /// Record a rejected basis change, so that the pivoting rules avoid it.
    pub fn add_bad_basis_change(&mut self, kind: BadBasisChangeKind, row_out: usize, variable_in: usize) {
        let variable_out = self.basis.basic_index()[row_out];
        self.taboo.add(kind, row_out, variable_out, variable_in);
        self.statistics.bad_basis_changes += 1;
    }

    /// Current cost of a variable.
    pub fn work_cost(&self, variable: usize) -> f64 {
        self.work_cost[variable]
    }

    /// Current lower bound of a variable.
    pub fn work_lower(&self, variable: usize) -> f64 {
        self.work_lower[variable]
    }

    /// Current upper bound of a variable.
    pub fn work_upper(&self, variable: usize) -> f64 {
        self.work_upper[variable]
    }

    /// Difference between the current bounds of a variable.
    pub fn work_range(&self, variable: usize) -> f64 {
        self.work_range[variable]
    }

    /// Current value of a variable.
    pub fn work_value(&self, variable: usize) -> f64 {
        self.work_value[variable]
    }

    /// Reduced cost of a variable.
    pub fn work_dual(&self, variable: usize) -> f64 {
        self.work_dual[variable]
    }

    /// Value of the basic variable of a basis position.
    pub fn base_value(&self, row: usize) -> f64 {
        self.base_value[row]
    }

    /// Lower bound of the basic variable of a basis position.
    pub fn base_lower(&self, row: usize) -> f64 {
        self.base_lower[row]
    }

    /// Upper bound of the basic variable of a basis position.
    pub fn base_upper(&self, row: usize) -> f64 {
        self.base_upper[row]
    }

    /// Bound violation of the basic variable of a basis position: negative below the lower bound,
    /// positive above the upper bound, zero otherwise.
    pub fn base_violation(&self, row: usize) -> f64 {
        let value = self.base_value[row];
        if value < self.base_lower[row] {
            value - self.base_lower[row]
        } else if value > self.base_upper[row] {
            value - self.base_upper[row]
        } else {
            0_f64
        }
    }

    /// Infeasibilities of the basic variables at the last computation.
    pub fn primal_infeasibilities(&self) -> Infeasibilities {
        self.primal_infeasibilities
    }

    /// Infeasibilities of the reduced costs at the last computation.
    pub fn dual_infeasibilities(&self) -> Infeasibilities {
        self.dual_infeasibilities
    }

    /// Dual edge weights.
    pub fn dual_weights(&self) -> &DualEdgeWeights {
        &self.dual_weights
    }

    /// Mutable dual edge weights.
    pub fn dual_weights_mut(&mut self) -> &mut DualEdgeWeights {
        &mut self.dual_weights
    }

    /// Primal Devex weights.
    pub fn primal_weights(&self) -> &PrimalDevexWeights {
        &self.primal_weights
    }

    /// Start a new primal Devex reference framework.
    pub fn reset_primal_weights(&mut self) {
        self.primal_weights.reset(&self.basis);
    }

    /// Update the primal Devex weights before the basis change, resetting them when they grew too
    /// large.
    pub fn update_primal_weights(&mut self, variable_in: usize, aq: &WorkVector, row_out: usize, row_ap: &WorkVector) {
        let reset = self.primal_weights.update(&self.basis, variable_in, aq, row_out, row_ap);
        if reset {
            self.pending_primal_reset = true;
        }
    }

    fn update_ranges(&mut self) {
        self.work_range = self.work_lower.iter().zip(&self.work_upper)
            .map(|(l, u)| u - l)
            .collect();
    }

    /// Make the moves agree with the current bounds, and put nonbasic variables at their bound.
    fn set_nonbasic_values(&mut self) {
        for j in 0..self.nr_total() {
            if self.basis.is_basic(j) {
                continue;
            }
            let (lower, upper) = (self.work_lower[j], self.work_upper[j]);
            let direction = match self.basis.nonbasic_move(j) {
                _ if lower == upper => Move::Zero,
                Move::Up if lower.is_finite() => Move::Up,
                Move::Down if upper.is_finite() => Move::Down,
                Move::Zero if !lower.is_finite() && !upper.is_finite() => Move::Zero,
                _ => Move::default_for(lower, upper),
            };
            self.basis.set_nonbasic_move(j, direction);
            self.work_value[j] = direction.value(lower, upper);
        }
    }

    /// Factorize the basis matrix.
    ///
    /// A singular basis matrix is repaired by going back to the last basis that could be
    /// factorized, or when there is none, by swapping in logicals.
    pub fn factorize(&mut self) -> Result<(), Singular> {
        self.statistics.factorizations += 1;
        match self.factor.build(&self.matrix, self.basis.basic_index()) {
            Ok(()) => {
                self.factorized();
                Ok(())
            },
            Err(deficiency) => {
                self.statistics.rank_deficiencies += 1;
                if self.backtrack() {
                    return Ok(());
                }
                warn!(
                    "Basis matrix is singular with rank deficiency {}, replacing columns by logicals",
                    deficiency.rank_deficiency(),
                );
                let replacements = deficiency.positions.iter()
                    .zip(&deficiency.rows)
                    .map(|(&position, &row)| (position, self.nr_columns + row))
                    .collect::<Vec<_>>();
                for &(position, logical) in &replacements {
                    self.taboo.add(BadBasisChangeKind::Singular, position, self.basis.basic_index()[position], logical);
                }
                self.basis.replace(&replacements, &self.work_lower, &self.work_upper, &self.keys);
                self.status.new_basis();
                self.set_nonbasic_values();

                self.statistics.factorizations += 1;
                match self.factor.build(&self.matrix, self.basis.basic_index()) {
                    Ok(()) => {
                        self.factorized();
                        Ok(())
                    },
                    Err(deficiency) => {
                        warn!("Basis matrix still singular after repair, rank deficiency {}", deficiency.rank_deficiency());
                        self.status.invalidate_invert();
                        Err(Singular)
                    },
                }
            },
        }
    }

    fn factorized(&mut self) {
        self.status.factorized();
        self.backtracking = Some(self.basis.clone());
    }

    /// Go back to the last basis that could be factorized.
    ///
    /// The last basis change is made taboo, such that it isn't repeated right away.
    ///
    /// # Return value
    ///
    /// Whether the basis was replaced and factorized.
    fn backtrack(&mut self) -> bool {
        let Some(basis) = self.backtracking.take() else {
            return false;
        };
        if basis.hash() == self.basis.hash() {
            return false;
        }

        warn!("Basis matrix is singular, backtracking to the last nonsingular basis");
        if let Some((row_out, variable_in)) = self.last_change.take() {
            self.add_bad_basis_change(BadBasisChangeKind::Singular, row_out, variable_in);
        }
        self.basis = basis;
        self.status.new_basis();
        self.status.invalidate_weights();
        self.set_nonbasic_values();
        // The bases after the backtracking basis may be visited again on another path
        self.visited.clear();
        self.visited.insert(self.basis.hash());

        self.statistics.factorizations += 1;
        match self.factor.build(&self.matrix, self.basis.basic_index()) {
            Ok(()) => {
                self.statistics.backtracks += 1;
                self.factorized();
                true
            },
            Err(_) => false,
        }
    }

    /// Estimate the condition number of the basis matrix in the 1-norm.
    ///
    /// The norm of the inverse is estimated with Hager's method, which needs a few solves with
    /// the basis matrix and its transpose. The estimate is a lower bound.
    pub fn basis_condition(&mut self) -> Result<f64, Error> {
        self.ensure_invert()?;
        let m = self.nr_rows;
        if m == 0 {
            return Ok(1_f64);
        }

        let basis_norm = self.basis.basic_index().iter()
            .map(|&j| basis_column(&self.matrix, j).into_iter().map(|(_, a)| a.abs()).sum::<f64>())
            .fold(0_f64, f64::max);

        let mut x = vec![1_f64 / m as f64; m];
        let mut inverse_norm = 0_f64;
        for _ in 0..CONDITION_ITERATIONS {
            let mut y = WorkVector::from_dense(&x);
            self.factor.ftran(&mut y, 1_f64);
            let y = y.to_dense();
            inverse_norm = inverse_norm.max(y.iter().map(|value| value.abs()).sum());

            let mut z = WorkVector::from_dense(&y.iter().map(|value| value.signum()).collect::<Vec<_>>());
            self.factor.btran(&mut z, 1_f64);
            let z = z.to_dense();
            let (largest, size) = z.iter().map(|value| value.abs()).enumerate()
                .fold((0, 0_f64), |best, (i, size)| if size > best.1 { (i, size) } else { best });
            let inner = z.iter().zip(&x).map(|(z_i, x_i)| z_i * x_i).sum::<f64>();
            if size <= inner {
                break;
            }
            x.iter_mut().for_each(|value| *value = 0_f64);
            x[largest] = 1_f64;
        }

        Ok(basis_norm * inverse_norm)
    }

    /// Factorize if needed, then recompute all values from scratch.
    pub fn rebuild(&mut self, reason: RebuildReason) -> Result<(), Singular> {
        self.statistics.rebuilds[reason] += 1;

        if !self.status.has_fresh_invert() {
            self.factorize()?;
        }
        if !self.status.has_weights() || self.dual_weights.needs_recompute() {
            self.dual_weights.initialize(&self.factor);
            self.primal_weights.reset(&self.basis);
            self.pending_primal_reset = false;
            self.status.weights_computed();
        }

        self.set_nonbasic_values();
        self.compute_primal();
        self.compute_dual();
        self.compute_infeasibilities();
        self.status.values_computed();

        if log_enabled!(Level::Trace) {
            trace!("Factorization solve error {:.3e}", self.factor_solve_error());
        }
        debug!(
            "Rebuild ({:?}) at iteration {}: objective {:.10e}, {} primal infeasibilities (sum {:.3e}), {} dual infeasibilities (sum {:.3e})",
            reason, self.statistics.iterations, self.objective_value(),
            self.primal_infeasibilities.count, self.primal_infeasibilities.sum,
            self.dual_infeasibilities.count, self.dual_infeasibilities.sum,
        );

        Ok(())
    }

    /// Recompute all values with the current factorization, after changing bounds or costs.
    pub fn refresh(&mut self) {
        debug_assert!(self.status.has_invert());

        self.set_nonbasic_values();
        self.compute_primal();
        self.compute_dual();
        self.compute_infeasibilities();
        self.status.values_computed();
    }

    /// Compute the values of the basic variables from those of the nonbasic variables.
    pub fn compute_primal(&mut self) {
        let mut rhs = WorkVector::new(self.nr_rows);
        for j in (0..self.nr_total()).filter(|&j| !self.basis.is_basic(j)) {
            let value = self.work_value[j];
            if value != 0_f64 {
                for (i, a) in basis_column(&self.matrix, j) {
                    rhs.add(i, a * value);
                }
            }
        }
        self.factor.ftran(&mut rhs, 1_f64);

        for (position, &variable) in self.basis.basic_index().iter().enumerate() {
            let value = -rhs.get(position);
            self.base_value[position] = value;
            self.base_lower[position] = self.work_lower[variable];
            self.base_upper[position] = self.work_upper[variable];
            self.work_value[variable] = value;
        }
    }

    /// Compute the dual values of the rows and the reduced costs.
    pub fn compute_dual(&mut self) {
        let mut rhs = WorkVector::new(self.nr_rows);
        for (position, &variable) in self.basis.basic_index().iter().enumerate() {
            let cost = self.work_cost[variable];
            if cost != 0_f64 {
                rhs.set(position, cost);
            }
        }
        self.factor.btran(&mut rhs, 1_f64);
        self.row_dual = rhs.to_dense();

        for j in 0..self.nr_columns {
            self.work_dual[j] = if self.basis.is_basic(j) {
                0_f64
            } else {
                self.work_cost[j] - self.matrix.major_dot(j, &self.row_dual)
            };
        }
        for i in 0..self.nr_rows {
            let j = self.nr_columns + i;
            self.work_dual[j] = if self.basis.is_basic(j) { 0_f64 } else { -self.row_dual[i] };
        }
    }

    /// Dual infeasibility of a nonbasic variable given its reduced cost.
    pub fn dual_violation(&self, variable: usize) -> f64 {
        if self.basis.is_basic(variable) {
            return 0_f64;
        }

        let dual = self.work_dual[variable];
        let (lower, upper) = (self.work_lower[variable], self.work_upper[variable]);
        if lower == upper {
            return 0_f64;
        }
        match self.basis.nonbasic_move(variable) {
            Move::Up => (-dual).max(0_f64),
            Move::Down => dual.max(0_f64),
            Move::Zero => dual.abs(),
        }
    }

    /// Count the primal and dual infeasibilities.
    pub fn compute_infeasibilities(&mut self) {
        let mut primal = Infeasibilities::default();
        for row in 0..self.nr_rows {
            primal.add(self.base_violation(row).abs(), self.options.primal_feasibility_tolerance);
        }
        let mut dual = Infeasibilities::default();
        for j in 0..self.nr_total() {
            dual.add(self.dual_violation(j), self.options.dual_feasibility_tolerance);
        }

        self.primal_infeasibilities = primal;
        self.dual_infeasibilities = dual;
    }

    /// Whether the current values are primal and dual feasible within the tolerances.
    pub fn is_optimal(&self) -> bool {
        self.primal_infeasibilities.count == 0 && self.dual_infeasibilities.count == 0
    }

    /// Objective value of the internal minimization problem, without offset.
    pub fn objective_value(&self) -> f64 {
        (0..self.nr_columns).map(|j| self.work_cost[j] * self.work_value[j]).sum()
    }

    /// Compute the transformed column `B^-1 a_j` of a variable.
    pub fn ftran_column(&self, variable: usize, result: &mut WorkVector) {
        result.clear();
        for (i, value) in basis_column(&self.matrix, variable) {
            result.add(i, value);
        }
        self.factor.ftran(result, self.options.hyper_sparse_density);
    }

    /// Compute row `e_r^T B^-1`.
    pub fn unit_btran(&self, row: usize, result: &mut WorkVector) {
        result.set_unit(row);
        self.factor.btran(result, self.options.hyper_sparse_density);
    }

    /// Compute `B^-1 x` for a vector indexed by row.
    pub fn ftran(&self, vector: &mut WorkVector, expected_density: f64) {
        self.factor.ftran(vector, expected_density);
    }

    /// Compute `B^-T x` for a vector indexed by basis position.
    pub fn btran(&self, vector: &mut WorkVector, expected_density: f64) {
        self.factor.btran(vector, expected_density);
    }

    /// Compute the tableau row `row_ep^T [A I]` of the nonbasic variables.
    pub fn tableau_row(&self, row_ep: &WorkVector, result: &mut WorkVector) {
        if row_ep.density() < self.options.row_price_density {
            row_price(&self.row_matrix, row_ep, result);
        } else {
            column_price(&self.matrix, &self.basis, row_ep, self.options.parallel_price_threshold, result);
        }
    }

    /// Move nonbasic variables to their opposite bound and update the basic variables.
    ///
    /// # Arguments
    ///
    /// * `variables`: Boxed nonbasic variables to flip.
    pub fn flip_bounds(&mut self, variables: &[usize]) {
        if variables.is_empty() {
            return;
        }

        let mut rhs = WorkVector::new(self.nr_rows);
        for &j in variables {
            debug_assert!(!self.basis.is_basic(j));
            debug_assert!(self.work_range[j].is_finite());

            let (direction, value) = match self.basis.nonbasic_move(j) {
                Move::Up => (Move::Down, self.work_upper[j]),
                _ => (Move::Up, self.work_lower[j]),
            };
            let change = value - self.work_value[j];
            self.basis.set_nonbasic_move(j, direction);
            self.work_value[j] = value;
            for (i, a) in basis_column(&self.matrix, j) {
                rhs.add(i, a * change);
            }
        }
        self.factor.ftran(&mut rhs, self.options.hyper_sparse_density);
        for (position, change) in rhs.iter() {
            self.base_value[position] -= change;
            self.work_value[self.basis.basic_index()[position]] = self.base_value[position];
        }
        self.statistics.bound_flips += variables.len();
    }

    /// Move a single nonbasic variable to its opposite bound.
    pub fn flip_bound(&mut self, variable: usize) {
        self.flip_bounds(&[variable]);
    }

    /// Move the entering variable, and with it the basic variables.
    ///
    /// # Arguments
    ///
    /// * `variable_in`: Nonbasic variable that changes.
    /// * `change`: Change of its value.
    /// * `aq`: Transformed column of the variable.
    pub fn update_primal(&mut self, variable_in: usize, change: f64, aq: &WorkVector) {
        if change == 0_f64 {
            return;
        }
        for (position, value) in aq.iter() {
            self.base_value[position] -= change * value;
            self.work_value[self.basis.basic_index()[position]] = self.base_value[position];
        }
        self.work_value[variable_in] += change;
    }

    /// Update the reduced costs with a multiple of the tableau row.
    pub fn update_dual(&mut self, theta: f64, row_ap: &WorkVector) {
        if theta == 0_f64 {
            return;
        }
        for (j, alpha) in row_ap.iter() {
            if !self.basis.is_basic(j) {
                self.work_dual[j] -= theta * alpha;
            }
        }
    }

    /// Set the reduced cost of a variable.
    pub fn set_work_dual(&mut self, variable: usize, value: f64) {
        self.work_dual[variable] = value;
    }

    /// Check whether a basis change leads to a basis that was visited before in this solve.
    ///
    /// If so, the change is recorded as taboo.
    pub fn is_bad_basis_change(&mut self, variable_in: usize, row_out: usize) -> bool {
        let hash = self.basis.hash_after_change(variable_in, row_out, &self.keys);
        if self.visited.contains(&hash) {
            debug!("Basis change in row {} with variable {} would revisit a basis", row_out, variable_in);
            self.add_bad_basis_change(BadBasisChangeKind::Cycling, row_out, variable_in);
            self.cycles += 1;
            true
        } else {
            false
        }
    }

    /// Allow all recorded basis changes again.
    pub fn clear_taboo(&mut self) {
        self.taboo.clear_taboo();
    }

    /// Number of detected cycles since the last reset.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Forget the visited bases, for example after perturbing the problem.
    pub fn reset_cycle_history(&mut self) {
        self.cycles = 0;
        self.visited.clear();
        self.visited.insert(self.basis.hash());
        self.taboo.clear();
    }

    /// Exchange a basic variable for a nonbasic one.
    ///
    /// The entering variable should already have its new value, see `update_primal`.
    ///
    /// # Arguments
    ///
    /// * `variable_in`: Entering variable.
    /// * `row_out`: Basis position of the leaving variable.
    /// * `move_out`: Bound at which the leaving variable ends up.
    pub fn update_pivots(&mut self, variable_in: usize, row_out: usize, move_out: Move) {
        let value_in = self.work_value[variable_in];
        let variable_out = self.basis.change(variable_in, row_out, move_out, &self.keys);
        self.work_value[variable_out] = move_out.value(self.work_lower[variable_out], self.work_upper[variable_out]);
        self.base_value[row_out] = value_in;
        self.base_lower[row_out] = self.work_lower[variable_in];
        self.base_upper[row_out] = self.work_upper[variable_in];
        self.work_dual[variable_in] = 0_f64;

        self.visited.insert(self.basis.hash());
        self.last_change = Some((row_out, variable_in));
        self.taboo.clear_taboo();
        self.ray.clear();
        self.statistics.iterations += 1;
        if self.pending_primal_reset {
            self.primal_weights.reset(&self.basis);
            self.pending_primal_reset = false;
        }

        if self.options.log_frequency > 0 && self.statistics.iterations % self.options.log_frequency == 0 {
            debug!(
                "Iteration {}: objective {:.10e}",
                self.statistics.iterations, self.objective_value(),
            );
        }
    }

    /// Update the factorization after a basis change.
    ///
    /// When the update is rejected, the factorization is invalidated.
    pub fn update_factor(&mut self, aq: &WorkVector, row_out: usize) -> Result<(), UpdateError> {
        match self.factor.update(aq, row_out) {
            Ok(()) => {
                self.status.updated();
                Ok(())
            },
            Err(error) => {
                warn!("Factor update rejected: {}", error);
                self.status.invalidate_invert();
                Err(error)
            },
        }
    }

    /// Whether the factorization was updated as often as allowed.
    pub fn should_refactor(&self) -> bool {
        self.factor.should_refactor()
    }

    /// Number of updates of the factorization since it was computed.
    pub fn nr_updates(&self) -> usize {
        self.factor.nr_updates()
    }

    /// Invalidate the factorization, such that the next rebuild computes it again.
    pub fn invalidate_invert(&mut self) {
        self.status.invalidate_invert();
    }

    /// Check the iteration limit, time limit and interrupt flag.
    pub fn check_limits(&self) -> Option<ModelStatus> {
        if self.interrupt.load(Ordering::Relaxed) {
            Some(ModelStatus::Interrupt)
        } else if self.statistics.iterations >= self.options.iteration_limit {
            Some(ModelStatus::IterationLimit)
        } else if self.options.time_limit.is_some_and(|limit| self.start.elapsed() >= limit) {
            Some(ModelStatus::TimeLimit)
        } else {
            None
        }
    }

    /// Record a dual ray found by the dual ratio test.
    ///
    /// # Arguments
    ///
    /// * `row`: Basis position of the infeasible basic variable.
    /// * `sign`: `1` when it is below its lower bound, `-1` when it is above its upper bound.
    pub fn record_dual_ray(&mut self, row: usize, sign: f64) {
        self.ray.set(RayKind::Row { row, sign });
    }

    /// Record a dual ray found by primal phase one.
    pub fn record_phase_one_ray(&mut self) {
        self.ray.set(RayKind::PhaseOne);
    }

    /// Record a primal ray found by the primal ratio test.
    pub fn record_primal_ray(&mut self, variable: usize, direction: f64) {
        self.ray.set(RayKind::Column { variable, direction });
    }

    /// The recorded ray.
    pub fn ray(&self) -> &RayRecord {
        &self.ray
    }

    /// Forget the recorded ray.
    pub fn clear_ray(&mut self) {
        self.ray.clear();
    }

    /// Whether the recorded dual ray is a Farkas certificate for the unperturbed bounds.
    ///
    /// The ray is scaled to a largest entry of one, and small entries of it and of `A^T y` are
    /// ignored up to the dual feasibility tolerance.
    pub fn proves_infeasibility(&mut self) -> bool {
        let Some(ray) = self.materialize_dual_ray() else {
            return false;
        };
        let largest = ray.iter().fold(0_f64, |largest, value| largest.max(value.abs()));
        if largest == 0_f64 {
            return false;
        }
        let y = ray.iter().map(|value| value / largest).collect::<Vec<_>>();
        let tolerance = self.options.dual_feasibility_tolerance;

        // Row bounds in terms of the activity, which is minus the logical
        let row_part = y.iter().enumerate()
            .filter(|&(_, &y_i)| y_i.abs() > tolerance)
            .map(|(i, &y_i)| {
                let logical = self.nr_columns + i;
                if y_i > 0_f64 { -y_i * self.lower[logical] } else { -y_i * self.upper[logical] }
            })
            .sum::<f64>();
        let y = y.into_iter()
            .map(|y_i| if y_i.abs() > tolerance { y_i } else { 0_f64 })
            .collect::<Vec<_>>();
        let z = self.matrix.multiply_transposed(&y);
        let column_part = z.iter().enumerate()
            .filter(|&(_, &z_j)| z_j.abs() > tolerance)
            .map(|(j, &z_j)| if z_j > 0_f64 { z_j * self.lower[j] } else { z_j * self.upper[j] })
            .sum::<f64>();

        let gap = row_part - column_part;
        trace!("Farkas gap of the dual ray {:.3e}", gap);
        gap < -self.options.primal_feasibility_tolerance
    }

    /// Compute the dual ray, indexed by row, in terms of the row activities of the program.
    ///
    /// The result `y` satisfies `sup_{r in [L, U]} y^T r < inf_{x in [l, u]} (A^T y)^T x`.
    pub fn materialize_dual_ray(&mut self) -> Option<Vec<f64>> {
        if !self.ray.has_dual_ray() {
            return None;
        }
        if let Some(value) = self.ray.value() {
            return Some(value.to_vec());
        }

        let value = match self.ray.kind() {
            RayKind::Row { row, sign } => {
                let mut row_ep = WorkVector::new(self.nr_rows);
                self.unit_btran(row, &mut row_ep);
                let mut unit = WorkVector::new(self.nr_rows);
                unit.set_unit(row);
                self.factor.refine_btran(&self.matrix, self.basis.basic_index(), &unit, &mut row_ep);
                row_ep.to_dense().into_iter().map(|value| sign * value).collect()
            },
            RayKind::PhaseOne => {
                // Multipliers of the phase one costs: -1 below lower, 1 above upper
                let mut rhs = WorkVector::new(self.nr_rows);
                for row in 0..self.nr_rows {
                    let violation = self.base_violation(row);
                    if violation.abs() > self.options.primal_feasibility_tolerance {
                        rhs.set(row, violation.signum());
                    }
                }
                self.factor.btran(&mut rhs, 1_f64);
                rhs.to_dense().into_iter().map(|value| -value).collect()
            },
            RayKind::Column { .. } | RayKind::None => return None,
        };
        let value = without_noise(value);
        self.ray.cache(value.clone());

        Some(value)
    }

    /// Compute the primal ray, indexed by column.
    ///
    /// Moving from the current solution in the direction of the ray keeps all constraints
    /// satisfied and improves the objective without bound.
    pub fn materialize_primal_ray(&mut self) -> Option<Vec<f64>> {
        let RayKind::Column { variable, direction } = self.ray.kind() else {
            return None;
        };
        if let Some(value) = self.ray.value() {
            return Some(value.to_vec());
        }

        let mut aq = WorkVector::new(self.nr_rows);
        self.ftran_column(variable, &mut aq);
        let mut ray = vec![0_f64; self.nr_total()];
        ray[variable] = direction;
        for (position, value) in aq.iter() {
            ray[self.basis.basic_index()[position]] = -direction * value;
        }
        ray.truncate(self.nr_columns);
        self.ray.cache(ray.clone());

        Some(ray)
    }

    /// Perturb the costs in the direction that makes the reduced costs more dual feasible.
    pub fn perturb_costs(&mut self) {
        let base = self.options.cost_perturbation_base;
        for j in 0..self.nr_columns {
            let (lower, upper) = (self.lower[j], self.upper[j]);
            let direction = match BoundKind::of(lower, upper) {
                BoundKind::Free | BoundKind::Fixed => 0_f64,
                BoundKind::Lower => 1_f64,
                BoundKind::Upper => -1_f64,
                BoundKind::Boxed => match self.basis.nonbasic_move(j) {
                    Move::Down => -1_f64,
                    _ => 1_f64,
                },
            };
            if direction != 0_f64 {
                let amount = base * (1_f64 + self.cost[j].abs()) * (1_f64 + self.rng.r#gen::<f64>());
                self.work_cost[j] = self.cost[j] + direction * amount;
            }
        }

        self.costs_perturbed = true;
        self.statistics.perturbations += 1;
        self.status.costs_changed();
        debug!("Perturbed costs with base {:e}", base);
    }

    /// Widen the bounds of the basic variables randomly.
    pub fn perturb_bounds(&mut self) {
        let base = self.options.bound_perturbation_base;
        for &j in self.basis.basic_index() {
            if self.lower[j] == self.upper[j] {
                continue;
            }
            if self.lower[j].is_finite() {
                let amount = base * (1_f64 + self.lower[j].abs()) * (1_f64 + self.rng.r#gen::<f64>());
                self.work_lower[j] = self.lower[j] - amount;
            }
            if self.upper[j].is_finite() {
                let amount = base * (1_f64 + self.upper[j].abs()) * (1_f64 + self.rng.r#gen::<f64>());
                self.work_upper[j] = self.upper[j] + amount;
            }
        }
        self.update_ranges();
        for (position, &variable) in self.basis.basic_index().iter().enumerate() {
            self.base_lower[position] = self.work_lower[variable];
            self.base_upper[position] = self.work_upper[variable];
        }

        self.bounds_perturbed = true;
        self.statistics.perturbations += 1;
        debug!("Perturbed bounds with base {:e}", base);
    }

    /// Whether costs or bounds are perturbed.
    pub fn is_perturbed(&self) -> bool {
        self.costs_perturbed || self.bounds_perturbed
    }

    /// Restore the original costs and bounds; values need to be recomputed afterwards.
    pub fn remove_perturbations(&mut self) {
        if self.costs_perturbed {
            self.work_cost.copy_from_slice(&self.cost);
            self.costs_perturbed = false;
            self.status.costs_changed();
        }
        if self.bounds_perturbed {
            self.restore_bounds();
            self.bounds_perturbed = false;
        }
    }

    /// Replace the bounds by the boxes of the first phase of the dual simplex method.
    ///
    /// The nonbasic variables are put at the bound that makes their reduced cost feasible.
    pub fn set_artificial_bounds(&mut self) {
        for j in 0..self.nr_total() {
            let (lower, upper) = match BoundKind::of(self.lower[j], self.upper[j]) {
                BoundKind::Free => (-FREE_ARTIFICIAL_BOUND, FREE_ARTIFICIAL_BOUND),
                BoundKind::Lower => (0_f64, 1_f64),
                BoundKind::Upper => (-1_f64, 0_f64),
                BoundKind::Boxed | BoundKind::Fixed => (0_f64, 0_f64),
            };
            self.work_lower[j] = lower;
            self.work_upper[j] = upper;
            if !self.basis.is_basic(j) {
                let direction = if lower == upper {
                    Move::Zero
                } else if self.work_dual[j] >= 0_f64 {
                    Move::Up
                } else {
                    Move::Down
                };
                self.basis.set_nonbasic_move(j, direction);
            }
        }
        self.update_ranges();
        self.status.bounds_changed();
    }

    /// Restore the original bounds.
    pub fn restore_bounds(&mut self) {
        self.work_lower.copy_from_slice(&self.lower);
        self.work_upper.copy_from_slice(&self.upper);
        self.update_ranges();
        self.status.bounds_changed();
    }

    /// Flip boxed nonbasic variables whose reduced cost has the wrong sign.
    ///
    /// # Return value
    ///
    /// The number of dual infeasibilities that could not be removed by flipping.
    pub fn correct_dual_infeasibilities(&mut self) -> usize {
        let tolerance = self.options.dual_feasibility_tolerance;
        let mut to_flip = Vec::new();
        let mut remaining = 0;
        for j in 0..self.nr_total() {
            if self.dual_violation(j) > tolerance {
                if self.work_range[j].is_finite() {
                    to_flip.push(j);
                } else {
                    remaining += 1;
                }
            }
        }
        self.flip_bounds(&to_flip);

        remaining
    }

    /// Whether any primal value is outside its bounds by more than the tolerance.
    pub fn has_primal_infeasibility(&self) -> bool {
        let tolerance = self.options.primal_feasibility_tolerance;
        (0..self.nr_rows).any(|row| self.base_violation(row).abs() > tolerance)
    }

    /// The solution in terms of the program.
    pub fn solution(&self) -> Solution {
        let sense = self.objective.sense();
        let col_value = self.work_value[..self.nr_columns].to_vec();
        let row_value = self.work_value[self.nr_columns..].iter().map(|&s| -s).collect();
        let col_dual = self.work_dual[..self.nr_columns].iter().map(|&d| sense * d).collect();
        let row_dual = self.row_dual.iter().map(|&y| sense * y).collect();
        let objective_value = sense * self.objective_value() + self.offset;

        Solution { col_value, row_value, col_dual, row_dual, objective_value }
    }

    /// The basis described by statuses.
    pub fn basis_statuses(&self) -> Basis {
        self.basis.to_statuses(self.nr_columns, &self.lower, &self.upper)
    }

    /// Replace the basis.
    pub fn set_basis(&mut self, basis: &Basis, lenient: bool) -> Result<(), Error> {
        let basis = SimplexBasis::from_statuses(basis, &self.lower, &self.upper, &self.keys, lenient)?;
        self.install_basis(basis);
        Ok(())
    }

    fn install_basis(&mut self, basis: SimplexBasis) {
        self.basis = basis;
        self.backtracking = None;
        self.last_change = None;
        self.status.new_basis();
        self.ray.clear();
        self.set_nonbasic_values();
    }

    /// Solve with the basis matrix for an arbitrary right-hand side, factorizing if needed.
    ///
    /// The right-hand side is indexed by row, the result by basis position.
    pub fn external_ftran(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        self.ensure_invert()?;
        let mut vector = WorkVector::from_dense(rhs);
        let density = vector.density();
        self.factor.ftran(&mut vector, density);
        Ok(vector.to_dense())
    }

    /// Solve with the transposed basis matrix for an arbitrary right-hand side, factorizing if
    /// needed.
    ///
    /// The right-hand side is indexed by basis position, the result by row.
    pub fn external_btran(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        self.ensure_invert()?;
        let mut vector = WorkVector::from_dense(rhs);
        let density = vector.density();
        self.factor.btran(&mut vector, density);
        Ok(vector.to_dense())
    }

    fn ensure_invert(&mut self) -> Result<(), Error> {
        if !self.status.has_invert() {
            self.factorize().map_err(|Singular| Error::NoInvert)?;
            self.status.invalidate_weights();
        }
        Ok(())
    }

    /// Estimate the accuracy of the current factorization.
    pub fn factor_solve_error(&self) -> f64 {
        self.factor.solve_error(&self.matrix, self.basis.basic_index(), self.statistics.iterations as u64)
    }

    /// Append columns and rows of a program that extends the current one.
    ///
    /// New columns are nonbasic at a bound, new rows are basic in their logical.
    pub fn extend(&mut self, program: &LinearProgram) {
        let nr_new_columns = program.nr_columns() - self.nr_columns;
        let nr_new_rows = program.nr_rows() - self.nr_rows;
        let moves = (self.nr_columns..program.nr_columns())
            .map(|j| Move::default_for(program.col_lower()[j], program.col_upper()[j]))
            .collect::<Vec<_>>();
        let old_nr_columns = self.nr_columns;

        self.load(program);
        self.basis.extend(old_nr_columns, &moves, nr_new_rows, &self.keys);
        self.after_dimension_change();
        debug!("Extended with {} columns and {} rows", nr_new_columns, nr_new_rows);
    }

    /// Remove columns and rows.
    ///
    /// # Arguments
    ///
    /// * `program`: The program after the removal.
    /// * `columns`, `rows`: Sorted indices, in terms of the program before the removal.
    pub fn remove(&mut self, program: &LinearProgram, columns: &[usize], rows: &[usize]) {
        let old_nr_columns = self.nr_columns;
        self.load(program);
        self.basis.remove(old_nr_columns, columns, rows, &self.lower, &self.upper, &self.keys);
        self.after_dimension_change();
        debug!("Removed {} columns and {} rows", columns.len(), rows.len());
    }

    fn load(&mut self, program: &LinearProgram) {
        let fresh = State::new(program, self.options.clone(), Arc::clone(&self.interrupt));
        self.objective = fresh.objective;
        self.offset = fresh.offset;
        self.nr_columns = fresh.nr_columns;
        self.nr_rows = fresh.nr_rows;
        self.matrix = fresh.matrix;
        self.row_matrix = fresh.row_matrix;
        self.cost = fresh.cost;
        self.lower = fresh.lower;
        self.upper = fresh.upper;
        self.work_cost = fresh.work_cost;
        self.work_lower = fresh.work_lower;
        self.work_upper = fresh.work_upper;
        self.work_range = fresh.work_range;
        self.work_value = fresh.work_value;
        self.work_dual = fresh.work_dual;
        self.row_dual = fresh.row_dual;
        self.base_value = fresh.base_value;
        self.base_lower = fresh.base_lower;
        self.base_upper = fresh.base_upper;
        self.keys = fresh.keys;
        self.costs_perturbed = false;
        self.bounds_perturbed = false;
    }

    fn after_dimension_change(&mut self) {
        self.dual_weights = DualEdgeWeights::new(self.nr_rows, &self.options);
        self.backtracking = None;
        self.last_change = None;
        self.status.new_basis();
        self.ray.clear();
        self.set_nonbasic_values();
    }

    /// Change the cost of a column.
    pub fn change_cost(&mut self, column: usize, cost: f64) {
        self.cost[column] = self.objective.sense() * cost;
        self.work_cost[column] = self.cost[column];
        self.status.costs_changed();
        self.ray.clear();
    }

    /// Change the bounds of a column or the logical of a row.
    ///
    /// # Arguments
    ///
    /// * `variable`: Internal variable index.
    /// * `lower`, `upper`: Internal bounds.
    pub fn change_bounds(&mut self, variable: usize, lower: f64, upper: f64) {
        self.lower[variable] = lower;
        self.upper[variable] = upper;
        self.work_lower[variable] = lower;
        self.work_upper[variable] = upper;
        self.work_range[variable] = upper - lower;
        if !self.basis.is_basic(variable) {
            self.set_nonbasic_values();
        }
        self.status.bounds_changed();
        self.ray.clear();
    }

    /// Change a coefficient of the constraint matrix.
    pub fn change_coefficient(&mut self, row: usize, column: usize, value: f64) {
        self.matrix.set(row, column, value);
        self.row_matrix.set(row, column, value);
        self.backtracking = None;
        if self.basis.is_basic(column) {
            self.status.invalidate_invert();
            self.status.invalidate_weights();
        }
        self.status.bounds_changed();
        self.status.costs_changed();
        self.ray.clear();
    }

    /// Whether some bound is crossed: a lower bound above the upper bound.
    pub fn has_crossed_bounds(&self) -> bool {
        self.lower.iter().zip(&self.upper).any(|(l, u)| l > u)
    }

    /// `1` for minimization, `-1` for maximization.
    pub fn sense(&self) -> f64 {
        self.objective.sense()
    }

    /// Make every basis change revisit a basis, by giving all variables the same hash key.
    #[cfg(test)]
    pub(crate) fn collide_basis_hashes(&mut self) {
        self.keys.iter_mut().for_each(|key| *key = 0);
    }

    /// Mark all bases one basis change away from the current one as visited.
    #[cfg(test)]
    pub(crate) fn visit_neighbours(&mut self) {
        for variable in (0..self.nr_total()).filter(|&j| !self.basis.is_basic(j)) {
            for row in 0..self.nr_rows {
                self.visited.insert(self.basis.hash_after_change(variable, row, &self.keys));
            }
        }
    }

    /// Check that the internal data is consistent.
    pub fn is_consistent(&self) -> bool {
        let sizes = [
            self.cost.len(), self.lower.len(), self.upper.len(),
            self.work_cost.len(), self.work_lower.len(), self.work_upper.len(), self.work_range.len(),
            self.work_value.len(), self.work_dual.len(), self.keys.len(),
        ];
        sizes.iter().all(|&size| size == self.nr_total())
            && self.base_value.len() == self.nr_rows
            && self.basis.nr_total() == self.nr_total()
            && self.basis.is_consistent()
    }
}

/// Zero the entries that are small relative to the largest one.
fn without_noise(mut ray: Vec<f64>) -> Vec<f64> {
    let largest = ray.iter().fold(0_f64, |largest, value| largest.max(value.abs()));
    for value in &mut ray {
        if value.abs() <= RAY_RELATIVE_CUTOFF * largest {
            *value = 0_f64;
        }
    }

    ray
}
