//! # Pricing
//!
//! Edge weights that scale the candidates of the pivoting rules, and the computation of a row of
//! the simplex tableau.
use log::{debug, trace};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::algorithm::simplex::basis::SimplexBasis;
use crate::algorithm::simplex::factor::Factor;
use crate::algorithm::simplex::options::{DualEdgeWeightStrategy, Options};
use crate::data::linear_algebra::matrix::{ColumnMatrix, RowMatrix};
use crate::data::linear_algebra::vector::WorkVector;

/// Updated steepest edge weights are kept at least this large.
const MIN_WEIGHT: f64 = 1e-4;
/// Primal Devex weights are reset when one grows beyond this.
const MAX_DEVEX_WEIGHT: f64 = 1e6;
/// Number of iterations after which the density of the extra solve is evaluated.
const DEVEX_SWITCH_ITERATIONS: usize = 10;
/// Weight of the newest observation in running averages.
const AVERAGE_WEIGHT: f64 = 0.05;

/// Weights of the rows in the dual simplex method.
///
/// With steepest edge pricing, the weight of row `r` is `||e_r^T B^-1||^2`.
#[derive(Debug, Clone)]
pub struct DualEdgeWeights {
    strategy: DualEdgeWeightStrategy,
    weights: Vec<f64>,

    error_limit: f64,
    /// Running average of `|ln(updated / computed)|`.
    edge_weight_error: f64,
    recompute: bool,

    switch_density: f64,
    /// Running average of the density of the `B^-1 row_ep` solves.
    tau_density: f64,
    nr_updates: usize,
}

impl DualEdgeWeights {
    /// Create unit weights.
    pub fn new(m: usize, options: &Options) -> Self {
        Self {
            strategy: options.dual_edge_weight_strategy,
            weights: vec![1_f64; m],

            error_limit: options.edge_weight_error_limit,
            edge_weight_error: 0_f64,
            recompute: false,

            switch_density: options.devex_switch_density,
            tau_density: 0_f64,
            nr_updates: 0,
        }
    }

    /// Whether the exact steepest edge update is maintained.
    pub fn is_steepest_edge(&self) -> bool {
        matches!(self.strategy, DualEdgeWeightStrategy::SteepestEdge | DualEdgeWeightStrategy::Choose)
    }

    /// Strategy currently in use.
    pub fn strategy(&self) -> DualEdgeWeightStrategy {
        self.strategy
    }

    /// Initialize the weights for the current basis.
    ///
    /// Steepest edge weights are computed exactly with one solve per row, the other strategies
    /// start from unit weights.
    pub fn initialize(&mut self, factor: &Factor) {
        let m = factor.m();
        if self.is_steepest_edge() {
            let mut row_ep = WorkVector::new(m);
            self.weights = (0..m)
                .map(|row| {
                    row_ep.set_unit(row);
                    factor.btran(&mut row_ep, 0_f64);
                    row_ep.norm2()
                })
                .collect();
        } else {
            self.weights = vec![1_f64; m];
        }

        self.edge_weight_error = 0_f64;
        self.recompute = false;
        trace!("Initialized {} dual edge weights ({:?})", m, self.strategy);
    }

    /// Weight of a row.
    pub fn weight(&self, row: usize) -> f64 {
        self.weights[row]
    }

    /// Compare an updated weight with the exact one and use the exact one from now on.
    ///
    /// When the updates have been inaccurate for a while, the weights are recomputed at the next
    /// rebuild.
    pub fn assess_error(&mut self, row: usize, computed: f64) {
        let updated = self.weights[row];
        if computed > 0_f64 && updated > 0_f64 {
            let error = (updated / computed).ln().abs();
            self.edge_weight_error = (1_f64 - AVERAGE_WEIGHT) * self.edge_weight_error + AVERAGE_WEIGHT * error;
            if self.edge_weight_error > self.error_limit && !self.recompute {
                debug!("Dual edge weight error {:.3} exceeds limit, recomputing at next rebuild", self.edge_weight_error);
                self.recompute = true;
            }
        }
        self.weights[row] = computed;
    }

    /// Whether the weights should be computed again from scratch.
    pub fn needs_recompute(&self) -> bool {
        self.recompute
    }

    /// Update the weights after a basis change with the steepest edge formula.
    ///
    /// # Arguments
    ///
    /// * `aq`: Transformed entering column, indexed by basis position.
    /// * `row_out`: Pivot row.
    /// * `tau`: `B^-1 row_ep` with `row_ep` the pivot row of `B^-1`, before the basis change.
    pub fn update_steepest_edge(&mut self, aq: &WorkVector, row_out: usize, tau: &WorkVector) {
        let alpha = aq.get(row_out);
        let pivot_weight = self.weights[row_out];

        for (i, value) in aq.iter() {
            if i == row_out {
                continue;
            }
            let ratio = value / alpha;
            let updated = self.weights[i] - 2_f64 * ratio * tau.get(i) + ratio * ratio * pivot_weight;
            self.weights[i] = updated.max(MIN_WEIGHT);
        }
        self.weights[row_out] = (pivot_weight / (alpha * alpha)).max(MIN_WEIGHT);

        self.tau_density = (1_f64 - AVERAGE_WEIGHT) * self.tau_density + AVERAGE_WEIGHT * tau.density();
        self.nr_updates += 1;
    }

    /// Update the weights after a basis change with the Devex reference framework.
    pub fn update_devex(&mut self, aq: &WorkVector, row_out: usize) {
        let alpha = aq.get(row_out);
        let pivot_weight = self.weights[row_out];

        for (i, value) in aq.iter() {
            if i == row_out {
                continue;
            }
            let ratio = value / alpha;
            self.weights[i] = self.weights[i].max(ratio * ratio * pivot_weight);
        }
        self.weights[row_out] = (pivot_weight / (alpha * alpha)).max(1_f64);
        self.nr_updates += 1;
    }

    /// Whether the steepest edge solves turned out too dense to be worth it.
    pub fn should_switch_to_devex(&self) -> bool {
        self.strategy == DualEdgeWeightStrategy::Choose
            && self.nr_updates >= DEVEX_SWITCH_ITERATIONS
            && self.tau_density > self.switch_density
    }

    /// Continue with Devex weights, restarting the reference framework.
    pub fn switch_to_devex(&mut self) {
        debug!(
            "Switching from dual steepest edge to Devex after {} updates, average density {:.3}",
            self.nr_updates, self.tau_density,
        );
        self.strategy = DualEdgeWeightStrategy::Devex;
        self.weights.iter_mut().for_each(|weight| *weight = 1_f64);
    }
}

/// Devex weights of the variables in the primal simplex method.
#[derive(Debug, Clone, Default)]
pub struct PrimalDevexWeights {
    weights: Vec<f64>,
    /// Whether each variable is in the reference framework.
    reference: Vec<bool>,
    nr_resets: usize,
}

impl PrimalDevexWeights {
    /// Start a new reference framework consisting of the nonbasic variables.
    pub fn reset(&mut self, basis: &SimplexBasis) {
        let nr_total = basis.nr_total();
        self.weights = vec![1_f64; nr_total];
        self.reference = (0..nr_total).map(|j| !basis.is_basic(j)).collect();
        self.nr_resets += 1;
    }

    /// Weight of a variable.
    pub fn weight(&self, variable: usize) -> f64 {
        self.weights[variable]
    }

    /// Number of times the framework was started.
    pub fn nr_resets(&self) -> usize {
        self.nr_resets
    }

    /// Update the weights after a basis change.
    ///
    /// # Arguments
    ///
    /// * `basis`: Basis before the change.
    /// * `variable_in`: Entering variable.
    /// * `aq`: Transformed entering column, indexed by basis position.
    /// * `row_out`: Pivot row.
    /// * `row_ap`: Pivot row of the tableau, indexed by variable.
    ///
    /// # Return value
    ///
    /// Whether the weights grew too large and the framework should be reset.
    pub fn update(
        &mut self,
        basis: &SimplexBasis,
        variable_in: usize,
        aq: &WorkVector,
        row_out: usize,
        row_ap: &WorkVector,
    ) -> bool {
        // Reference norm of the entering column
        let mut entering_weight = aq.iter()
            .filter(|&(i, _)| self.reference[basis.basic_index()[i]])
            .map(|(_, value)| value * value)
            .sum::<f64>();
        if self.reference[variable_in] {
            entering_weight += 1_f64;
        }
        let entering_weight = entering_weight.max(self.weights[variable_in]);
        let alpha = aq.get(row_out);

        for (j, value) in row_ap.iter() {
            if j == variable_in || basis.is_basic(j) {
                continue;
            }
            let ratio = value / alpha;
            self.weights[j] = self.weights[j].max(ratio * ratio * entering_weight);
        }
        let variable_out = basis.basic_index()[row_out];
        self.weights[variable_out] = (entering_weight / (alpha * alpha)).max(1_f64);
        self.weights[variable_in] = 1_f64;

        self.weights[variable_out] > MAX_DEVEX_WEIGHT
            || row_ap.iter().any(|(j, _)| self.weights[j] > MAX_DEVEX_WEIGHT)
    }
}

/// Compute the tableau row `row_ep^T A` for the nonbasic variables, one column at a time.
///
/// Fans out over threads when there are at least `parallel_threshold` columns. Entries of basic
/// variables are zero.
///
/// # Arguments
///
/// * `matrix`: Structural columns.
/// * `basis`: Current basis.
/// * `row_ep`: Row of `B^-1`, indexed by row.
/// * `parallel_threshold`: Number of columns from which to use threads.
/// * `result`: Indexed by variable, `n + m` long.
pub fn column_price(
    matrix: &ColumnMatrix,
    basis: &SimplexBasis,
    row_ep: &WorkVector,
    parallel_threshold: usize,
    result: &mut WorkVector,
) {
    let nr_columns = matrix.nr_columns();
    let dense = row_ep.array();
    let price = |j: usize| {
        if basis.is_basic(j) {
            0_f64
        } else {
            matrix.major_dot(j, dense)
        }
    };

    let structural = if nr_columns >= parallel_threshold {
        (0..nr_columns).into_par_iter().map(price).collect::<Vec<_>>()
    } else {
        (0..nr_columns).map(price).collect::<Vec<_>>()
    };

    result.clear();
    for (j, value) in structural.into_iter().enumerate() {
        if value != 0_f64 {
            result.set(j, value);
        }
    }
    for (i, value) in row_ep.iter() {
        if !basis.is_basic(nr_columns + i) {
            result.set(nr_columns + i, value);
        }
    }
}

/// Compute the tableau row `row_ep^T A` by scattering the rows of the matrix.
///
/// Only touches the rows in which `row_ep` is nonzero. Entries of basic variables are not
/// removed.
///
/// # Arguments
///
/// * `rows`: Row-wise copy of the structural columns.
/// * `row_ep`: Row of `B^-1`, indexed by row.
/// * `result`: Indexed by variable, `n + m` long.
pub fn row_price(rows: &RowMatrix, row_ep: &WorkVector, result: &mut WorkVector) {
    let nr_columns = rows.nr_columns();

    result.clear();
    for (i, multiplier) in row_ep.iter() {
        for &(j, value) in rows.row(i) {
            result.add(j, multiplier * value);
        }
        result.set(nr_columns + i, multiplier);
    }
}
