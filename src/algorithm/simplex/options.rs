//! # Configuration
//!
//! All thresholds of the simplex engine. The defaults are reasonable for most problems; none of
//! them is needed for correctness, they only influence speed and robustness.
use std::time::Duration;

/// Which simplex algorithm to run first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Algorithm {
    /// Dual simplex, switching to primal simplex for cleanup or on dual infeasibility.
    #[default]
    Dual,
    /// Primal simplex, switching to dual simplex for cleanup.
    Primal,
    /// Primal simplex when the starting basis is primal feasible, dual simplex otherwise.
    Choose,
}

/// Pricing weights used by the dual simplex method to choose a leaving row.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum DualEdgeWeightStrategy {
    /// Unit weights.
    Dantzig,
    /// Devex reference framework weights.
    Devex,
    /// Exact dual steepest edge weights, updated incrementally.
    SteepestEdge,
    /// Steepest edge, switching to Devex when its solves turn out to be too dense.
    #[default]
    Choose,
}

/// Pricing weights used by the primal simplex method to choose an entering column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PrimalEdgeWeightStrategy {
    /// Unit weights.
    Dantzig,
    /// Devex reference framework weights.
    #[default]
    Devex,
}

/// Whether to solve the dual of the problem instead.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum DualizeStrategy {
    /// Never.
    #[default]
    Off,
    /// Always.
    On,
    /// When the problem has many more rows than columns.
    Choose,
}

/// Configuration of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Algorithm to start with.
    pub algorithm: Algorithm,
    /// Pricing in the dual simplex method.
    pub dual_edge_weight_strategy: DualEdgeWeightStrategy,
    /// Pricing in the primal simplex method.
    pub primal_edge_weight_strategy: PrimalEdgeWeightStrategy,

    /// Largest bound violation of a basic variable that is considered feasible.
    pub primal_feasibility_tolerance: f64,
    /// Largest reduced cost of the wrong sign that is considered dual feasible.
    pub dual_feasibility_tolerance: f64,
    /// Smallest absolute value of an acceptable simplex pivot.
    pub pivot_tolerance: f64,

    /// Relative threshold in the partial pivoting of the factorization, in `(0, 1]`.
    pub factor_pivot_threshold: f64,
    /// Values below this are not accepted as pivot in the factorization.
    pub factor_pivot_tolerance: f64,
    /// Number of basis updates after which the basis matrix is factorized again.
    pub update_limit: usize,

    /// Relative difference between the pivot computed from the column and from the row above which
    /// the factorization is considered inaccurate.
    pub numerical_trouble_tolerance: f64,
    /// Number of consecutive numerical failures after which the solve is given up.
    pub max_numerical_retries: usize,

    /// Average error of updated steepest edge weights above which all weights are recomputed.
    pub edge_weight_error_limit: f64,
    /// Average density of the extra steepest edge solve above which Devex is used instead.
    pub devex_switch_density: f64,

    /// Expected result density below which the basis solves use the hyper-sparse traversal.
    pub hyper_sparse_density: f64,
    /// Density of the btran result below which the tableau row is computed row-wise.
    pub row_price_density: f64,
    /// Number of columns from which column-wise pricing is fanned out over threads.
    pub parallel_price_threshold: usize,

    /// Number of bad basis changes remembered.
    pub taboo_capacity: usize,
    /// Number of detected cycles after which the problem is perturbed.
    pub cycling_escalation_limit: usize,
    /// Whether to perturb the costs before starting the dual simplex method.
    pub perturb_costs: bool,
    /// Base magnitude of cost perturbations.
    pub cost_perturbation_base: f64,
    /// Base magnitude of bound perturbations.
    pub bound_perturbation_base: f64,

    /// Maximum number of simplex iterations.
    pub iteration_limit: usize,
    /// Maximum wall clock time of a solve.
    pub time_limit: Option<Duration>,

    /// Whether to solve the dual problem.
    pub dualize: DualizeStrategy,
    /// With `DualizeStrategy::Choose`, dualize when the number of rows exceeds this multiple of the
    /// number of columns.
    pub dualize_ratio: f64,
    /// Whether to randomly reorder the columns before solving.
    pub permute: bool,

    /// Seed for perturbations, permutations and basis hashing.
    pub random_seed: u64,
    /// Number of iterations between two progress log lines.
    pub log_frequency: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            dual_edge_weight_strategy: DualEdgeWeightStrategy::default(),
            primal_edge_weight_strategy: PrimalEdgeWeightStrategy::default(),

            primal_feasibility_tolerance: 1e-7,
            dual_feasibility_tolerance: 1e-7,
            pivot_tolerance: 1e-7,

            factor_pivot_threshold: 0.1,
            factor_pivot_tolerance: 1e-10,
            update_limit: 100,

            numerical_trouble_tolerance: 1e-7,
            max_numerical_retries: 5,

            edge_weight_error_limit: 4_f64,
            devex_switch_density: 0.3,

            hyper_sparse_density: 0.1,
            row_price_density: 0.1,
            parallel_price_threshold: 10_000,

            taboo_capacity: 32,
            cycling_escalation_limit: 10,
            perturb_costs: false,
            cost_perturbation_base: 5e-7,
            bound_perturbation_base: 5e-7,

            iteration_limit: usize::MAX,
            time_limit: None,

            dualize: DualizeStrategy::default(),
            dualize_ratio: 10_f64,
            permute: false,

            random_seed: 0x5eed,
            log_frequency: 1000,
        }
    }
}
