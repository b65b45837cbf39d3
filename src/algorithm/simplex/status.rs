//! # Status of a solve
//!
//! Terminal outcomes, the phases an engine moves through, the validity flags of the cached data
//! and counters describing the work done.
use std::fmt;

use enum_map::{Enum, EnumMap};

/// Outcome of a solve.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ModelStatus {
    /// No solve has completed yet.
    #[default]
    NotSet,
    /// An optimal basis was found.
    Optimal,
    /// There is no feasible solution; a dual ray proves it.
    Infeasible,
    /// The objective can be improved without bound; a primal ray proves it.
    Unbounded,
    /// The dual problem is infeasible, the primal problem was not examined.
    UnboundedOrInfeasible,
    /// The time limit was reached.
    TimeLimit,
    /// The iteration limit was reached.
    IterationLimit,
    /// The caller requested to stop.
    Interrupt,
    /// The basis matrix could not be factorized accurately.
    SolveError,
    /// The solve ended without a certified outcome, for example because cycling could not be
    /// broken or the final optimality check failed.
    Unknown,
}

impl ModelStatus {
    /// Whether the status is a proven outcome of the problem, as opposed to a reason to stop.
    pub fn is_proven(self) -> bool {
        matches!(self, ModelStatus::Optimal | ModelStatus::Infeasible | ModelStatus::Unbounded)
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStatus::NotSet => "not set",
            ModelStatus::Optimal => "optimal",
            ModelStatus::Infeasible => "infeasible",
            ModelStatus::Unbounded => "unbounded",
            ModelStatus::UnboundedOrInfeasible => "unbounded or infeasible",
            ModelStatus::TimeLimit => "time limit",
            ModelStatus::IterationLimit => "iteration limit",
            ModelStatus::Interrupt => "interrupt",
            ModelStatus::SolveError => "solve error",
            ModelStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Phase of a simplex method.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    /// Searching for a feasible basis.
    One,
    /// Optimizing from a feasible basis.
    Two,
}

/// Why an engine stopped iterating.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// Primal and dual feasible for the current costs and bounds, confirmed with a fresh
    /// factorization.
    Optimal,
    /// A dual ray was recorded.
    Infeasible,
    /// Infeasibility was detected, but the dual ray doesn't prove it.
    Unproven,
    /// A primal ray was recorded.
    Unbounded,
    /// The first phase of the dual simplex method could not remove all dual infeasibilities.
    DualInfeasible,
    /// Too many cycles were detected.
    Cycling,
    /// A limit, an interrupt or a numerical failure.
    Stopped(ModelStatus),
}

/// Reasons to recompute everything from a fresh factorization.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Enum)]
pub enum RebuildReason {
    /// First rebuild of a solve.
    Initial,
    /// The factorization was updated as often as allowed.
    UpdateLimitReached,
    /// Pivots computed in two ways disagreed.
    NumericalTrouble,
    /// No improving candidate was found, to be confirmed.
    PossiblyOptimal,
    /// The primal ratio test found no bound, to be confirmed.
    PossiblyPrimalUnbounded,
    /// The dual ratio test found no bound, to be confirmed.
    PossiblyDualUnbounded,
    /// The update reported a pivot too small to use.
    PossiblySingularBasis,
    /// Primal values drifted out of their bounds in the primal simplex method.
    PrimalInfeasibleInPrimalSimplex,
    /// No entering candidate was found without taboo.
    ChooseColumnFail,
    /// A basis change was rejected.
    BadBasisChange,
    /// Perturbations were removed.
    CleanUp,
}

/// Validity of the factorization of the basis matrix.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum InvertState {
    /// There is no factorization of the current basis.
    #[default]
    None,
    /// Factorized from scratch for the current basis.
    Fresh,
    /// Factorized from scratch and updated this many times since.
    Updated(usize),
}

/// Validity of cached primal or dual values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ValueState {
    /// Need to be recomputed.
    #[default]
    Stale,
    /// Consistent with the current basis and data.
    Fresh,
}

/// Validity of the pricing weights.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum WeightState {
    /// Need to be initialized.
    #[default]
    None,
    /// Maintained for the current basis.
    Valid,
}

/// The validity flags of the data an engine caches.
///
/// All changes go through the methods, which only allow the legal transitions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Status {
    has_basis: bool,
    invert: InvertState,
    primal: ValueState,
    dual: ValueState,
    weights: WeightState,
}

impl Status {
    /// A basis was set or reset; nothing derived from it is valid.
    pub fn new_basis(&mut self) {
        *self = Status { has_basis: true, ..Status::default() };
    }

    /// The basis matrix was factorized from scratch.
    pub fn factorized(&mut self) {
        debug_assert!(self.has_basis);

        self.invert = InvertState::Fresh;
    }

    /// The factorization was updated after a basis change.
    pub fn updated(&mut self) {
        self.invert = match self.invert {
            InvertState::None => InvertState::None,
            InvertState::Fresh => InvertState::Updated(1),
            InvertState::Updated(count) => InvertState::Updated(count + 1),
        };
    }

    /// The factorization no longer represents the basis matrix.
    pub fn invalidate_invert(&mut self) {
        self.invert = InvertState::None;
    }

    /// Primal and dual values were computed.
    pub fn values_computed(&mut self) {
        debug_assert_ne!(self.invert, InvertState::None);

        self.primal = ValueState::Fresh;
        self.dual = ValueState::Fresh;
    }

    /// Costs changed, dual values are no longer valid.
    pub fn costs_changed(&mut self) {
        self.dual = ValueState::Stale;
    }

    /// Bounds changed, primal values are no longer valid.
    pub fn bounds_changed(&mut self) {
        self.primal = ValueState::Stale;
    }

    /// Pricing weights were initialized for the current basis.
    pub fn weights_computed(&mut self) {
        debug_assert!(self.has_basis);

        self.weights = WeightState::Valid;
    }

    /// Pricing weights no longer correspond to the basis or the dimensions.
    pub fn invalidate_weights(&mut self) {
        self.weights = WeightState::None;
    }

    /// Whether there is a basis.
    pub fn has_basis(&self) -> bool {
        self.has_basis
    }

    /// Whether there is a factorization of the current basis matrix.
    pub fn has_invert(&self) -> bool {
        self.invert != InvertState::None
    }

    /// Whether the factorization was computed from scratch without updates since.
    pub fn has_fresh_invert(&self) -> bool {
        self.invert == InvertState::Fresh
    }

    /// Whether primal and dual values are valid.
    pub fn has_fresh_values(&self) -> bool {
        self.primal == ValueState::Fresh && self.dual == ValueState::Fresh
    }

    /// The factorization state.
    pub fn invert(&self) -> InvertState {
        self.invert
    }

    /// Whether the pricing weights are valid.
    pub fn has_weights(&self) -> bool {
        self.weights == WeightState::Valid
    }
}

/// Counters describing the work of a solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    /// Basis changes and bound flips of the entering variable.
    pub iterations: usize,
    /// Bound flips performed by the dual ratio test.
    pub bound_flips: usize,
    /// Factorizations from scratch.
    pub factorizations: usize,
    /// Factorizations that found a singular basis matrix.
    pub rank_deficiencies: usize,
    /// Returns to the last nonsingular basis after a singular factorization.
    pub backtracks: usize,
    /// Rejected basis changes.
    pub bad_basis_changes: usize,
    /// Number of times the costs or bounds were perturbed.
    pub perturbations: usize,
    /// Switches from steepest edge to Devex pricing.
    pub devex_switches: usize,
    /// Rebuilds, per reason.
    pub rebuilds: EnumMap<RebuildReason, usize>,
}

#[cfg(test)]
mod test {
    use crate::algorithm::simplex::status::{InvertState, ModelStatus, RebuildReason, Statistics, Status};

    #[test]
    fn transitions() {
        let mut status = Status::default();
        assert!(!status.has_basis());
        status.new_basis();
        assert!(status.has_basis());
        assert!(!status.has_invert());

        status.factorized();
        assert!(status.has_fresh_invert());
        status.updated();
        status.updated();
        assert_eq!(status.invert(), InvertState::Updated(2));
        status.values_computed();
        assert!(status.has_fresh_values());
        status.costs_changed();
        assert!(!status.has_fresh_values());

        status.weights_computed();
        assert!(status.has_weights());
        status.invalidate_invert();
        status.updated();
        assert!(!status.has_invert());
        status.new_basis();
        assert!(!status.has_weights());
    }

    #[test]
    fn counters() {
        let mut statistics = Statistics::default();
        statistics.rebuilds[RebuildReason::Initial] += 1;
        statistics.rebuilds[RebuildReason::Initial] += 1;
        assert_eq!(statistics.rebuilds[RebuildReason::Initial], 2);
        assert_eq!(statistics.rebuilds[RebuildReason::CleanUp], 0);
    }

    #[test]
    fn display() {
        assert_eq!(ModelStatus::UnboundedOrInfeasible.to_string(), "unbounded or infeasible");
        assert!(ModelStatus::Optimal.is_proven());
        assert!(!ModelStatus::Unknown.is_proven());
    }
}
