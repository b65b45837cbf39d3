//! # Building blocks to describe linear programs.
use std::ops::Not;

/// Direction of optimization.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Objective {
    Maximize,
    #[default]
    Minimize,
}

impl Objective {
    /// Factor that turns costs into costs to minimize.
    pub fn sense(self) -> f64 {
        match self {
            Objective::Minimize => 1_f64,
            Objective::Maximize => -1_f64,
        }
    }
}

impl Not for Objective {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Objective::Minimize => Objective::Maximize,
            Objective::Maximize => Objective::Minimize,
        }
    }
}

/// A variable is either continuous or integer.
///
/// The simplex engine ignores this, it is stored for consumers that solve relaxations.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum VariableType {
    #[default]
    Continuous,
    Integer,
}

impl Not for VariableType {
    type Output = VariableType;

    fn not(self) -> VariableType {
        match self {
            VariableType::Continuous => VariableType::Integer,
            VariableType::Integer => VariableType::Continuous,
        }
    }
}

/// Which of the two bounds of a variable or constraint are finite.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BoundKind {
    /// Neither bound is finite.
    Free,
    /// Only the lower bound is finite.
    Lower,
    /// Only the upper bound is finite.
    Upper,
    /// Both bounds are finite and differ.
    Boxed,
    /// Both bounds are finite and equal.
    Fixed,
}

impl BoundKind {
    /// Classify a pair of bounds.
    pub fn of(lower: f64, upper: f64) -> Self {
        match (lower.is_finite(), upper.is_finite()) {
            (false, false) => BoundKind::Free,
            (true, false) => BoundKind::Lower,
            (false, true) => BoundKind::Upper,
            (true, true) if lower == upper => BoundKind::Fixed,
            (true, true) => BoundKind::Boxed,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::data::linear_program::elements::{BoundKind, Objective};

    #[test]
    fn bound_kind() {
        assert_eq!(BoundKind::of(f64::NEG_INFINITY, f64::INFINITY), BoundKind::Free);
        assert_eq!(BoundKind::of(0_f64, f64::INFINITY), BoundKind::Lower);
        assert_eq!(BoundKind::of(f64::NEG_INFINITY, 3_f64), BoundKind::Upper);
        assert_eq!(BoundKind::of(-1_f64, 3_f64), BoundKind::Boxed);
        assert_eq!(BoundKind::of(3_f64, 3_f64), BoundKind::Fixed);
    }

    #[test]
    fn sense() {
        assert_eq!(Objective::default(), Objective::Minimize);
        assert_eq!((!Objective::Minimize).sense(), -1_f64);
    }
}
