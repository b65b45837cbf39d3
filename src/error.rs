//! # Error reporting
//!
//! Errors are only produced for malformed input: mismatched dimensions, indices out of range,
//! values that can't describe a linear program and inconsistent warm start bases. Infeasibility,
//! unboundedness, limits and numerical failure are not errors, they are reported through a
//! `ModelStatus`.
use std::error;
use std::fmt;
use std::fmt::Display;

/// Something was wrong with the data handed to this crate.
///
/// Whenever an operation returns this error, nothing was modified.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lengths of arrays that describe the same set of columns or rows don't agree.
    Dimension {
        /// Name of the offending array.
        what: &'static str,
        /// Length that was required.
        expected: usize,
        /// Length that was provided.
        actual: usize,
    },
    /// An index refers to a column, row or variable that doesn't exist.
    IndexOutOfRange {
        /// What kind of index it is.
        what: &'static str,
        /// The index.
        index: usize,
        /// Number of valid indices.
        len: usize,
    },
    /// A value is NaN, or otherwise not usable at its position.
    ///
    /// Examples are an infinite cost or a lower bound of positive infinity.
    InvalidValue {
        /// Name of the array the value is in.
        what: &'static str,
        /// Position of the value in that array.
        index: usize,
    },
    /// A warm start basis doesn't describe a basis of the problem.
    InvalidBasis(String),
    /// A basis solve was requested, but no factorization could be computed.
    NoInvert,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Dimension { what, expected, actual } => write!(
                f, "dimension mismatch for {}: expected length {}, got {}", what, expected, actual,
            ),
            Error::IndexOutOfRange { what, index, len } => write!(
                f, "{} index {} out of range, there are {}", what, index, len,
            ),
            Error::InvalidValue { what, index } => write!(
                f, "invalid value in {} at position {}", what, index,
            ),
            Error::InvalidBasis(reason) => write!(f, "invalid basis: {}", reason),
            Error::NoInvert => f.write_str("no factorization of the basis matrix available"),
        }
    }
}

impl error::Error for Error {}

/// Check that an array has the expected length.
pub(crate) fn check_len<T>(what: &'static str, values: &[T], expected: usize) -> Result<(), Error> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(Error::Dimension { what, expected, actual: values.len() })
    }
}

/// Check that an index is in range.
pub(crate) fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), Error> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { what, index, len })
    }
}

/// Check a pair of bound arrays.
///
/// A lower bound can't be positive infinity, an upper bound can't be negative infinity and no bound
/// can be NaN. A lower bound above an upper bound is allowed, that is an infeasible problem, not a
/// malformed one.
pub(crate) fn check_bounds(
    what: &'static str,
    lower: &[f64],
    upper: &[f64],
) -> Result<(), Error> {
    check_len(what, upper, lower.len())?;

    for (index, (&l, &u)) in lower.iter().zip(upper).enumerate() {
        if l.is_nan() || u.is_nan() || l == f64::INFINITY || u == f64::NEG_INFINITY {
            return Err(Error::InvalidValue { what, index });
        }
    }

    Ok(())
}

/// Check that all values are finite.
pub(crate) fn check_finite(what: &'static str, values: &[f64]) -> Result<(), Error> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(index) => Err(Error::InvalidValue { what, index }),
    }
}

#[cfg(test)]
mod test {
    use crate::error::{check_bounds, check_finite, check_len, Error};

    #[test]
    fn lengths() {
        assert!(check_len("cost", &[1_f64, 2_f64], 2).is_ok());
        assert_eq!(
            check_len("cost", &[1_f64], 2),
            Err(Error::Dimension { what: "cost", expected: 2, actual: 1 }),
        );
    }

    #[test]
    fn bounds() {
        assert!(check_bounds("col", &[f64::NEG_INFINITY, 0_f64], &[1_f64, f64::INFINITY]).is_ok());
        // Crossing bounds are an infeasible problem, not an error
        assert!(check_bounds("col", &[2_f64], &[1_f64]).is_ok());
        assert_eq!(
            check_bounds("col", &[f64::INFINITY], &[f64::INFINITY]),
            Err(Error::InvalidValue { what: "col", index: 0 }),
        );
        assert!(check_bounds("col", &[0_f64], &[f64::NAN]).is_err());
    }

    #[test]
    fn finite() {
        assert!(check_finite("cost", &[0_f64, -3.5]).is_ok());
        assert_eq!(check_finite("cost", &[0_f64, f64::NAN]), Err(Error::InvalidValue { what: "cost", index: 1 }));
    }
}
