//! # A bounded revised simplex engine
//!
//! Linear programs with lower and upper bounds on both columns and rows are solved with the
//! primal or the dual simplex method. The basis matrix is kept as an LU factorization that is
//! updated after every basis change; pricing uses dual steepest edge or Devex weights. Programs
//! can be modified and solved again starting from the previous basis, and infeasible or unbounded
//! programs come with a ray proving it.
#![warn(missing_docs)]

pub mod algorithm;
pub mod data;
pub mod error;

#[cfg(test)]
mod tests;
