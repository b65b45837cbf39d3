//! # Data structures
//!
//! Sparse linear algebra and the in-memory form of a linear program, together with its
//! solutions, bases and the transformations applied before solving.

pub mod linear_algebra;
pub mod linear_program;
