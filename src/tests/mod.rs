//! # Linear programs shared by the unit tests.
//!
//! Each module has a `create` function building the program and constants describing its
//! optimum.
pub mod problem_2;
