// Copyright 2025 Irreducible Inc.

//! Witness solver for rank-1 constraint systems.
//!
//! Given a compiled [`ConstraintSystem`] and its public and secret inputs, [`solve`] computes
//! every internal wire and the values `a`, `b`, `c` of the `L`, `R` and `O` parts of each
//! constraint, checking `a ⋅ b = c` along the way.
//!
//! # Solving
//!
//! Constraints are grouped into levels. Every constraint of a level has at most one unknown
//! wire once the previous levels are solved, besides wires produced by hints. The solver walks
//! the levels in order; large levels are split into contiguous chunks solved on a per-solve
//! thread pool. A wire is assigned exactly once, through [`Solution::set`].
//!
//! Hints are registered in the [`HintRegistry`] of the [`SolverConfig`]. A hint call runs the
//! first time one of its outputs is needed and assigns every output of the call.
//!
//! [`ConstraintSystem`]: r1cs_core::ConstraintSystem

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hints;
pub mod resolve;
pub mod scheduler;
pub mod solution;
mod solve;

pub use config::{CircuitLogger, SolverConfig, TracingLogger};
pub use error::{HintError, SolveError};
pub use hints::{FnHint, Hint, HintRegistry};
pub use solution::Solution;
pub use solve::{SolveFailure, is_solved, solve};
