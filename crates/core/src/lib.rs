// Copyright 2025 Irreducible Inc.
//! Core datatypes of the R1CS witness solver.
//!
//! Most importantly it hosts the definition of a [`ConstraintSystem`], the compiled artifact the
//! solver consumes, together with its lazy constraint templates and its persisted forms.

#![warn(missing_docs)]

pub mod coeff_table;
pub mod constraint_system;
pub mod consts;
pub mod error;
pub mod field;
pub mod lazy;
pub mod levels;
mod render;

pub use coeff_table::{CoeffId, CoeffTable};
pub use constraint_system::*;
pub use error::CoreError;
pub use field::Fr;
pub use lazy::{
	LazyIndex, LazyInputs, PatternR1C, PatternTerm, PatternWire, StaticPattern, TemplateKey,
};
pub use levels::compute_levels;
