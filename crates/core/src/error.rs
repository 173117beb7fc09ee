// Copyright 2025 Irreducible Inc.
//! Hosts error definitions for the core crate.

use r1cs_utils::SerializationError;

use crate::{constraint_system::WireId, lazy::TemplateKey};

/// Constraint system related error.
#[allow(missing_docs)] // errors are self-documenting
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
	#[error("serialization error: {0}")]
	Serialization(#[from] SerializationError),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("coefficient table JSON error: {0}")]
	Json(#[from] serde_json::Error),
	#[error("coefficient #{id} is not a valid field element: {value:?}")]
	InvalidCoefficient { id: u32, value: String },
	#[error("coefficient table is missing id {id}")]
	MissingCoefficient { id: u32 },
	#[error("reserved coefficient #{id} has an unexpected value")]
	ReservedCoefficientMismatch { id: u32 },
	#[error("layout with {n_public} public wires and {n_wires} wires in total is invalid")]
	InvalidLayout { n_public: usize, n_wires: usize },
	#[error("wire {wire:?} is out of range, the system has {n_wires} wires")]
	OutOfRangeWire { wire: WireId, n_wires: usize },
	#[error("coefficient #{coeff} is out of range, the table has {len} entries")]
	OutOfRangeCoefficient { coeff: u32, len: usize },
	#[error("hint output {wire:?} is not an internal wire")]
	InvalidHintOutput { wire: WireId },
	#[error("level entry {index} does not name a constraint")]
	InvalidLevelEntry { index: usize },
	#[error("debug entry for constraint {constraint} is out of range")]
	InvalidDebugEntry { constraint: usize },
	#[error(
		"template wire {wire:?} is neither the one wire, an input, nor an internal wire at or \
		 after {base:?}"
	)]
	MalformedTemplate { wire: WireId, base: WireId },
	#[error("pattern for {key:?} reads input #{input}, past the template inputs")]
	InvalidPatternInput { key: TemplateKey, input: u32 },
	#[error("no static pattern is registered for {key:?}")]
	MissingPattern { key: TemplateKey },
	#[error("the constraint count of {key:?} templates is unknown")]
	MissingTemplateSpan { key: TemplateKey },
	#[error("lazy instance at {loc} does not match the pattern of its template")]
	TemplateMismatch { loc: usize },
	#[error("lazy map entry {entry} does not name a constraint of a lazy instance")]
	InvalidLazyEntry { entry: usize },
	#[error("lazy instance at {loc} spans {len} constraints, past the {n_constraints} available")]
	LazyOutOfRange {
		loc: usize,
		len: usize,
		n_constraints: usize,
	},
	#[error("lazy instances overlap at constraint {loc}")]
	LazyOverlap { loc: usize },
	#[error("the constraint system is already lazified")]
	AlreadyLazified,
}
