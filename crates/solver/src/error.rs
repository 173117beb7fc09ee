// Copyright 2025 Irreducible Inc.
//! Error definitions for the solver crate.

use r1cs_core::HintId;

/// Error returned by a hint function.
#[allow(missing_docs)] // errors are self-documenting
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintError {
	#[error("expected {expected} inputs, got {got}")]
	InputCount { expected: usize, got: usize },
	#[error("expected {expected} outputs, got {got}")]
	OutputCount { expected: usize, got: usize },
	#[error("no hint is registered under {0:?}")]
	NotRegistered(HintId),
	#[error("{0}")]
	Failed(String),
}

/// Error returned when a witness cannot be solved.
#[allow(missing_docs)] // errors are self-documenting
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
	#[error("invalid witness size, got {got}, expected {expected}")]
	WitnessLength { expected: usize, got: usize },
	#[error("invalid result vector size, got {got}, expected {expected}")]
	OutputLength { expected: usize, got: usize },
	#[error(
		"constraint #{constraint} is not satisfied: {message}{}",
		render_debug_info(.debug_info)
	)]
	UnsatisfiedConstraint {
		constraint: usize,
		message: String,
		debug_info: Option<String>,
	},
	#[error("hint {hint} failed: {source}")]
	Hint { hint: String, source: HintError },
	#[error("hint {name} ({hint:?}) is required by the circuit but not registered")]
	MissingHint { hint: HintId, name: String },
	#[error("failed to build the solver thread pool: {0}")]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn render_debug_info(debug_info: &Option<String>) -> String {
	match debug_info {
		Some(info) => format!("\n{info}"),
		None => String::new(),
	}
}
