// Copyright 2025 Irreducible Inc.
//! Entry points of the solver.

use std::time::Instant;

use ark_ff::PrimeField;
use r1cs_core::{ConstraintSystem, WireId};

use crate::{
	config::SolverConfig,
	error::SolveError,
	scheduler::{Outputs, solve_levels},
	solution::Solution,
};

/// A failed solve.
///
/// `values` holds the partial assignment reached before the failure, with unsolved wires set to
/// zero. It is only meant for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SolveFailure<F> {
	/// The partial assignment.
	pub values: Vec<F>,
	/// Why the solve stopped.
	#[source]
	pub error: SolveError,
}

impl<F> From<SolveFailure<F>> for SolveError {
	fn from(failure: SolveFailure<F>) -> Self {
		failure.error
	}
}

/// Computes every wire of `cs` from the public and secret inputs in `witness`.
///
/// `witness` holds the public inputs without the constant wire, followed by the secret inputs.
/// `a`, `b` and `c` receive the values of `L`, `R` and `O` of every logical constraint and must
/// each have [`ConstraintSystem::n_constraints`] entries.
///
/// Returns the full assignment, public, then secret, then internal wires. Circuit logs are
/// rendered to the configured logger once solving stops, whether it succeeded or not.
///
/// # Panics
///
/// Panics if the constraint system is malformed: a constraint with more than one unknown wire,
/// a zero coefficient on an unknown, or a wire left unsolved at the end.
pub fn solve<F: PrimeField>(
	cs: &ConstraintSystem<F>,
	witness: &[F],
	a: &mut [F],
	b: &mut [F],
	c: &mut [F],
	config: &SolverConfig<F>,
) -> Result<Vec<F>, SolveFailure<F>> {
	let _scope = tracing::info_span!(
		"Solve",
		n_constraints = cs.n_constraints(),
		n_wires = cs.n_wires()
	)
	.entered();
	let start = Instant::now();

	let solution = Solution::new(cs, &config.hints);
	solution.set(WireId::ONE, F::one());

	if let Some((&hint, name)) = cs
		.hint_dependencies
		.iter()
		.find(|(hint, _)| !config.hints.contains(**hint))
	{
		let error = SolveError::MissingHint {
			hint,
			name: name.clone(),
		};
		return Err(failure(solution, error));
	}
	if witness.len() != cs.witness_len() {
		let error = SolveError::WitnessLength {
			expected: cs.witness_len(),
			got: witness.len(),
		};
		return Err(failure(solution, error));
	}
	let n_constraints = cs.n_constraints();
	for len in [a.len(), b.len(), c.len()] {
		if len != n_constraints {
			let error = SolveError::OutputLength {
				expected: n_constraints,
				got: len,
			};
			return Err(failure(solution, error));
		}
	}

	for (i, &value) in witness.iter().enumerate() {
		solution.set(WireId(i as u32 + 1), value);
	}

	let result = solve_levels(&solution, &mut Outputs { a, b, c }, config);
	print_logs(&solution, config);

	match result {
		Ok(()) => {
			if !solution.is_complete() {
				tracing::error!(
					n_solved = solution.n_solved(),
					n_wires = cs.n_wires(),
					"solver did not assign every wire"
				);
				panic!("solver did not assign every wire");
			}
			tracing::debug!(took = ?start.elapsed(), "constraint system solver done");
			Ok(solution.into_values())
		}
		Err(error) => {
			if let SolveError::UnsatisfiedConstraint { constraint, .. } = &error {
				tracing::error!(id = constraint, "unsatisfied constraint");
			}
			Err(failure(solution, error))
		}
	}
}

/// Checks that `witness` satisfies `cs`, discarding the assignment.
pub fn is_solved<F: PrimeField>(
	cs: &ConstraintSystem<F>,
	witness: &[F],
	config: &SolverConfig<F>,
) -> Result<(), SolveError> {
	let n_constraints = cs.n_constraints();
	let mut a = vec![F::zero(); n_constraints];
	let mut b = vec![F::zero(); n_constraints];
	let mut c = vec![F::zero(); n_constraints];
	solve(cs, witness, &mut a, &mut b, &mut c, config)?;
	Ok(())
}

fn failure<F: PrimeField>(solution: Solution<'_, F>, error: SolveError) -> SolveFailure<F> {
	tracing::error!(%error, "solve failed");
	SolveFailure {
		values: solution.into_values(),
		error,
	}
}

fn print_logs<F: PrimeField>(solution: &Solution<F>, config: &SolverConfig<F>) {
	let Some(logger) = &config.logger else {
		return;
	};
	for entry in &solution.constraint_system().logs {
		logger.log(&entry.render(|expr| solution.render(expr)));
	}
}
