// Copyright 2025 Irreducible Inc.
//! Identity hint implementation

use ark_ff::PrimeField;

use super::Hint;
use crate::error::HintError;

/// Copies every input to the output at the same position.
///
/// Lets a circuit allocate fresh internal wires equal to existing values, for instance the state
/// handed to a lazy permutation instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHint;

impl<F: PrimeField> Hint<F> for IdentityHint {
	fn name(&self) -> &str {
		"identity"
	}

	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError> {
		if outputs.len() != inputs.len() {
			return Err(HintError::OutputCount {
				expected: inputs.len(),
				got: outputs.len(),
			});
		}
		outputs.copy_from_slice(inputs);
		Ok(())
	}
}
