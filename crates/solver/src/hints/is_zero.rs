// Copyright 2025 Irreducible Inc.
//! Zero test hint implementation

use ark_ff::PrimeField;

use super::{Hint, check_arity};
use crate::error::HintError;

/// Outputs one if its single input is zero, zero otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct IsZeroHint;

impl<F: PrimeField> Hint<F> for IsZeroHint {
	fn name(&self) -> &str {
		"is_zero"
	}

	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError> {
		check_arity(inputs.len(), outputs.len(), 1, 1)?;
		outputs[0] = if inputs[0].is_zero() {
			F::one()
		} else {
			F::zero()
		};
		Ok(())
	}
}
