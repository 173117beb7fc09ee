// Copyright 2025 Irreducible Inc.
//! Bit decomposition hint implementations

use ark_ff::{BigInteger, PrimeField};

use super::{Hint, check_arity};
use crate::error::HintError;

fn bit<F: PrimeField>(value: &F, i: usize) -> F {
	let bigint = value.into_bigint();
	if i < bigint.num_bits() as usize && bigint.get_bit(i) {
		F::one()
	} else {
		F::zero()
	}
}

/// Outputs bit `inputs[1]` of `inputs[0]`.
///
/// Bits are taken from the canonical representation of the value. An index past its bit length
/// yields zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct IthBitHint;

impl<F: PrimeField> Hint<F> for IthBitHint {
	fn name(&self) -> &str {
		"ith_bit"
	}

	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError> {
		check_arity(inputs.len(), outputs.len(), 2, 1)?;
		let index = inputs[1].into_bigint();
		let limbs = index.as_ref();
		outputs[0] = match limbs.iter().skip(1).all(|&limb| limb == 0) {
			true => usize::try_from(limbs[0]).map_or(F::zero(), |i| bit(&inputs[0], i)),
			false => F::zero(),
		};
		Ok(())
	}
}

/// Writes the little-endian bit decomposition of its single input into every output.
///
/// Only the lowest `outputs.len()` bits are produced; the circuit is expected to check that they
/// recompose to the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct NBitsHint;

impl<F: PrimeField> Hint<F> for NBitsHint {
	fn name(&self) -> &str {
		"n_bits"
	}

	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError> {
		if inputs.len() != 1 {
			return Err(HintError::InputCount {
				expected: 1,
				got: inputs.len(),
			});
		}
		for (i, output) in outputs.iter_mut().enumerate() {
			*output = bit(&inputs[0], i);
		}
		Ok(())
	}
}
