// Copyright 2025 Irreducible Inc.
//! Hint system.
//!
//! Hints are deterministic computations that happen on the prover side.
//!
//! They can be used for operations that require many constraints to compute but few constraints
//! to verify, such as bit decompositions or inverses. The circuit only checks the values a hint
//! produced.

use std::{collections::HashMap, sync::Arc};

use ark_ff::PrimeField;
use r1cs_core::{Fr, HintId};

use crate::error::HintError;

mod bits;
mod identity;
mod is_zero;

pub use bits::{IthBitHint, NBitsHint};
pub use identity::IdentityHint;
pub use is_zero::IsZeroHint;

/// Hint handler trait for extensible operations
pub trait Hint<F: PrimeField>: Send + Sync {
	/// The name the hint is registered under. Its [`HintId`] is derived from it.
	fn name(&self) -> &str;

	/// Execute the hint with given inputs, writing every output.
	///
	/// `outputs` has one slot per output wire of the call. A hint that cannot produce that many
	/// values reports [`HintError::OutputCount`].
	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError>;
}

/// A hint backed by a closure.
pub struct FnHint<Func> {
	name: String,
	func: Func,
}

impl<Func> FnHint<Func> {
	/// Wraps `func` as a hint named `name`.
	pub fn new<F>(name: impl Into<String>, func: Func) -> Self
	where
		F: PrimeField,
		Func: Fn(&[F], &mut [F]) -> Result<(), HintError> + Send + Sync,
	{
		Self {
			name: name.into(),
			func,
		}
	}
}

impl<F, Func> Hint<F> for FnHint<Func>
where
	F: PrimeField,
	Func: Fn(&[F], &mut [F]) -> Result<(), HintError> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn call(&self, inputs: &[F], outputs: &mut [F]) -> Result<(), HintError> {
		(self.func)(inputs, outputs)
	}
}

/// Registry for hint handlers
pub struct HintRegistry<F: PrimeField = Fr> {
	handlers: HashMap<HintId, Arc<dyn Hint<F>>>,
}

impl<F: PrimeField> HintRegistry<F> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			handlers: HashMap::new(),
		}
	}

	/// Creates a registry holding the builtin hints.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		registry.register(IdentityHint);
		registry.register(IsZeroHint);
		registry.register(IthBitHint);
		registry.register(NBitsHint);
		registry
	}

	/// Registers `hint` under the id derived from its name, replacing any previous handler.
	pub fn register(&mut self, hint: impl Hint<F> + 'static) -> HintId {
		let id = HintId::from_name(hint.name());
		self.register_as(id, hint);
		id
	}

	/// Registers `hint` under an explicit id.
	pub fn register_as(&mut self, id: HintId, hint: impl Hint<F> + 'static) {
		self.handlers.insert(id, Arc::new(hint));
	}

	/// The handler registered under `id`.
	pub fn get(&self, id: HintId) -> Option<&dyn Hint<F>> {
		self.handlers.get(&id).map(|hint| hint.as_ref())
	}

	/// Returns true if a handler is registered under `id`.
	pub fn contains(&self, id: HintId) -> bool {
		self.handlers.contains_key(&id)
	}

	/// Number of registered handlers.
	pub fn len(&self) -> usize {
		self.handlers.len()
	}

	/// Returns true if no handler is registered.
	pub fn is_empty(&self) -> bool {
		self.handlers.is_empty()
	}
}

impl<F: PrimeField> Default for HintRegistry<F> {
	fn default() -> Self {
		Self::new()
	}
}

impl<F: PrimeField> Clone for HintRegistry<F> {
	fn clone(&self) -> Self {
		Self {
			handlers: self.handlers.clone(),
		}
	}
}

pub(crate) fn check_arity(
	inputs: usize,
	outputs: usize,
	expected_inputs: usize,
	expected_outputs: usize,
) -> Result<(), HintError> {
	if inputs != expected_inputs {
		return Err(HintError::InputCount {
			expected: expected_inputs,
			got: inputs,
		});
	}
	if outputs != expected_outputs {
		return Err(HintError::OutputCount {
			expected: expected_outputs,
			got: outputs,
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use ark_ff::One;

	use super::*;

	#[test]
	fn test_builtins_are_registered_by_name() {
		let registry = HintRegistry::<Fr>::with_builtins();
		assert_eq!(registry.len(), 4);
		for name in ["identity", "is_zero", "ith_bit", "n_bits"] {
			let hint = registry.get(HintId::from_name(name)).unwrap();
			assert_eq!(hint.name(), name);
		}
		assert!(!registry.contains(HintId::from_name("mod_inverse")));
	}

	#[test]
	fn test_register_closure() {
		let mut registry = HintRegistry::<Fr>::new();
		let id = registry.register(FnHint::new("double", |inputs: &[Fr], outputs: &mut [Fr]| {
			check_arity(inputs.len(), outputs.len(), 1, 1)?;
			outputs[0] = inputs[0] + inputs[0];
			Ok(())
		}));
		assert_eq!(id, HintId::from_name("double"));

		let mut out = [Fr::from(0u64)];
		registry
			.get(id)
			.unwrap()
			.call(&[Fr::from(21u64)], &mut out)
			.unwrap();
		assert_eq!(out[0], Fr::from(42u64));

		let err = registry
			.get(id)
			.unwrap()
			.call(&[Fr::one(), Fr::one()], &mut out)
			.unwrap_err();
		assert_eq!(err, HintError::InputCount {
			expected: 1,
			got: 2
		});
	}

	#[test]
	fn test_register_as_overrides() {
		let mut registry = HintRegistry::<Fr>::with_builtins();
		let id = HintId::from_name("is_zero");
		registry.register_as(id, FnHint::new("always_one", |_: &[Fr], outputs: &mut [Fr]| {
			outputs.fill(Fr::one());
			Ok(())
		}));
		assert_eq!(registry.get(id).unwrap().name(), "always_one");
		assert_eq!(registry.len(), 4);
	}
}
