// Copyright 2025 Irreducible Inc.
//! The partial assignment built up during a solve.

use std::sync::{
	OnceLock,
	atomic::{AtomicUsize, Ordering},
};

use ark_ff::PrimeField;
use r1cs_core::{ConstraintSystem, LinearExpression, Term, WireId, field::to_decimal};
use smallvec::SmallVec;

use crate::{
	error::{HintError, SolveError},
	hints::HintRegistry,
};

/// Values of the wires of a constraint system, filled in as the solve progresses.
///
/// Every wire is written at most once. Writes may come from any worker thread: a wire belongs to
/// exactly one constraint or hint call, and levels order every read after the write it depends
/// on.
pub struct Solution<'a, F: PrimeField> {
	cs: &'a ConstraintSystem<F>,
	hints: &'a HintRegistry<F>,
	values: Vec<OnceLock<F>>,
	n_solved: AtomicUsize,
	hint_results: Vec<OnceLock<Result<(), HintError>>>,
}

impl<'a, F: PrimeField> Solution<'a, F> {
	/// Creates an assignment with every wire of `cs` unsolved.
	pub fn new(cs: &'a ConstraintSystem<F>, hints: &'a HintRegistry<F>) -> Self {
		Self {
			cs,
			hints,
			values: (0..cs.n_wires()).map(|_| OnceLock::new()).collect(),
			n_solved: AtomicUsize::new(0),
			hint_results: (0..cs.hint_calls().len())
				.map(|_| OnceLock::new())
				.collect(),
		}
	}

	/// The constraint system being solved.
	pub fn constraint_system(&self) -> &'a ConstraintSystem<F> {
		self.cs
	}

	/// Assigns `value` to `wire`.
	///
	/// # Panics
	///
	/// Panics if `wire` is already solved.
	#[inline]
	pub fn set(&self, wire: WireId, value: F) {
		if self.values[wire.index()].set(value).is_err() {
			panic!("wire {wire:?} is solved twice");
		}
		self.n_solved.fetch_add(1, Ordering::Relaxed);
	}

	/// The value of `wire`, if it is solved.
	#[inline]
	pub fn get(&self, wire: WireId) -> Option<&F> {
		self.values[wire.index()].get()
	}

	/// Returns true if `wire` is solved.
	#[inline]
	pub fn is_solved(&self, wire: WireId) -> bool {
		self.get(wire).is_some()
	}

	/// Returns true if `wire` is produced by a hint call.
	#[inline]
	pub fn is_hinted(&self, wire: WireId) -> bool {
		self.cs.hint_call_of(wire).is_some()
	}

	/// Adds the value of `term` to `acc`. Returns false, leaving `acc` untouched, if the wire of
	/// `term` is not solved.
	#[inline]
	pub fn accumulate(&self, term: &Term, acc: &mut F) -> bool {
		match self.get(term.wire) {
			Some(value) => {
				*acc += self.cs.coefficients.mul(term.coeff, value);
				true
			}
			None => false,
		}
	}

	/// The value of `expr`, or `None` if one of its wires is not solved.
	pub fn try_evaluate(&self, expr: &[Term]) -> Option<F> {
		let mut acc = F::zero();
		expr.iter()
			.all(|term| self.accumulate(term, &mut acc))
			.then_some(acc)
	}

	/// The value of `expr`.
	///
	/// # Panics
	///
	/// Panics if one of its wires is not solved.
	pub fn evaluate(&self, expr: &[Term]) -> F {
		let mut acc = F::zero();
		for term in expr {
			if !self.accumulate(term, &mut acc) {
				panic!("expression reads wire {:?}, which is not solved", term.wire);
			}
		}
		acc
	}

	/// Renders `expr` as a decimal value, or `<unsolved>`.
	pub fn render(&self, expr: &LinearExpression) -> String {
		match self.try_evaluate(expr) {
			Some(value) => to_decimal(&value),
			None => "<unsolved>".to_string(),
		}
	}

	/// Solves `wire` by running the hint call producing it, which also solves every other output
	/// of the call.
	///
	/// A call runs at most once per solve. Concurrent callers wait for the first one and share
	/// its outcome; a failed call is never retried.
	///
	/// # Panics
	///
	/// Panics if `wire` is not produced by a hint call, or if one of the call inputs reads a wire
	/// that is not solved.
	pub fn solve_with_hint(&self, wire: WireId) -> Result<(), SolveError> {
		let index = match self.cs.hint_call_of(wire) {
			Some(index) => index,
			None => panic!("wire {wire:?} is not produced by a hint"),
		};
		let call = &self.cs.hint_calls()[index];
		self.hint_results[index]
			.get_or_init(|| {
				let hint = self
					.hints
					.get(call.hint)
					.ok_or(HintError::NotRegistered(call.hint))?;
				let inputs = call
					.inputs
					.iter()
					.map(|expr| self.evaluate(expr))
					.collect::<SmallVec<[F; 4]>>();
				let mut outputs = SmallVec::<[F; 4]>::from_elem(F::zero(), call.outputs.len());
				hint.call(&inputs, &mut outputs)?;
				for (&output, value) in call.outputs.iter().zip(outputs) {
					self.set(output, value);
				}
				Ok(())
			})
			.clone()
			.map_err(|source| SolveError::Hint {
				hint: self.hint_name(index),
				source,
			})
	}

	fn hint_name(&self, call: usize) -> String {
		let id = self.cs.hint_calls()[call].hint;
		match self.hints.get(id) {
			Some(hint) => hint.name().to_string(),
			None => self
				.cs
				.hint_dependencies
				.get(&id)
				.cloned()
				.unwrap_or_else(|| format!("{id:?}")),
		}
	}

	/// Number of solved wires.
	pub fn n_solved(&self) -> usize {
		self.n_solved.load(Ordering::Relaxed)
	}

	/// Returns true if every wire is solved.
	pub fn is_complete(&self) -> bool {
		self.n_solved() == self.values.len()
	}

	/// The assignment, with unsolved wires reported as zero.
	pub fn into_values(self) -> Vec<F> {
		self.values
			.into_iter()
			.map(|value| value.into_inner().unwrap_or_else(F::zero))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{Arc, atomic::AtomicU32};

	use ark_ff::One;
	use r1cs_core::{Fr, WireLayout};

	use super::*;
	use crate::hints::FnHint;

	fn layout() -> WireLayout {
		WireLayout {
			n_public: 1,
			n_secret: 1,
			n_internal: 3,
		}
	}

	#[test]
	fn test_set_and_accumulate() {
		let mut cs = ConstraintSystem::<Fr>::new(layout());
		let five = cs.coefficients.intern(Fr::from(5u64));
		let hints = HintRegistry::new();
		let solution = Solution::new(&cs, &hints);

		assert!(!solution.is_solved(WireId(1)));
		solution.set(WireId(1), Fr::from(3u64));
		assert!(solution.is_solved(WireId(1)));
		assert_eq!(solution.n_solved(), 1);

		let mut acc = Fr::one();
		assert!(solution.accumulate(&Term::new(five, WireId(1)), &mut acc));
		assert_eq!(acc, Fr::from(16u64));
		assert!(!solution.accumulate(&Term::plain(WireId(2)), &mut acc));
		assert_eq!(acc, Fr::from(16u64));

		assert_eq!(solution.render(&vec![Term::plain(WireId(1))]), "3");
		assert_eq!(solution.render(&vec![Term::plain(WireId(2))]), "<unsolved>");
	}

	#[test]
	#[should_panic(expected = "solved twice")]
	fn test_set_twice_panics() {
		let cs = ConstraintSystem::<Fr>::new(layout());
		let hints = HintRegistry::new();
		let solution = Solution::new(&cs, &hints);
		solution.set(WireId(2), Fr::one());
		solution.set(WireId(2), Fr::one());
	}

	#[test]
	fn test_into_values_zeroes_unsolved() {
		let cs = ConstraintSystem::<Fr>::new(layout());
		let hints = HintRegistry::new();
		let solution = Solution::new(&cs, &hints);
		solution.set(WireId(0), Fr::one());
		solution.set(WireId(3), Fr::from(9u64));
		assert!(!solution.is_complete());

		let values = solution.into_values();
		let zero = Fr::from(0u64);
		assert_eq!(values, vec![Fr::one(), zero, zero, Fr::from(9u64), zero]);
	}

	#[test]
	fn test_hint_runs_once_and_solves_every_output() {
		let mut cs = ConstraintSystem::<Fr>::new(layout());
		cs.add_hint("split", vec![vec![Term::plain(WireId(1))]], vec![WireId(2), WireId(3)]);

		let calls = Arc::new(AtomicU32::new(0));
		let mut hints = HintRegistry::new();
		let counter = calls.clone();
		hints.register(FnHint::new("split", move |inputs: &[Fr], outputs: &mut [Fr]| {
			counter.fetch_add(1, Ordering::Relaxed);
			outputs[0] = inputs[0] + Fr::one();
			outputs[1] = inputs[0] + inputs[0];
			Ok(())
		}));

		let solution = Solution::new(&cs, &hints);
		solution.set(WireId(1), Fr::from(10u64));
		solution.solve_with_hint(WireId(3)).unwrap();
		solution.solve_with_hint(WireId(2)).unwrap();

		assert_eq!(calls.load(Ordering::Relaxed), 1);
		assert_eq!(solution.get(WireId(2)), Some(&Fr::from(11u64)));
		assert_eq!(solution.get(WireId(3)), Some(&Fr::from(20u64)));
	}

	#[test]
	fn test_failing_hint_is_not_retried() {
		let mut cs = ConstraintSystem::<Fr>::new(layout());
		cs.add_hint("boom", vec![], vec![WireId(2)]);

		let calls = Arc::new(AtomicU32::new(0));
		let mut hints = HintRegistry::new();
		let counter = calls.clone();
		hints.register(FnHint::new("boom", move |_: &[Fr], _: &mut [Fr]| {
			counter.fetch_add(1, Ordering::Relaxed);
			Err(HintError::Failed("no luck".into()))
		}));

		let solution = Solution::new(&cs, &hints);
		for _ in 0..2 {
			match solution.solve_with_hint(WireId(2)) {
				Err(SolveError::Hint { hint, source }) => {
					assert_eq!(hint, "boom");
					assert_eq!(source, HintError::Failed("no luck".into()));
				}
				other => panic!("expected a hint error, got {other:?}"),
			}
		}
		assert_eq!(calls.load(Ordering::Relaxed), 1);
		assert!(!solution.is_solved(WireId(2)));
	}

	#[test]
	fn test_unregistered_hint() {
		let mut cs = ConstraintSystem::<Fr>::new(layout());
		cs.add_hint("missing", vec![], vec![WireId(2)]);
		let hints = HintRegistry::new();
		let solution = Solution::new(&cs, &hints);

		match solution.solve_with_hint(WireId(2)) {
			Err(SolveError::Hint { hint, source }) => {
				assert_eq!(hint, "missing");
				assert!(matches!(source, HintError::NotRegistered(_)));
			}
			other => panic!("expected a hint error, got {other:?}"),
		}
	}

	#[test]
	#[should_panic(expected = "not solved")]
	fn test_hint_reading_unsolved_input_panics() {
		let mut cs = ConstraintSystem::<Fr>::new(layout());
		cs.add_hint("identity", vec![vec![Term::plain(WireId(1))]], vec![WireId(2)]);
		let hints = HintRegistry::with_builtins();
		let solution = Solution::new(&cs, &hints);
		let _ = solution.solve_with_hint(WireId(2));
	}
}
