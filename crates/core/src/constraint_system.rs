// Copyright 2025 Irreducible Inc.
//! Constraint system and related definitions.

use std::collections::{BTreeMap, HashMap};

use ark_ff::PrimeField;
use bytes::{Buf, BufMut};
use r1cs_utils::serialization::{DeserializeBytes, SerializationError, SerializeBytes};

use crate::{
	coeff_table::{CoeffId, CoeffTable},
	consts::{DEBUG_INFO_ENV, ONE_WIRE},
	error::CoreError,
	field::Fr,
	lazy::{LazyIndex, LazyInputs, StaticPattern, TemplateKey},
};

/// A type safe wrapper over an index into the assignment of a [`ConstraintSystem`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WireId(pub u32);

impl WireId {
	/// The constant wire, always assigned the value one.
	pub const ONE: WireId = WireId(ONE_WIRE);

	/// The wire as an index into a dense assignment.
	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

impl SerializeBytes for WireId {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.0.serialize(write_buf)
	}
}

impl DeserializeBytes for WireId {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		Ok(WireId(u32::deserialize(read_buf)?))
	}
}

/// Which section of the assignment a wire belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Visibility {
	/// Known to prover and verifier. Includes the constant one wire.
	Public,
	/// Private input supplied by the prover.
	Secret,
	/// Computed by the solver.
	Internal,
}

/// Description of the layout of the assignment for a particular circuit.
///
/// Wires are laid out densely: public wires first (the constant one wire at index 0), then
/// secret wires, then internal wires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WireLayout {
	/// Number of public wires, the constant one wire included.
	pub n_public: usize,
	/// Number of secret input wires.
	pub n_secret: usize,
	/// Number of internal wires.
	pub n_internal: usize,
}

impl WireLayout {
	/// Total number of wires.
	pub fn n_wires(&self) -> usize {
		self.n_public + self.n_secret + self.n_internal
	}

	/// Number of wires the caller supplies: every public wire but the constant one, then every
	/// secret wire.
	pub fn witness_len(&self) -> usize {
		self.n_public.saturating_sub(1) + self.n_secret
	}

	/// The first internal wire.
	pub fn first_internal(&self) -> WireId {
		WireId((self.n_public + self.n_secret) as u32)
	}

	/// The section `wire` belongs to.
	pub fn visibility(&self, wire: WireId) -> Visibility {
		let index = wire.index();
		if index < self.n_public {
			Visibility::Public
		} else if index < self.n_public + self.n_secret {
			Visibility::Secret
		} else {
			Visibility::Internal
		}
	}

	/// Returns true if `wire` is the one wire or a caller supplied input.
	pub fn is_input(&self, wire: WireId) -> bool {
		wire.index() < self.n_public + self.n_secret
	}

	/// Checks that the layout has room for the constant one wire and that every wire is
	/// addressable by a [`WireId`].
	pub fn validate(&self) -> Result<(), CoreError> {
		if self.n_public == 0 || self.n_wires() > u32::MAX as usize {
			return Err(CoreError::InvalidLayout {
				n_public: self.n_public,
				n_wires: self.n_wires(),
			});
		}
		Ok(())
	}
}

impl SerializeBytes for WireLayout {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.n_public.serialize(&mut write_buf)?;
		self.n_secret.serialize(&mut write_buf)?;
		self.n_internal.serialize(write_buf)
	}
}

impl DeserializeBytes for WireLayout {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let n_public = usize::deserialize(&mut read_buf)?;
		let n_secret = usize::deserialize(&mut read_buf)?;
		let n_internal = usize::deserialize(read_buf)?;
		Ok(WireLayout {
			n_public,
			n_secret,
			n_internal,
		})
	}
}

/// A coefficient applied to a wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Term {
	/// Index of the coefficient in the [`CoeffTable`].
	pub coeff: CoeffId,
	/// The wire the coefficient multiplies.
	pub wire: WireId,
}

impl Term {
	/// Creates a new term.
	pub fn new(coeff: CoeffId, wire: WireId) -> Self {
		Self { coeff, wire }
	}

	/// The wire with coefficient one.
	pub fn plain(wire: WireId) -> Self {
		Self::new(CoeffId::ONE, wire)
	}
}

impl SerializeBytes for Term {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.coeff.serialize(&mut write_buf)?;
		self.wire.serialize(write_buf)
	}
}

impl DeserializeBytes for Term {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let coeff = CoeffId::deserialize(&mut read_buf)?;
		let wire = WireId::deserialize(read_buf)?;
		Ok(Term { coeff, wire })
	}
}

/// A sum of terms.
///
/// ```ignore
/// vec![] == 0
/// vec![1⋅x] == x
/// vec![3⋅x, -y] == 3x - y
/// ```
pub type LinearExpression = Vec<Term>;

/// Rank-1 constraint: `L * R = O`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct R1C {
	/// Left operand.
	pub l: LinearExpression,
	/// Right operand.
	pub r: LinearExpression,
	/// Output.
	pub o: LinearExpression,
}

impl R1C {
	/// Creates a new constraint.
	pub fn new(l: LinearExpression, r: LinearExpression, o: LinearExpression) -> Self {
		Self { l, r, o }
	}

	/// Iterates every term of the constraint, `L` first, then `R`, then `O`.
	pub fn terms(&self) -> impl Iterator<Item = &Term> {
		self.l.iter().chain(&self.r).chain(&self.o)
	}
}

impl SerializeBytes for R1C {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.l.serialize(&mut write_buf)?;
		self.r.serialize(&mut write_buf)?;
		self.o.serialize(write_buf)
	}
}

impl DeserializeBytes for R1C {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let l = Vec::<Term>::deserialize(&mut read_buf)?;
		let r = Vec::<Term>::deserialize(&mut read_buf)?;
		let o = Vec::<Term>::deserialize(read_buf)?;
		Ok(R1C { l, r, o })
	}
}

/// Identifier of a hint function, derived from its name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HintId(pub u32);

impl HintId {
	/// Stable 32-bit FNV-1a hash of `name`.
	pub const fn from_name(name: &str) -> Self {
		const OFFSET_BASIS: u32 = 0x811c_9dc5;
		const PRIME: u32 = 0x0100_0193;

		let bytes = name.as_bytes();
		let mut hash = OFFSET_BASIS;
		let mut i = 0;
		while i < bytes.len() {
			hash ^= bytes[i] as u32;
			hash = hash.wrapping_mul(PRIME);
			i += 1;
		}
		HintId(hash)
	}
}

impl SerializeBytes for HintId {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.0.serialize(write_buf)
	}
}

impl DeserializeBytes for HintId {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		Ok(HintId(u32::deserialize(read_buf)?))
	}
}

/// One invocation of a hint function.
///
/// The function receives the evaluations of `inputs` and produces a value for every wire of
/// `outputs`, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HintCall {
	/// The function to invoke.
	pub hint: HintId,
	/// Arguments of the function.
	pub inputs: Vec<LinearExpression>,
	/// Wires assigned from the function results.
	pub outputs: Vec<WireId>,
}

impl SerializeBytes for HintCall {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.hint.serialize(&mut write_buf)?;
		self.inputs.serialize(&mut write_buf)?;
		self.outputs.serialize(write_buf)
	}
}

impl DeserializeBytes for HintCall {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let hint = HintId::deserialize(&mut read_buf)?;
		let inputs = Vec::<LinearExpression>::deserialize(&mut read_buf)?;
		let outputs = Vec::<WireId>::deserialize(read_buf)?;
		Ok(HintCall {
			hint,
			inputs,
			outputs,
		})
	}
}

/// A message with placeholders resolved against the assignment.
///
/// Each `{}` in `format` is replaced by the value of the matching entry of `to_resolve`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogEntry {
	/// The message, with one `{}` per entry of `to_resolve`.
	pub format: String,
	/// Expressions whose values fill the placeholders.
	pub to_resolve: Vec<LinearExpression>,
}

impl LogEntry {
	/// Creates an entry without placeholders.
	pub fn message(format: impl Into<String>) -> Self {
		Self {
			format: format.into(),
			to_resolve: Vec::new(),
		}
	}

	/// Fills the placeholders with the strings produced by `resolve`.
	///
	/// Placeholders without a matching expression are left untouched.
	pub fn render(&self, mut resolve: impl FnMut(&LinearExpression) -> String) -> String {
		let mut out = String::with_capacity(self.format.len());
		let mut rest = self.format.as_str();
		let mut values = self.to_resolve.iter();
		while let Some(pos) = rest.find("{}") {
			out.push_str(&rest[..pos]);
			match values.next() {
				Some(expr) => out.push_str(&resolve(expr)),
				None => out.push_str("{}"),
			}
			rest = &rest[pos + 2..];
		}
		out.push_str(rest);
		out
	}
}

impl SerializeBytes for LogEntry {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.format.serialize(&mut write_buf)?;
		self.to_resolve.serialize(write_buf)
	}
}

impl DeserializeBytes for LogEntry {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let format = String::deserialize(&mut read_buf)?;
		let to_resolve = Vec::<LinearExpression>::deserialize(read_buf)?;
		Ok(LogEntry { format, to_resolve })
	}
}

/// The compiled R1CS artifact consumed by the solver.
///
/// Constraints are addressed by a logical index: the materialized constraints come first,
/// followed by the constraints of every lazy instance expanded in instance order.
///
/// # Clone
///
/// While this type is cloneable it may be expensive to do so since the constraint systems often
/// can have millions of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSystem<F: PrimeField = Fr> {
	/// Description of the assignment layout expected by this constraint system.
	pub layout: WireLayout,
	/// Coefficients referenced by the terms.
	pub coefficients: CoeffTable<F>,
	/// Materialized constraints.
	pub constraints: Vec<R1C>,
	/// Groups of mutually independent logical constraint indices, solved in order.
	pub levels: Vec<Vec<usize>>,
	hint_calls: Vec<HintCall>,
	hint_wires: HashMap<WireId, usize>,
	/// Hint functions the circuit needs, with their names.
	pub hint_dependencies: BTreeMap<HintId, String>,
	/// Repeated sub-circuits whose constraints are generated from a [`StaticPattern`].
	pub lazy_instances: Vec<LazyInputs>,
	/// One pattern per template kind.
	pub static_patterns: BTreeMap<TemplateKey, StaticPattern>,
	/// Entry `k` locates logical constraint `n_materialized() + k`.
	pub lazy_map: Vec<LazyIndex>,
	/// Messages attached to constraints, reported when they fail.
	pub debug_info: Vec<LogEntry>,
	/// Logical constraint index to entry of `debug_info`.
	pub debug_map: BTreeMap<usize, usize>,
	/// Circuit print statements, rendered after solving.
	pub logs: Vec<LogEntry>,
}

impl<F: PrimeField> ConstraintSystem<F> {
	/// Serialization format version for compatibility checking
	pub const SERIALIZATION_VERSION: u32 = 1;

	/// Creates an empty constraint system for the given layout.
	pub fn new(layout: WireLayout) -> Self {
		Self {
			layout,
			coefficients: CoeffTable::new(),
			constraints: Vec::new(),
			levels: Vec::new(),
			hint_calls: Vec::new(),
			hint_wires: HashMap::new(),
			hint_dependencies: BTreeMap::new(),
			lazy_instances: Vec::new(),
			static_patterns: BTreeMap::new(),
			lazy_map: Vec::new(),
			debug_info: Vec::new(),
			debug_map: BTreeMap::new(),
			logs: Vec::new(),
		}
	}

	/// Total number of wires.
	pub fn n_wires(&self) -> usize {
		self.layout.n_wires()
	}

	/// Number of values the caller supplies to the solver.
	pub fn witness_len(&self) -> usize {
		self.layout.witness_len()
	}

	/// Number of materialized constraints.
	pub fn n_materialized(&self) -> usize {
		self.constraints.len()
	}

	/// Number of constraints generated from lazy instances.
	pub fn n_lazy_constraints(&self) -> usize {
		self.lazy_map.len()
	}

	/// Total number of logical constraints.
	pub fn n_constraints(&self) -> usize {
		self.n_materialized() + self.n_lazy_constraints()
	}

	/// Appends a materialized constraint and returns its index.
	pub fn add_constraint(&mut self, constraint: R1C) -> usize {
		self.constraints.push(constraint);
		self.constraints.len() - 1
	}

	/// Records a hint call and returns its index.
	///
	/// # Panics
	///
	/// Panics if one of the outputs is already produced by another hint call.
	pub fn add_hint_call(&mut self, call: HintCall) -> usize {
		let index = self.hint_calls.len();
		for &wire in &call.outputs {
			let previous = self.hint_wires.insert(wire, index);
			assert!(previous.is_none(), "wire {wire:?} is the output of two hint calls");
		}
		self.hint_calls.push(call);
		index
	}

	/// Records a call of the hint named `name` and declares it as a dependency of the circuit.
	pub fn add_hint(
		&mut self,
		name: &str,
		inputs: Vec<LinearExpression>,
		outputs: Vec<WireId>,
	) -> usize {
		let hint = HintId::from_name(name);
		self.hint_dependencies
			.entry(hint)
			.or_insert_with(|| name.to_string());
		self.add_hint_call(HintCall {
			hint,
			inputs,
			outputs,
		})
	}

	/// Every hint call, in insertion order.
	pub fn hint_calls(&self) -> &[HintCall] {
		&self.hint_calls
	}

	/// The index of the hint call producing `wire`, if any.
	#[inline]
	pub fn hint_call_of(&self, wire: WireId) -> Option<usize> {
		self.hint_wires.get(&wire).copied()
	}

	/// Attaches a debug message to the logical constraint `constraint`.
	pub fn add_debug_info(&mut self, constraint: usize, entry: LogEntry) {
		self.debug_info.push(entry);
		self.debug_map.insert(constraint, self.debug_info.len() - 1);
	}

	/// The debug message attached to the logical constraint `constraint`, if any.
	pub fn debug_info_of(&self, constraint: usize) -> Option<&LogEntry> {
		self.debug_map
			.get(&constraint)
			.and_then(|&entry| self.debug_info.get(entry))
	}

	/// Drops every debug message.
	pub fn clear_debug_info(&mut self) {
		self.debug_info.clear();
		self.debug_map.clear();
	}

	/// Ensures that this constraint system is well-formed and safe to hand to the solver.
	///
	/// Specifically checks that:
	///
	/// - the [layout][`WireLayout::validate`] is valid.
	/// - every term references an existing wire and coefficient.
	/// - hint outputs are internal wires.
	/// - level entries, the lazy map and the debug map stay in range.
	/// - every lazy instance has a pattern that only references its own inputs and in-range
	///   state wires.
	pub fn validate(&self) -> Result<(), CoreError> {
		self.layout.validate()?;

		let n_wires = self.n_wires();
		let n_coeffs = self.coefficients.len();
		let check = |terms: &[Term]| check_terms(terms, n_wires, n_coeffs);

		for constraint in &self.constraints {
			check(constraint.l.as_slice())?;
			check(constraint.r.as_slice())?;
			check(constraint.o.as_slice())?;
		}
		for call in &self.hint_calls {
			call.inputs.iter().try_for_each(|expr| check(expr.as_slice()))?;
			for &wire in &call.outputs {
				if wire.index() >= n_wires || self.layout.is_input(wire) {
					return Err(CoreError::InvalidHintOutput { wire });
				}
			}
		}
		for entry in self.debug_info.iter().chain(&self.logs) {
			entry
				.to_resolve
				.iter()
				.try_for_each(|expr| check(expr.as_slice()))?;
		}

		let n_constraints = self.n_constraints();
		for &index in self.levels.iter().flatten() {
			if index >= n_constraints {
				return Err(CoreError::InvalidLevelEntry { index });
			}
		}
		for (&constraint, &entry) in &self.debug_map {
			if constraint >= n_constraints || entry >= self.debug_info.len() {
				return Err(CoreError::InvalidDebugEntry { constraint });
			}
		}

		for (key, pattern) in &self.static_patterns {
			pattern.validate(*key, &self.coefficients)?;
		}
		for instance in &self.lazy_instances {
			let key = instance.template_key();
			let pattern = self
				.static_patterns
				.get(&key)
				.ok_or(CoreError::MissingPattern { key })?;
			for &wire in &instance.inputs() {
				if wire.index() >= n_wires {
					return Err(CoreError::OutOfRangeWire { wire, n_wires });
				}
			}
			let end = instance.shift().index() + pattern.n_state_wires();
			if end > n_wires {
				return Err(CoreError::OutOfRangeWire {
					wire: WireId(end as u32 - 1),
					n_wires,
				});
			}
		}
		for (entry, lazy) in self.lazy_map.iter().enumerate() {
			let in_range = self
				.lazy_instances
				.get(lazy.instance)
				.and_then(|instance| self.static_patterns.get(&instance.template_key()))
				.is_some_and(|pattern| lazy.index < pattern.len());
			if !in_range {
				return Err(CoreError::InvalidLazyEntry { entry });
			}
		}

		return Ok(());

		fn check_terms(terms: &[Term], n_wires: usize, n_coeffs: usize) -> Result<(), CoreError> {
			for term in terms {
				if term.wire.index() >= n_wires {
					return Err(CoreError::OutOfRangeWire {
						wire: term.wire,
						n_wires,
					});
				}
				if term.coeff.0 as usize >= n_coeffs {
					return Err(CoreError::OutOfRangeCoefficient {
						coeff: term.coeff.0,
						len: n_coeffs,
					});
				}
			}
			Ok(())
		}
	}

	/// Writes the materialized constraints only.
	pub fn write_constraints(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.constraints.serialize(write_buf)
	}

	/// Replaces the materialized constraints with the ones written by
	/// [`Self::write_constraints`].
	pub fn read_constraints(&mut self, read_buf: impl Buf) -> Result<(), SerializationError> {
		self.constraints = Vec::<R1C>::deserialize(read_buf)?;
		Ok(())
	}

	/// Writes the coefficient table in its JSON text form. Returns the number of bytes written.
	pub fn write_coeff_table(&self, writer: impl std::io::Write) -> Result<usize, CoreError> {
		self.coefficients.write_json(writer)
	}

	/// Replaces the coefficient table with the one written by [`Self::write_coeff_table`].
	pub fn read_coeff_table(&mut self, reader: impl std::io::Read) -> Result<(), CoreError> {
		self.coefficients = CoeffTable::read_json(reader)?;
		Ok(())
	}

	/// Decodes a constraint system, keeping debug messages only if `retain_debug` is set.
	///
	/// The decoded system is [validated][`Self::validate`].
	pub fn deserialize_with(
		mut read_buf: impl Buf,
		retain_debug: bool,
	) -> Result<Self, SerializationError> {
		let version = u32::deserialize(&mut read_buf)?;
		if version != Self::SERIALIZATION_VERSION {
			return Err(SerializationError::InvalidConstruction {
				name: "ConstraintSystem::version",
			});
		}

		let layout = WireLayout::deserialize(&mut read_buf)?;
		let coefficients = CoeffTable::<F>::deserialize(&mut read_buf)?;
		let constraints = Vec::<R1C>::deserialize(&mut read_buf)?;
		let levels = Vec::<Vec<usize>>::deserialize(&mut read_buf)?;
		let hint_calls = Vec::<HintCall>::deserialize(&mut read_buf)?;
		let hint_dependencies = BTreeMap::<HintId, String>::deserialize(&mut read_buf)?;
		let lazy_instances = Vec::<LazyInputs>::deserialize(&mut read_buf)?;
		let static_patterns = BTreeMap::<TemplateKey, StaticPattern>::deserialize(&mut read_buf)?;
		let lazy_map = Vec::<LazyIndex>::deserialize(&mut read_buf)?;
		let debug_info = Vec::<LogEntry>::deserialize(&mut read_buf)?;
		let debug_map = BTreeMap::<usize, usize>::deserialize(&mut read_buf)?;
		let logs = Vec::<LogEntry>::deserialize(read_buf)?;

		let mut cs = ConstraintSystem {
			layout,
			coefficients,
			constraints,
			levels,
			hint_calls: Vec::with_capacity(hint_calls.len()),
			hint_wires: HashMap::new(),
			hint_dependencies,
			lazy_instances,
			static_patterns,
			lazy_map,
			debug_info,
			debug_map,
			logs,
		};
		for call in hint_calls {
			for &wire in &call.outputs {
				if cs.hint_wires.insert(wire, cs.hint_calls.len()).is_some() {
					return Err(SerializationError::InvalidConstruction {
						name: "ConstraintSystem::hint_calls",
					});
				}
			}
			cs.hint_calls.push(call);
		}

		if !retain_debug && !cs.debug_info.is_empty() {
			tracing::debug!(
				n_entries = cs.debug_info.len(),
				"dropping constraint debug info, set {DEBUG_INFO_ENV} to keep it"
			);
			cs.clear_debug_info();
		}

		if let Err(err) = cs.validate() {
			tracing::debug!(%err, "decoded constraint system is malformed");
			return Err(SerializationError::InvalidConstruction {
				name: "ConstraintSystem",
			});
		}

		Ok(cs)
	}
}

impl<F: PrimeField> SerializeBytes for ConstraintSystem<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		Self::SERIALIZATION_VERSION.serialize(&mut write_buf)?;

		self.layout.serialize(&mut write_buf)?;
		self.coefficients.serialize(&mut write_buf)?;
		self.constraints.serialize(&mut write_buf)?;
		self.levels.serialize(&mut write_buf)?;
		self.hint_calls.serialize(&mut write_buf)?;
		self.hint_dependencies.serialize(&mut write_buf)?;
		self.lazy_instances.serialize(&mut write_buf)?;
		self.static_patterns.serialize(&mut write_buf)?;
		self.lazy_map.serialize(&mut write_buf)?;
		self.debug_info.serialize(&mut write_buf)?;
		self.debug_map.serialize(&mut write_buf)?;
		self.logs.serialize(write_buf)
	}
}

impl<F: PrimeField> DeserializeBytes for ConstraintSystem<F> {
	/// Decodes a constraint system. Debug messages are kept only if the `R1CS_DEBUG_INFO`
	/// environment variable is set.
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let retain_debug = std::env::var_os(DEBUG_INFO_ENV).is_some();
		Self::deserialize_with(read_buf, retain_debug)
	}
}
