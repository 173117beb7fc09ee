// Copyright 2025 Irreducible Inc.
//! Lazy constraint templates.
//!
//! Hash permutations repeat the same sub-circuit thousands of times. Instead of storing every
//! copy, a constraint system keeps one [`StaticPattern`] per template kind and a list of
//! [`LazyInputs`] instances. The constraints of an instance are generated on demand by
//! substituting the instance wires into the pattern.

use std::collections::BTreeMap;

use ark_ff::PrimeField;
use bytes::{Buf, BufMut};
use r1cs_utils::serialization::{DeserializeBytes, SerializationError, SerializeBytes};
use smallvec::{SmallVec, smallvec};

use crate::{
	coeff_table::{CoeffId, CoeffTable},
	constraint_system::{ConstraintSystem, LinearExpression, R1C, Term, WireId},
	consts::{LAZY_MIMC_ENC_TAG, LAZY_POSEIDON_TAG},
	error::CoreError,
};

/// A wire of a [`StaticPattern`], relative to the instance it is expanded for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PatternWire {
	/// The constant one wire.
	One,
	/// The i-th input of the instance. Inputs are never shifted.
	Input(u32),
	/// The wire at `shift + offset`.
	State(u32),
}

impl PatternWire {
	/// The concrete wire for an instance with the given inputs and shift.
	#[inline]
	pub fn resolve(self, instance: &LazyInputs, shift: WireId) -> WireId {
		match self {
			PatternWire::One => WireId::ONE,
			PatternWire::Input(i) => instance.input(i as usize),
			PatternWire::State(offset) => WireId(shift.0 + offset),
		}
	}
}

impl SerializeBytes for PatternWire {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		match self {
			PatternWire::One => 0u8.serialize(write_buf),
			PatternWire::Input(i) => {
				1u8.serialize(&mut write_buf)?;
				i.serialize(write_buf)
			}
			PatternWire::State(offset) => {
				2u8.serialize(&mut write_buf)?;
				offset.serialize(write_buf)
			}
		}
	}
}

impl DeserializeBytes for PatternWire {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let index = u8::deserialize(&mut read_buf)?;
		match index {
			0 => Ok(PatternWire::One),
			1 => Ok(PatternWire::Input(u32::deserialize(read_buf)?)),
			2 => Ok(PatternWire::State(u32::deserialize(read_buf)?)),
			_ => Err(SerializationError::UnknownEnumVariant {
				name: "PatternWire",
				index,
			}),
		}
	}
}

/// A term of a [`PatternR1C`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PatternTerm {
	/// Coefficient of the term.
	pub coeff: CoeffId,
	/// The wire, relative to the instance.
	pub wire: PatternWire,
}

impl PatternTerm {
	/// The wire with coefficient one.
	pub fn plain(wire: PatternWire) -> Self {
		Self {
			coeff: CoeffId::ONE,
			wire,
		}
	}
}

impl SerializeBytes for PatternTerm {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.coeff.serialize(&mut write_buf)?;
		self.wire.serialize(write_buf)
	}
}

impl DeserializeBytes for PatternTerm {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let coeff = CoeffId::deserialize(&mut read_buf)?;
		let wire = PatternWire::deserialize(read_buf)?;
		Ok(PatternTerm { coeff, wire })
	}
}

/// A constraint of a [`StaticPattern`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternR1C {
	/// Left operand.
	pub l: Vec<PatternTerm>,
	/// Right operand.
	pub r: Vec<PatternTerm>,
	/// Output.
	pub o: Vec<PatternTerm>,
}

impl PatternR1C {
	fn terms(&self) -> impl Iterator<Item = &PatternTerm> {
		self.l.iter().chain(&self.r).chain(&self.o)
	}
}

impl SerializeBytes for PatternR1C {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.l.serialize(&mut write_buf)?;
		self.r.serialize(&mut write_buf)?;
		self.o.serialize(write_buf)
	}
}

impl DeserializeBytes for PatternR1C {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let l = Vec::<PatternTerm>::deserialize(&mut read_buf)?;
		let r = Vec::<PatternTerm>::deserialize(&mut read_buf)?;
		let o = Vec::<PatternTerm>::deserialize(read_buf)?;
		Ok(PatternR1C { l, r, o })
	}
}

/// The constraints shared by every instance of a template kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticPattern {
	constraints: Vec<PatternR1C>,
	n_state_wires: usize,
}

impl StaticPattern {
	/// Creates a pattern from its constraints.
	pub fn from_constraints(constraints: Vec<PatternR1C>) -> Self {
		let n_state_wires = constraints
			.iter()
			.flat_map(PatternR1C::terms)
			.filter_map(|term| match term.wire {
				PatternWire::State(offset) => Some(offset as usize + 1),
				_ => None,
			})
			.max()
			.unwrap_or(0);
		Self {
			constraints,
			n_state_wires,
		}
	}

	/// Converts the concrete constraints of a reference instance into a pattern.
	///
	/// Every wire must be the one wire, one of `inputs`, or at or after `base`. Wires matching an
	/// input are recorded by their position in `inputs`; the others relative to `base`.
	pub fn capture(
		constraints: &[R1C],
		inputs: &[WireId],
		base: WireId,
	) -> Result<Self, CoreError> {
		let convert = |expr: &LinearExpression| -> Result<Vec<PatternTerm>, CoreError> {
			expr.iter()
				.map(|term| {
					let wire = if term.wire == WireId::ONE {
						PatternWire::One
					} else if let Some(i) = inputs.iter().position(|&input| input == term.wire) {
						PatternWire::Input(i as u32)
					} else if term.wire >= base {
						PatternWire::State(term.wire.0 - base.0)
					} else {
						return Err(CoreError::MalformedTemplate {
							wire: term.wire,
							base,
						});
					};
					Ok(PatternTerm {
						coeff: term.coeff,
						wire,
					})
				})
				.collect()
		};

		let constraints = constraints
			.iter()
			.map(|constraint| {
				Ok(PatternR1C {
					l: convert(&constraint.l)?,
					r: convert(&constraint.r)?,
					o: convert(&constraint.o)?,
				})
			})
			.collect::<Result<Vec<_>, CoreError>>()?;
		Ok(Self::from_constraints(constraints))
	}

	/// Number of constraints generated per instance.
	pub fn len(&self) -> usize {
		self.constraints.len()
	}

	/// Returns true if the pattern has no constraints.
	pub fn is_empty(&self) -> bool {
		self.constraints.is_empty()
	}

	/// The pattern constraints.
	pub fn constraints(&self) -> &[PatternR1C] {
		&self.constraints
	}

	/// Number of wires an instance occupies from its shift onwards.
	pub fn n_state_wires(&self) -> usize {
		self.n_state_wires
	}

	/// Writes constraint `j` of the pattern, instantiated for `instance` shifted by `shift`, into
	/// `out`. The buffers of `out` are reused.
	#[inline]
	pub fn expand_into(&self, j: usize, instance: &LazyInputs, shift: WireId, out: &mut R1C) {
		let pattern = &self.constraints[j];
		let instantiate = |terms: &[PatternTerm], expr: &mut LinearExpression| {
			expr.clear();
			expr.extend(
				terms
					.iter()
					.map(|term| Term::new(term.coeff, term.wire.resolve(instance, shift))),
			);
		};
		instantiate(pattern.l.as_slice(), &mut out.l);
		instantiate(pattern.r.as_slice(), &mut out.r);
		instantiate(pattern.o.as_slice(), &mut out.o);
	}

	/// Constraint `j` of the pattern instantiated for `instance`.
	pub fn expand(&self, j: usize, instance: &LazyInputs) -> R1C {
		let mut out = R1C::default();
		self.expand_into(j, instance, instance.shift(), &mut out);
		out
	}

	/// Checks that the pattern only reads inputs the template has and known coefficients.
	pub fn validate<F: PrimeField>(
		&self,
		key: TemplateKey,
		coefficients: &CoeffTable<F>,
	) -> Result<(), CoreError> {
		let n_inputs = key.n_inputs();
		for term in self.constraints.iter().flat_map(PatternR1C::terms) {
			if let PatternWire::Input(input) = term.wire {
				if input as usize >= n_inputs {
					return Err(CoreError::InvalidPatternInput { key, input });
				}
			}
			if coefficients.get(term.coeff).is_none() {
				return Err(CoreError::OutOfRangeCoefficient {
					coeff: term.coeff.0,
					len: coefficients.len(),
				});
			}
		}
		Ok(())
	}
}

impl SerializeBytes for StaticPattern {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.constraints.serialize(write_buf)
	}
}

impl DeserializeBytes for StaticPattern {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		Ok(Self::from_constraints(Vec::<PatternR1C>::deserialize(read_buf)?))
	}
}

/// Selects the [`StaticPattern`] shared by instances of the same shape.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TemplateKey {
	/// Poseidon permutation over a state of `width` elements.
	Poseidon {
		/// Number of state elements.
		width: u32,
	},
	/// One MiMC encryption round function.
	MimcEnc,
}

impl TemplateKey {
	/// Number of input wires of an instance.
	pub fn n_inputs(self) -> usize {
		match self {
			TemplateKey::Poseidon { width } => width as usize,
			TemplateKey::MimcEnc => 2,
		}
	}
}

impl SerializeBytes for TemplateKey {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		match self {
			TemplateKey::Poseidon { width } => {
				0u8.serialize(&mut write_buf)?;
				width.serialize(write_buf)
			}
			TemplateKey::MimcEnc => 1u8.serialize(write_buf),
		}
	}
}

impl DeserializeBytes for TemplateKey {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let index = u8::deserialize(&mut read_buf)?;
		match index {
			0 => Ok(TemplateKey::Poseidon {
				width: u32::deserialize(read_buf)?,
			}),
			1 => Ok(TemplateKey::MimcEnc),
			_ => Err(SerializationError::UnknownEnumVariant {
				name: "TemplateKey",
				index,
			}),
		}
	}
}

/// An instance of a lazy template.
///
/// `output` is the first internal wire of the instance; every state wire of its pattern is
/// addressed relative to it. `loc` is where the instance constraints sat in the unrolled
/// constraint list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LazyInputs {
	/// A Poseidon permutation.
	Poseidon {
		/// Input state.
		state: Vec<WireId>,
		/// First internal wire.
		output: WireId,
		/// Position in the unrolled constraint list.
		loc: usize,
	},
	/// A MiMC encryption.
	MimcEnc {
		/// Message.
		s0: WireId,
		/// Key.
		hh: WireId,
		/// First internal wire.
		output: WireId,
		/// Position in the unrolled constraint list.
		loc: usize,
	},
}

impl LazyInputs {
	/// The pattern shared with other instances of the same shape.
	pub fn template_key(&self) -> TemplateKey {
		match self {
			LazyInputs::Poseidon { state, .. } => TemplateKey::Poseidon {
				width: state.len() as u32,
			},
			LazyInputs::MimcEnc { .. } => TemplateKey::MimcEnc,
		}
	}

	/// The stable discriminator written in front of the instance.
	pub fn tag(&self) -> u64 {
		match self {
			LazyInputs::Poseidon { .. } => LAZY_POSEIDON_TAG,
			LazyInputs::MimcEnc { .. } => LAZY_MIMC_ENC_TAG,
		}
	}

	/// The i-th input wire.
	///
	/// # Panics
	///
	/// Panics if the template has no such input.
	#[inline]
	pub fn input(&self, i: usize) -> WireId {
		match self {
			LazyInputs::Poseidon { state, .. } => state[i],
			LazyInputs::MimcEnc { s0, hh, .. } => match i {
				0 => *s0,
				1 => *hh,
				_ => panic!("MiMC instances have two inputs, got input #{i}"),
			},
		}
	}

	/// Every input wire, in order.
	pub fn inputs(&self) -> SmallVec<[WireId; 4]> {
		match self {
			LazyInputs::Poseidon { state, .. } => SmallVec::from_slice(state),
			LazyInputs::MimcEnc { s0, hh, .. } => smallvec![*s0, *hh],
		}
	}

	/// The offset added to every state wire of the pattern.
	#[inline]
	pub fn shift(&self) -> WireId {
		match self {
			LazyInputs::Poseidon { output, .. } | LazyInputs::MimcEnc { output, .. } => *output,
		}
	}

	/// Position of the instance in the unrolled constraint list.
	pub fn loc(&self) -> usize {
		match self {
			LazyInputs::Poseidon { loc, .. } | LazyInputs::MimcEnc { loc, .. } => *loc,
		}
	}
}

impl SerializeBytes for LazyInputs {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.tag().serialize(&mut write_buf)?;
		match self {
			LazyInputs::Poseidon { state, output, loc } => {
				state.serialize(&mut write_buf)?;
				output.serialize(&mut write_buf)?;
				loc.serialize(write_buf)
			}
			LazyInputs::MimcEnc {
				s0,
				hh,
				output,
				loc,
			} => {
				s0.serialize(&mut write_buf)?;
				hh.serialize(&mut write_buf)?;
				output.serialize(&mut write_buf)?;
				loc.serialize(write_buf)
			}
		}
	}
}

impl DeserializeBytes for LazyInputs {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let tag = u64::deserialize(&mut read_buf)?;
		match tag {
			LAZY_POSEIDON_TAG => {
				let state = Vec::<WireId>::deserialize(&mut read_buf)?;
				let output = WireId::deserialize(&mut read_buf)?;
				let loc = usize::deserialize(read_buf)?;
				Ok(LazyInputs::Poseidon { state, output, loc })
			}
			LAZY_MIMC_ENC_TAG => {
				let s0 = WireId::deserialize(&mut read_buf)?;
				let hh = WireId::deserialize(&mut read_buf)?;
				let output = WireId::deserialize(&mut read_buf)?;
				let loc = usize::deserialize(read_buf)?;
				Ok(LazyInputs::MimcEnc {
					s0,
					hh,
					output,
					loc,
				})
			}
			_ => Err(SerializationError::UnknownTag {
				name: "LazyInputs",
				tag,
			}),
		}
	}
}

/// Locates a lazy constraint: constraint `index` of the pattern of instance `instance`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LazyIndex {
	/// Position of the instance in [`ConstraintSystem::lazy_instances`].
	pub instance: usize,
	/// Position of the constraint in the instance pattern.
	pub index: usize,
}

impl SerializeBytes for LazyIndex {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.instance.serialize(&mut write_buf)?;
		self.index.serialize(write_buf)
	}
}

impl DeserializeBytes for LazyIndex {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let instance = usize::deserialize(&mut read_buf)?;
		let index = usize::deserialize(read_buf)?;
		Ok(LazyIndex { instance, index })
	}
}

impl<F: PrimeField> ConstraintSystem<F> {
	/// Writes the logical constraint `index` into `out`, expanding it if it is lazy.
	///
	/// # Panics
	///
	/// Panics if `index` is not below [`Self::n_constraints`].
	pub fn constraint_into(&self, index: usize, out: &mut R1C) {
		match self.constraints.get(index) {
			Some(constraint) => out.clone_from(constraint),
			None => self.expand_lazy_into(index - self.n_materialized(), out),
		}
	}

	/// Writes the `k`-th lazy constraint into `out`.
	#[inline]
	pub fn expand_lazy_into(&self, k: usize, out: &mut R1C) {
		let LazyIndex { instance, index } = self.lazy_map[k];
		let instance = &self.lazy_instances[instance];
		self.static_patterns[&instance.template_key()].expand_into(
			index,
			instance,
			instance.shift(),
			out,
		);
	}

	/// Logical constraint indices in the order the constraints had before [`Self::lazify`].
	///
	/// Lazy instances are put back at their `loc`, materialized constraints fill the gaps in
	/// their current order. Identity for a system that is not lazified.
	pub fn unrolled_order(&self) -> Vec<usize> {
		let n_materialized = self.n_materialized();
		if self.lazy_map.is_empty() {
			return (0..n_materialized).collect();
		}

		let mut ranges = Vec::with_capacity(self.lazy_instances.len());
		let mut next = n_materialized;
		for instance in &self.lazy_instances {
			let len = self
				.static_patterns
				.get(&instance.template_key())
				.map_or(0, StaticPattern::len);
			ranges.push((instance.loc(), next..next + len));
			next += len;
		}
		ranges.sort_by_key(|(loc, _)| *loc);

		let mut order = Vec::with_capacity(self.n_constraints());
		let mut materialized = 0..n_materialized;
		for (loc, range) in ranges {
			while order.len() < loc {
				match materialized.next() {
					Some(index) => order.push(index),
					None => break,
				}
			}
			order.extend(range);
		}
		order.extend(materialized);
		order
	}

	/// Moves the constraints of every lazy instance out of the materialized list.
	///
	/// On entry each instance's constraints sit materialized at `[loc, loc + span)`, where the span
	/// of each template kind is given by `spans`. The pattern of every kind is captured from its
	/// first instance; the others must match it. Afterwards the materialized constraints keep
	/// their relative order, lazy constraints follow in instance order, and the levels and the
	/// debug map are rewritten to the new logical indices.
	///
	/// Returns the map from old to new constraint index.
	pub fn lazify(
		&mut self,
		spans: &BTreeMap<TemplateKey, usize>,
	) -> Result<Vec<usize>, CoreError> {
		if !self.lazy_map.is_empty() {
			return Err(CoreError::AlreadyLazified);
		}
		let n_old = self.constraints.len();

		let mut ranges = Vec::with_capacity(self.lazy_instances.len());
		for instance in &self.lazy_instances {
			let key = instance.template_key();
			let len = *spans.get(&key).ok_or(CoreError::MissingTemplateSpan { key })?;
			let loc = instance.loc();
			if loc + len > n_old {
				return Err(CoreError::LazyOutOfRange {
					loc,
					len,
					n_constraints: n_old,
				});
			}
			ranges.push(loc..loc + len);
		}
		let mut sorted = ranges.clone();
		sorted.sort_by_key(|range| range.start);
		for pair in sorted.windows(2) {
			if pair[1].start < pair[0].end {
				return Err(CoreError::LazyOverlap { loc: pair[1].start });
			}
		}

		let mut patterns = BTreeMap::new();
		for (instance, range) in self.lazy_instances.iter().zip(&ranges) {
			let pattern = StaticPattern::capture(
				&self.constraints[range.clone()],
				&instance.inputs(),
				instance.shift(),
			)?;
			match patterns.entry(instance.template_key()) {
				std::collections::btree_map::Entry::Vacant(entry) => {
					entry.insert(pattern);
				}
				std::collections::btree_map::Entry::Occupied(entry) => {
					if *entry.get() != pattern {
						return Err(CoreError::TemplateMismatch { loc: range.start });
					}
				}
			}
		}

		let mut lazy_at = vec![None; n_old];
		for (i, range) in ranges.iter().enumerate() {
			for (j, old) in range.clone().enumerate() {
				lazy_at[old] = Some(LazyIndex {
					instance: i,
					index: j,
				});
			}
		}
		let n_materialized = lazy_at.iter().filter(|entry| entry.is_none()).count();

		let mut lazy_offsets = Vec::with_capacity(ranges.len());
		let mut offset = n_materialized;
		for range in &ranges {
			lazy_offsets.push(offset);
			offset += range.len();
		}

		let mut old_to_new = Vec::with_capacity(n_old);
		let mut next_materialized = 0;
		for entry in &lazy_at {
			match entry {
				None => {
					old_to_new.push(next_materialized);
					next_materialized += 1;
				}
				Some(LazyIndex { instance, index }) => {
					old_to_new.push(lazy_offsets[*instance] + index);
				}
			}
		}

		for &index in self.levels.iter().flatten() {
			if index >= n_old {
				return Err(CoreError::InvalidLevelEntry { index });
			}
		}

		let constraints = std::mem::take(&mut self.constraints);
		self.constraints = constraints
			.into_iter()
			.zip(&lazy_at)
			.filter_map(|(constraint, entry)| entry.is_none().then_some(constraint))
			.collect();
		self.lazy_map = ranges
			.iter()
			.enumerate()
			.flat_map(|(instance, range)| {
				(0..range.len()).map(move |index| LazyIndex { instance, index })
			})
			.collect();
		self.static_patterns.extend(patterns);
		for index in self.levels.iter_mut().flatten() {
			*index = old_to_new[*index];
		}
		self.debug_map = std::mem::take(&mut self.debug_map)
			.into_iter()
			.filter_map(|(constraint, entry)| {
				old_to_new
					.get(constraint)
					.map(|&constraint| (constraint, entry))
			})
			.collect();

		tracing::debug!(
			n_instances = self.lazy_instances.len(),
			n_materialized = self.n_materialized(),
			n_lazy = self.n_lazy_constraints(),
			"lazified constraint system"
		);

		Ok(old_to_new)
	}
}
