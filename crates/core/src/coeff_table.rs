// Copyright 2025 Irreducible Inc.
//! Deduplicated table of field coefficients referenced by [`CoeffId`].

use std::{
	collections::{BTreeMap, HashMap},
	io::{Read, Write},
	ops::Index,
};

use ark_ff::PrimeField;
use bytes::{Buf, BufMut};
use r1cs_utils::serialization::{
	DeserializeBytes, SerializationError, SerializeBytes, deserialize_len,
};

use crate::{
	consts::{COEFF_ID_MINUS_ONE, COEFF_ID_ONE, COEFF_ID_ZERO, N_RESERVED_COEFFS},
	error::CoreError,
	field::{Fr, deserialize_field, serialize_field, to_decimal},
};

/// Index of a coefficient in a [`CoeffTable`].
///
/// The first three ids are reserved for the literals `0`, `1` and `-1`, which lets the solver
/// skip multiplications for the overwhelmingly common unit coefficients.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CoeffId(pub u32);

impl CoeffId {
	/// The literal `0`.
	pub const ZERO: CoeffId = CoeffId(COEFF_ID_ZERO);
	/// The literal `1`.
	pub const ONE: CoeffId = CoeffId(COEFF_ID_ONE);
	/// The literal `-1`.
	pub const MINUS_ONE: CoeffId = CoeffId(COEFF_ID_MINUS_ONE);
}

impl SerializeBytes for CoeffId {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.0.serialize(write_buf)
	}
}

impl DeserializeBytes for CoeffId {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		Ok(CoeffId(u32::deserialize(read_buf)?))
	}
}

/// Deduplicated store of the coefficients used by the terms of a constraint system.
#[derive(Clone, Debug)]
pub struct CoeffTable<F: PrimeField = Fr> {
	coefficients: Vec<F>,
	index: HashMap<F, CoeffId>,
}

impl<F: PrimeField> CoeffTable<F> {
	/// Creates a table holding only the reserved literals.
	pub fn new() -> Self {
		let coefficients = vec![F::zero(), F::one(), -F::one()];
		let index = coefficients
			.iter()
			.enumerate()
			.map(|(id, value)| (*value, CoeffId(id as u32)))
			.collect();
		Self {
			coefficients,
			index,
		}
	}

	/// Returns the id of `value`, adding it to the table if it is not present yet.
	pub fn intern(&mut self, value: F) -> CoeffId {
		if let Some(&id) = self.index.get(&value) {
			return id;
		}
		let id = CoeffId(self.coefficients.len() as u32);
		self.coefficients.push(value);
		self.index.insert(value, id);
		id
	}

	/// Returns the coefficient with the given id, if any.
	pub fn get(&self, id: CoeffId) -> Option<&F> {
		self.coefficients.get(id.0 as usize)
	}

	/// Multiplies `value` by the coefficient `id`.
	#[inline]
	pub fn mul(&self, id: CoeffId, value: &F) -> F {
		match id {
			CoeffId::ZERO => F::zero(),
			CoeffId::ONE => *value,
			CoeffId::MINUS_ONE => -*value,
			_ => self[id] * value,
		}
	}

	/// The number of coefficients, reserved literals included.
	pub fn len(&self) -> usize {
		self.coefficients.len()
	}

	/// Always false: the reserved literals are present in every table.
	pub fn is_empty(&self) -> bool {
		self.coefficients.is_empty()
	}

	/// All the coefficients in id order.
	pub fn as_slice(&self) -> &[F] {
		&self.coefficients
	}

	/// Writes the table as a JSON object mapping every id to the decimal value of its coefficient.
	///
	/// Returns the number of bytes written.
	pub fn write_json(&self, mut writer: impl Write) -> Result<usize, CoreError> {
		let repr = CoeffTableJson {
			coefficients: self
				.coefficients
				.iter()
				.enumerate()
				.map(|(id, value)| (id as u32, to_decimal(value)))
				.collect(),
		};
		let bytes = serde_json::to_vec(&repr)?;
		writer.write_all(&bytes)?;
		Ok(bytes.len())
	}

	/// Reads a table written by [`Self::write_json`].
	pub fn read_json(mut reader: impl Read) -> Result<Self, CoreError> {
		let mut bytes = Vec::new();
		reader.read_to_end(&mut bytes)?;
		let repr: CoeffTableJson = serde_json::from_slice(&bytes)?;

		let mut coefficients = Vec::with_capacity(repr.coefficients.len());
		for (expected_id, (id, value)) in repr.coefficients.into_iter().enumerate() {
			if id as usize != expected_id {
				return Err(CoreError::MissingCoefficient {
					id: expected_id as u32,
				});
			}
			let parsed =
				parse_decimal::<F>(&value).ok_or(CoreError::InvalidCoefficient { id, value })?;
			coefficients.push(parsed);
		}
		Self::from_coefficients(coefficients)
	}

	/// Rebuilds a table from its coefficients in id order, checking the reserved literals.
	pub fn from_coefficients(coefficients: Vec<F>) -> Result<Self, CoreError> {
		let reserved = Self::new();
		for id in 0..N_RESERVED_COEFFS {
			if coefficients.get(id) != reserved.coefficients.get(id) {
				return Err(CoreError::ReservedCoefficientMismatch { id: id as u32 });
			}
		}
		let mut index = HashMap::with_capacity(coefficients.len());
		for (id, value) in coefficients.iter().enumerate() {
			index.entry(*value).or_insert(CoeffId(id as u32));
		}
		Ok(Self {
			coefficients,
			index,
		})
	}
}

impl<F: PrimeField> Default for CoeffTable<F> {
	fn default() -> Self {
		Self::new()
	}
}

impl<F: PrimeField> Index<CoeffId> for CoeffTable<F> {
	type Output = F;

	fn index(&self, id: CoeffId) -> &Self::Output {
		&self.coefficients[id.0 as usize]
	}
}

impl<F: PrimeField> PartialEq for CoeffTable<F> {
	fn eq(&self, other: &Self) -> bool {
		self.coefficients == other.coefficients
	}
}

impl<F: PrimeField> Eq for CoeffTable<F> {}

impl<F: PrimeField> SerializeBytes for CoeffTable<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.coefficients.len().serialize(&mut write_buf)?;
		self.coefficients
			.iter()
			.try_for_each(|value| serialize_field(value, &mut write_buf))
	}
}

impl<F: PrimeField> DeserializeBytes for CoeffTable<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized,
	{
		let len = deserialize_len(&mut read_buf)?;
		let mut coefficients = Vec::with_capacity(len.min(read_buf.remaining()));
		for _ in 0..len {
			coefficients.push(deserialize_field(&mut read_buf)?);
		}
		Self::from_coefficients(coefficients).map_err(|_| SerializationError::InvalidConstruction {
			name: "CoeffTable::reserved",
		})
	}
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CoeffTableJson {
	coefficients: BTreeMap<u32, String>,
}

fn parse_decimal<F: PrimeField>(value: &str) -> Option<F> {
	if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let parsed = F::from_str(value).ok()?;
	// `from_str` reduces modulo the field order; only canonical representatives are accepted.
	let canonical = to_decimal(&parsed);
	let digits = value.trim_start_matches('0');
	(canonical == digits || (digits.is_empty() && parsed.is_zero())).then_some(parsed)
}
