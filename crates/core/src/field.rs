// Copyright 2025 Irreducible Inc.
//! Byte encoding of prime field elements.
//!
//! Field elements are written as [`FIELD_ELEMENT_BYTES`] bytes of their canonical little-endian
//! representation. Decoding rejects non-canonical encodings (values not below the modulus).

use ark_ff::PrimeField;
use bytes::{Buf, BufMut};
use r1cs_utils::serialization::{
	SerializationError, assert_enough_data_for, assert_enough_space_for,
};

use crate::consts::FIELD_ELEMENT_BYTES;

/// The scalar field of BN254, the default field of every constraint system.
pub type Fr = ark_bn254::Fr;

/// The decimal representation of the canonical value of `value`.
pub fn to_decimal<F: PrimeField>(value: &F) -> String {
	value.into_bigint().to_string()
}

/// Writes `value` in its canonical little-endian encoding.
pub fn serialize_field<F: PrimeField>(
	value: &F,
	mut write_buf: impl BufMut,
) -> Result<(), SerializationError> {
	let mut bytes = Vec::with_capacity(FIELD_ELEMENT_BYTES);
	value
		.serialize_compressed(&mut bytes)
		.map_err(|_| SerializationError::InvalidConstruction {
			name: "field element",
		})?;
	if bytes.len() != FIELD_ELEMENT_BYTES {
		return Err(SerializationError::InvalidConstruction {
			name: "field element size",
		});
	}
	assert_enough_space_for(&write_buf, bytes.len())?;
	write_buf.put_slice(&bytes);
	Ok(())
}

/// Reads a field element written by [`serialize_field`].
pub fn deserialize_field<F: PrimeField>(mut read_buf: impl Buf) -> Result<F, SerializationError> {
	assert_enough_data_for(&read_buf, FIELD_ELEMENT_BYTES)?;
	let mut bytes = [0u8; FIELD_ELEMENT_BYTES];
	read_buf.copy_to_slice(&mut bytes);
	F::deserialize_compressed(&bytes[..]).map_err(|_| SerializationError::InvalidConstruction {
		name: "field element",
	})
}
