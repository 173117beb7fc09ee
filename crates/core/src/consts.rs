// Copyright 2025 Irreducible Inc.
//! Constants shared by the compiled constraint system and its wire format.

/// Coefficient id reserved for the literal `0`.
pub const COEFF_ID_ZERO: u32 = 0;

/// Coefficient id reserved for the literal `1`.
pub const COEFF_ID_ONE: u32 = 1;

/// Coefficient id reserved for the literal `-1`.
pub const COEFF_ID_MINUS_ONE: u32 = 2;

/// Number of coefficient ids reserved for literals at the head of every coefficient table.
pub const N_RESERVED_COEFFS: usize = 3;

/// Index of the constant one wire.
pub const ONE_WIRE: u32 = 0;

/// Stable discriminator written in front of a lazy Poseidon permutation instance.
pub const LAZY_POSEIDON_TAG: u64 = 25448;

/// Stable discriminator written in front of a lazy MiMC encryption instance.
pub const LAZY_MIMC_ENC_TAG: u64 = 25449;

/// Environment variable that, when set, keeps debug information around after decoding a
/// constraint system.
pub const DEBUG_INFO_ENV: &str = "R1CS_DEBUG_INFO";

/// Size in bytes of a serialized field element.
pub const FIELD_ELEMENT_BYTES: usize = 32;
