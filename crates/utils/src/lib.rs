// Copyright 2024-2025 Irreducible Inc.

//! Utility modules shared by the R1CS solver crates.

pub mod serialization;

pub use bytes;
pub use serialization::{DeserializeBytes, SerializationError, SerializeBytes};
