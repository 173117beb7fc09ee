// Copyright 2025 Irreducible Inc.
//! Dependency levels of a constraint system.

use ark_ff::PrimeField;

use crate::constraint_system::{ConstraintSystem, R1C, WireId};

/// Groups the logical constraints of `cs` into levels of mutually independent constraints.
///
/// Constraints are walked in [unrolled order][`ConstraintSystem::unrolled_order`]. Caller
/// supplied wires are known from the start. A constraint sits one level above the deepest level
/// that produced a wire it reads, and the single unknown wire it reads is produced at that level.
/// A hinted wire becomes known, together with every other output of its call, as soon as a
/// constraint reads it; it counts as produced by the deepest level among the call inputs.
///
/// # Panics
///
/// Panics if a constraint reads two unknown wires that are not hinted, or if a hint call reads a
/// wire that is not known yet.
pub fn compute_levels<F: PrimeField>(cs: &ConstraintSystem<F>) -> Vec<Vec<usize>> {
	// `depth[w] == Some(d)`: `w` is known once the first `d` levels ran.
	let mut depth = vec![None; cs.n_wires()];
	for known in depth.iter_mut().take(cs.layout.n_public + cs.layout.n_secret) {
		*known = Some(0usize);
	}

	let mut levels: Vec<Vec<usize>> = Vec::new();
	let mut constraint = R1C::default();
	for index in cs.unrolled_order() {
		cs.constraint_into(index, &mut constraint);

		let mut level = 0;
		let mut unknown: Option<WireId> = None;
		for term in constraint.terms() {
			let wire = term.wire;
			if depth[wire.index()].is_none() {
				if let Some(call) = cs.hint_call_of(wire) {
					let call = &cs.hint_calls()[call];
					let call_depth = call
						.inputs
						.iter()
						.flatten()
						.map(|input| {
							depth[input.wire.index()].unwrap_or_else(|| {
								panic!(
									"hint producing {wire:?} reads {:?}, which is not known yet",
									input.wire
								)
							})
						})
						.max()
						.unwrap_or(0);
					for output in &call.outputs {
						depth[output.index()] = Some(call_depth);
					}
				}
			}
			match depth[wire.index()] {
				Some(d) => level = level.max(d),
				None => {
					assert!(
						unknown.is_none(),
						"constraint {index} has more than one unknown wire: {unknown:?} and \
						 {wire:?}"
					);
					unknown = Some(wire);
				}
			}
		}

		if let Some(wire) = unknown {
			depth[wire.index()] = Some(level + 1);
		}
		if levels.len() <= level {
			levels.resize_with(level + 1, Vec::new);
		}
		levels[level].push(index);
	}

	levels
}
