// Copyright 2025 Irreducible Inc.
//! Back-substitution of a single constraint.

use ark_ff::PrimeField;
use r1cs_core::{CoeffId, CoeffTable, R1C, Term, field::to_decimal};

use crate::{error::SolveError, solution::Solution};

/// Which part of a constraint holds the wire being solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
	L,
	R,
	O,
}

/// Divides `value` by the coefficient `coeff`.
///
/// Solved-for terms carry `1` or `-1` in practice. Any other coefficient takes the inverse.
///
/// # Panics
///
/// Panics if `coeff` is zero.
#[inline]
pub fn divide_by_coefficient<F: PrimeField>(coeffs: &CoeffTable<F>, value: F, coeff: CoeffId) -> F {
	match coeff {
		CoeffId::ONE => value,
		CoeffId::MINUS_ONE => -value,
		CoeffId::ZERO => panic!("division by 0"),
		_ => match coeffs[coeff].inverse() {
			Some(inverse) => value * inverse,
			None => panic!("division by 0"),
		},
	}
}

/// Solves the unknown wire of `constraint`, if any, and checks that it holds.
///
/// Unsolved wires produced by a hint are solved through their hint first. At most one remaining
/// wire may be unsolved; its value is derived from `a ⋅ b = c` and written to `solution`.
/// Returns the values of `L`, `R` and `O` under the completed assignment.
///
/// # Panics
///
/// Panics if more than one unhinted wire of `constraint` is unsolved, or if the unknown term has
/// a zero coefficient.
pub fn resolve<F: PrimeField>(
	constraint: &R1C,
	index: usize,
	solution: &Solution<F>,
) -> Result<(F, F, F), SolveError> {
	let mut a = F::zero();
	let mut b = F::zero();
	let mut c = F::zero();
	let mut unknown: Option<(Side, Term)> = None;

	for (side, expr, acc) in [
		(Side::L, &constraint.l, &mut a),
		(Side::R, &constraint.r, &mut b),
		(Side::O, &constraint.o, &mut c),
	] {
		for term in expr {
			if solution.accumulate(term, acc) {
				continue;
			}
			if solution.is_hinted(term.wire) {
				solution.solve_with_hint(term.wire)?;
				solution.accumulate(term, acc);
				continue;
			}
			if unknown.replace((side, *term)).is_some() {
				panic!("constraint #{index} has more than one unknown wire");
			}
		}
	}

	let unsatisfied = |a: &F, b: &F, c: &F| SolveError::UnsatisfiedConstraint {
		constraint: index,
		message: format!("{} ⋅ {} != {}", to_decimal(a), to_decimal(b), to_decimal(c)),
		debug_info: None,
	};

	let Some((side, term)) = unknown else {
		if a * b != c {
			return Err(unsatisfied(&a, &b, &c));
		}
		return Ok((a, b, c));
	};

	// The unknown contributes `coeff ⋅ value` to its side.
	let mut delta = F::zero();
	match side {
		Side::L if !b.is_zero() => {
			delta = c / b - a;
			a += delta;
		}
		Side::R if !a.is_zero() => {
			delta = c / a - b;
			b += delta;
		}
		Side::L | Side::R => {
			if a * b != c {
				return Err(unsatisfied(&a, &b, &c));
			}
		}
		Side::O => {
			delta = a * b - c;
			c += delta;
		}
	}

	let coeffs = &solution.constraint_system().coefficients;
	solution.set(term.wire, divide_by_coefficient(coeffs, delta, term.coeff));
	Ok((a, b, c))
}

/// Resolves the logical constraint `index`, expanding it into `scratch` first if it is lazy.
pub fn solve_constraint<F: PrimeField>(
	index: usize,
	solution: &Solution<F>,
	scratch: &mut R1C,
) -> Result<(F, F, F), SolveError> {
	let cs = solution.constraint_system();
	match cs.constraints.get(index) {
		Some(constraint) => resolve(constraint, index, solution),
		None => {
			cs.expand_lazy_into(index - cs.n_materialized(), scratch);
			resolve(scratch, index, solution)
		}
	}
}
