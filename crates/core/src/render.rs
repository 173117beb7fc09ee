// Copyright 2025 Irreducible Inc.
//! Human readable rendering of constraints.
//!
//! Wires are named `1` for the constant wire, `p{i}` for public inputs, `s{i}` for secret
//! inputs, `v{i}` for internal wires and `hv{i}` for internal wires produced by a hint.
//! Coefficients are omitted when they are one, rendered as `-` when they are minus one, and as
//! `{value}⋅` otherwise.

use std::fmt::Write;

use ark_ff::PrimeField;

use crate::{
	coeff_table::CoeffId,
	constraint_system::{ConstraintSystem, R1C, Term, Visibility, WireId},
	field::to_decimal,
	lazy::LazyInputs,
};

impl<F: PrimeField> ConstraintSystem<F> {
	/// Renders the name of `wire`.
	pub fn render_wire(&self, wire: WireId, out: &mut String) {
		let index = wire.index();
		let first_secret = self.layout.n_public;
		let first_internal = self.layout.n_public + self.layout.n_secret;
		// Writing into a `String` never fails.
		let _ = match self.layout.visibility(wire) {
			Visibility::Public if wire == WireId::ONE => write!(out, "1"),
			Visibility::Public => write!(out, "p{}", index - 1),
			Visibility::Secret => write!(out, "s{}", index - first_secret),
			Visibility::Internal if self.hint_call_of(wire).is_some() => {
				write!(out, "hv{}", index - first_internal)
			}
			Visibility::Internal => write!(out, "v{}", index - first_internal),
		};
	}

	/// Renders a single term.
	pub fn render_term(&self, term: &Term, out: &mut String) {
		match term.coeff {
			CoeffId::ONE => {}
			CoeffId::MINUS_ONE => out.push('-'),
			CoeffId::ZERO => {
				out.push('0');
				return;
			}
			coeff => match self.coefficients.get(coeff) {
				Some(value) => {
					out.push_str(&to_decimal(value));
					out.push('⋅');
				}
				None => {
					let _ = write!(out, "<c{}>⋅", coeff.0);
				}
			},
		}
		self.render_wire(term.wire, out);
	}

	/// Renders a linear expression as its terms joined by ` + `.
	pub fn render_expression(&self, terms: &[Term]) -> String {
		let mut out = String::new();
		for (i, term) in terms.iter().enumerate() {
			if i > 0 {
				out.push_str(" + ");
			}
			self.render_term(term, &mut out);
		}
		out
	}

	/// Renders the `L`, `R` and `O` parts of a constraint.
	pub fn render_constraint(&self, constraint: &R1C) -> [String; 3] {
		[
			self.render_expression(&constraint.l),
			self.render_expression(&constraint.r),
			self.render_expression(&constraint.o),
		]
	}

	/// Renders every materialized constraint.
	pub fn constraint_strings(&self) -> Vec<[String; 3]> {
		self.constraints
			.iter()
			.map(|constraint| self.render_constraint(constraint))
			.collect()
	}

	/// Renders every lazy instance as its inputs, its first internal wire, an empty column, and
	/// its location in the unrolled constraint list.
	pub fn lazy_constraint_strings(&self) -> Vec<[String; 4]> {
		let wire = |wire: WireId| {
			let mut out = String::new();
			self.render_wire(wire, &mut out);
			out
		};
		self.lazy_instances
			.iter()
			.map(|instance| match instance {
				LazyInputs::MimcEnc {
					s0,
					hh,
					output,
					loc,
				} => [wire(*s0), wire(*hh), wire(*output), format!("@{loc}")],
				LazyInputs::Poseidon { state, output, loc } => [
					state.iter().map(|&w| wire(w)).collect::<Vec<_>>().join(", "),
					wire(*output),
					String::new(),
					format!("@{loc}"),
				],
			})
			.collect()
	}

	/// Renders the pattern of the first lazy instance, instantiated for that instance.
	pub fn static_constraint_strings(&self) -> Vec<[String; 3]> {
		let Some(instance) = self.lazy_instances.first() else {
			return Vec::new();
		};
		let Some(pattern) = self.static_patterns.get(&instance.template_key()) else {
			return Vec::new();
		};
		(0..pattern.len())
			.map(|j| self.render_constraint(&pattern.expand(j, instance)))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		constraint_system::{WireLayout, tests::create_test_constraint_system},
		field::Fr,
		lazy::tests::{create_unrolled_system, mimc_spans},
	};

	#[test]
	fn test_wire_names() {
		let mut cs = ConstraintSystem::<Fr>::new(WireLayout {
			n_public: 3,
			n_secret: 2,
			n_internal: 3,
		});
		cs.add_hint("identity", vec![], vec![WireId(6)]);

		let names = (0..8)
			.map(|i| {
				let mut out = String::new();
				cs.render_wire(WireId(i), &mut out);
				out
			})
			.collect::<Vec<_>>();
		assert_eq!(names, ["1", "p0", "p1", "s0", "s1", "v0", "hv1", "v2"]);
	}

	#[test]
	fn test_constraint_strings() {
		let cs = create_test_constraint_system();
		let rendered = cs.constraint_strings();
		assert_eq!(rendered[0], ["p0".to_string(), "p0".into(), "v0".into()]);
		assert_eq!(rendered[2], ["hv2 + 3⋅s0".to_string(), "1".into(), "v1 + 3⋅s0".into()]);
	}

	#[test]
	fn test_special_coefficients() {
		let cs = create_test_constraint_system();
		let terms = [
			Term::new(CoeffId::MINUS_ONE, WireId(1)),
			Term::new(CoeffId::ZERO, WireId(2)),
		];
		assert_eq!(cs.render_expression(&terms), "-p0 + 0");
		assert_eq!(cs.render_expression(&[]), "");
	}

	#[test]
	fn test_lazy_strings() {
		let mut cs = create_unrolled_system();
		cs.lazify(&mimc_spans()).unwrap();

		let lazy = cs.lazy_constraint_strings();
		assert_eq!(lazy.len(), 2);
		assert_eq!(lazy[1], ["v2".to_string(), "p0".into(), "v3".into(), "@3".into()]);

		let pattern = cs.static_constraint_strings();
		assert_eq!(pattern, vec![
			["s0 + p0".to_string(), "s0 + p0".into(), "v0".into()],
			["v0".to_string(), "s0 + p0".into(), "v1".into()],
		]);
	}
}
