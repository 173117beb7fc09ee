// Copyright 2025 Irreducible Inc.

use std::{
	collections::BTreeMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use ark_ff::{Field, One, Zero};
use r1cs_core::{
	CoeffId, ConstraintSystem, Fr, LazyInputs, LogEntry, R1C, TemplateKey, Term, WireId,
	WireLayout, compute_levels,
};
use r1cs_solver::{FnHint, HintError, SolveError, SolverConfig, is_solved, solve};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn plain(wire: u32) -> Vec<Term> {
	vec![Term::plain(WireId(wire))]
}

fn quiet_config() -> SolverConfig<Fr> {
	SolverConfig::default().with_logger(None)
}

#[derive(Debug)]
struct Solved {
	values: Vec<Fr>,
	a: Vec<Fr>,
	b: Vec<Fr>,
	c: Vec<Fr>,
}

fn run(
	cs: &ConstraintSystem<Fr>,
	witness: &[Fr],
	config: &SolverConfig<Fr>,
) -> Result<Solved, SolveError> {
	let n = cs.n_constraints();
	let (mut a, mut b, mut c) = (vec![Fr::zero(); n], vec![Fr::zero(); n], vec![Fr::zero(); n]);
	let values = solve(cs, witness, &mut a, &mut b, &mut c, config)?;
	Ok(Solved { values, a, b, c })
}

/// `p0 ⋅ p1 = v0`.
fn product_system() -> ConstraintSystem<Fr> {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 3,
		n_secret: 0,
		n_internal: 1,
	});
	cs.add_constraint(R1C::new(plain(1), plain(2), plain(3)));
	cs.levels = vec![vec![0]];
	cs
}

#[test]
fn test_product() {
	let cs = product_system();
	let solved = run(&cs, &[Fr::from(3u64), Fr::from(4u64)], &quiet_config()).unwrap();
	assert_eq!(solved.values, vec![Fr::one(), Fr::from(3u64), Fr::from(4u64), Fr::from(12u64)]);
	assert_eq!(
		(solved.a[0], solved.b[0], solved.c[0]),
		(Fr::from(3u64), Fr::from(4u64), Fr::from(12u64))
	);
}

#[test]
fn test_witness_length_mismatch() {
	let cs = product_system();
	let (mut a, mut b, mut c) = (vec![Fr::zero(); 1], vec![Fr::zero(); 1], vec![Fr::zero(); 1]);
	let witness = [Fr::from(3u64)];
	let failure = solve(&cs, &witness, &mut a, &mut b, &mut c, &quiet_config()).unwrap_err();

	assert!(matches!(failure.error, SolveError::WitnessLength {
		expected: 2,
		got: 1
	}));
	assert_eq!(failure.values, vec![Fr::one(), Fr::zero(), Fr::zero(), Fr::zero()]);
	assert_eq!(a, vec![Fr::zero()]);
}

#[test]
fn test_output_length_mismatch() {
	let cs = product_system();
	let (mut a, mut b, mut c) = (vec![Fr::zero(); 1], vec![Fr::zero(); 2], vec![Fr::zero(); 1]);
	let witness = [Fr::from(3u64), Fr::from(4u64)];
	let failure = solve(&cs, &witness, &mut a, &mut b, &mut c, &quiet_config()).unwrap_err();
	assert!(matches!(failure.error, SolveError::OutputLength {
		expected: 1,
		got: 2
	}));
}

/// `(w + w) ⋅ 1 = h` where `h` is computed by a hint from `w`.
fn doubling_system(hint: &str) -> ConstraintSystem<Fr> {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 0,
		n_internal: 1,
	});
	cs.add_hint(hint, vec![plain(1)], vec![WireId(2)]);
	cs.add_constraint(R1C::new(
		vec![Term::plain(WireId(1)), Term::plain(WireId(1))],
		plain(0),
		plain(2),
	));
	cs.levels = vec![vec![0]];
	cs
}

#[test]
fn test_hinted_wire() {
	let cs = doubling_system("double");
	let double = FnHint::new("double", |inputs: &[Fr], outputs: &mut [Fr]| {
		outputs[0] = inputs[0] + inputs[0];
		Ok(())
	});
	let config = quiet_config().with_hint(double);
	let solved = run(&cs, &[Fr::from(5u64)], &config).unwrap();
	assert_eq!(solved.values[2], Fr::from(10u64));
	assert_eq!(solved.a[0] * solved.b[0], solved.c[0]);
}

#[test]
fn test_hint_failure_is_reported() {
	let cs = doubling_system("double");
	let config = quiet_config().with_hint(FnHint::new("double", |_: &[Fr], _: &mut [Fr]| {
		Err(HintError::Failed("overflow".into()))
	}));
	let failure = run(&cs, &[Fr::from(5u64)], &config).unwrap_err();
	match failure {
		SolveError::Hint { hint, source } => {
			assert_eq!(hint, "double");
			assert_eq!(source, HintError::Failed("overflow".into()));
		}
		other => panic!("expected a hint error, got {other:?}"),
	}
}

#[test]
fn test_hint_with_wrong_output_count() {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 0,
		n_internal: 2,
	});
	cs.add_hint("identity", vec![plain(1)], vec![WireId(2), WireId(3)]);
	cs.add_constraint(R1C::new(plain(2), plain(0), plain(3)));
	cs.levels = vec![vec![0]];

	let failure = run(&cs, &[Fr::from(5u64)], &quiet_config()).unwrap_err();
	assert!(matches!(failure, SolveError::Hint {
		source: HintError::OutputCount {
			expected: 1,
			got: 2
		},
		..
	}));
}

#[test]
fn test_missing_hint() {
	let cs = doubling_system("triple");
	let failure = run(&cs, &[Fr::from(5u64)], &quiet_config()).unwrap_err();
	match failure {
		SolveError::MissingHint { name, .. } => assert_eq!(name, "triple"),
		other => panic!("expected a missing hint, got {other:?}"),
	}
}

/// `x ⋅ x = y`, `s ⋅ s = x`: the second is an assertion on the secret `s`.
fn square_root_system() -> ConstraintSystem<Fr> {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 1,
		n_internal: 1,
	});
	cs.add_constraint(R1C::new(plain(1), plain(1), plain(3)));
	cs.add_constraint(R1C::new(plain(2), plain(2), plain(1)));
	cs.add_debug_info(1, LogEntry {
		format: "sqrt({}) = {}".into(),
		to_resolve: vec![plain(1), plain(2)],
	});
	cs.levels = vec![vec![0, 1]];
	cs
}

#[test]
fn test_unsatisfied_constraint() {
	let cs = square_root_system();
	let witness = [Fr::from(9u64), Fr::from(4u64)];

	let (mut a, mut b, mut c) = (vec![Fr::zero(); 2], vec![Fr::zero(); 2], vec![Fr::zero(); 2]);
	let failure = solve(&cs, &witness, &mut a, &mut b, &mut c, &quiet_config()).unwrap_err();
	match &failure.error {
		SolveError::UnsatisfiedConstraint {
			constraint,
			message,
			debug_info,
		} => {
			assert_eq!(*constraint, 1);
			assert_eq!(message, "4 ⋅ 4 != 9");
			assert_eq!(debug_info.as_deref(), Some("sqrt(9) = 4"));
		}
		other => panic!("expected an unsatisfied constraint, got {other:?}"),
	}
	// The first constraint was solved before the failure.
	assert_eq!(failure.values[3], Fr::from(81u64));
	assert_eq!(c[0], Fr::from(81u64));

	let err = is_solved(&cs, &witness, &quiet_config().with_debug(false)).unwrap_err();
	assert!(matches!(err, SolveError::UnsatisfiedConstraint {
		constraint: 1,
		debug_info: None,
		..
	}));
	assert!(is_solved(&cs, &[Fr::from(9u64), Fr::from(3u64)], &quiet_config()).is_ok());
}

#[test]
fn test_logs_are_written_even_on_failure() {
	let mut cs = square_root_system();
	cs.logs.push(LogEntry {
		format: "x = {}, y = {}".into(),
		to_resolve: vec![plain(1), plain(3)],
	});
	cs.logs.push(LogEntry::message("done"));

	let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
	let config = SolverConfig::default().with_logger(Some(sink.clone()));
	assert!(run(&cs, &[Fr::from(9u64), Fr::from(3u64)], &config).is_ok());
	assert!(run(&cs, &[Fr::from(9u64), Fr::from(2u64)], &config).is_err());

	let written = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
	assert_eq!(written, "x = 9, y = 81\ndone\nx = 9, y = 81\ndone\n");
}

#[test]
fn test_default_logger_forwards_to_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter("circuit=info,r1cs_solver=debug")
		.with_test_writer()
		.try_init();

	let mut cs = product_system();
	cs.logs.push(LogEntry {
		format: "v0 = {}".into(),
		to_resolve: vec![plain(3)],
	});
	let solved = run(&cs, &[Fr::from(6u64), Fr::from(7u64)], &SolverConfig::default()).unwrap();
	assert_eq!(solved.values[3], Fr::from(42u64));
}

#[test]
#[should_panic(expected = "more than one unknown wire")]
fn test_two_unknowns_panic() {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 0,
		n_internal: 2,
	});
	cs.add_constraint(R1C::new(plain(1), plain(2), plain(3)));
	cs.levels = vec![vec![0]];
	let _ = run(&cs, &[Fr::one()], &quiet_config());
}

#[test]
#[should_panic(expected = "did not assign every wire")]
fn test_unassigned_wire_panics() {
	let mut cs = product_system();
	cs.layout.n_internal = 2;
	let _ = run(&cs, &[Fr::one(), Fr::one()], &quiet_config());
}

/// Two layers of `width` products over random public inputs.
fn wide_system(width: usize) -> ConstraintSystem<Fr> {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: width + 1,
		n_secret: 0,
		n_internal: 2 * width,
	});
	let minus_one = CoeffId::MINUS_ONE;
	let five = cs.coefficients.intern(Fr::from(5u64));
	let input = |i: usize| WireId(1 + (i % width) as u32);
	let first = |i: usize| WireId((width + 1 + i) as u32);
	let second = |i: usize| WireId((2 * width + 1 + i) as u32);
	for i in 0..width {
		cs.add_constraint(R1C::new(
			vec![Term::plain(input(i))],
			vec![Term::plain(input(i + 1)), Term::new(five, WireId::ONE)],
			vec![Term::plain(first(i))],
		));
	}
	for i in 0..width {
		// -u ⋅ (v + 1) = w, solved for u
		cs.add_constraint(R1C::new(
			vec![Term::new(minus_one, second(i))],
			vec![Term::plain(first(i)), Term::plain(WireId::ONE)],
			vec![Term::plain(first((i + 1) % width))],
		));
	}
	cs.levels = compute_levels(&cs);
	cs
}

#[test]
fn test_worker_count_does_not_change_the_result() {
	let width = 300;
	let cs = wide_system(width);
	assert_eq!(cs.levels.len(), 2);

	let mut rng = StdRng::seed_from_u64(0);
	let witness = (0..width)
		.map(|_| Fr::from(rng.random::<u64>()))
		.collect::<Vec<_>>();

	let reference = run(&cs, &witness, &quiet_config().with_workers(1)).unwrap();
	for i in 0..width {
		let v = witness[i] * (witness[(i + 1) % width] + Fr::from(5u64));
		assert_eq!(reference.values[width + 1 + i], v);
	}
	for (n_workers, min_work) in [(4, 1), (4, 50), (3, 7), (16, 1)] {
		let config = quiet_config()
			.with_workers(n_workers)
			.with_min_work_per_worker(min_work);
		let solved = run(&cs, &witness, &config).unwrap();
		assert_eq!(solved.values, reference.values);
		assert_eq!(solved.a, reference.a);
		assert_eq!(solved.b, reference.b);
		assert_eq!(solved.c, reference.c);
	}
}

#[test]
fn test_parallel_failure_is_reported() {
	let width = 64;
	let cs = wide_system(width);
	let mut witness = vec![Fr::one(); width];
	// v_i = w_i ⋅ (w_{i+1} + 5) = -1 leaves the unknown of the second layer at i undetermined.
	witness[40] = -Fr::from(6u64).inverse().unwrap();

	let config = quiet_config().with_workers(4).with_min_work_per_worker(1);
	let err = run(&cs, &witness, &config).unwrap_err();
	assert!(matches!(err, SolveError::UnsatisfiedConstraint {
		constraint: 104,
		..
	}));
}

/// Wire `1` is the key, wire `2` the message. Each instance cubes `s0 + hh` into two fresh
/// wires; a materialized `c ⋅ 1 = d` chains them.
fn cube_chain(n_instances: usize) -> (ConstraintSystem<Fr>, usize) {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 1,
		n_internal: 3 * n_instances,
	});
	let key = WireId(1);
	let mut message = WireId(2);
	let mut next = 3;
	for _ in 0..n_instances {
		let sum = vec![Term::plain(message), Term::plain(key)];
		let square = WireId(next);
		let cube = WireId(next + 1);
		let loc = cs.n_materialized();
		cs.add_constraint(R1C::new(sum.clone(), sum.clone(), vec![Term::plain(square)]));
		cs.add_constraint(R1C::new(vec![Term::plain(square)], sum, vec![Term::plain(cube)]));
		cs.lazy_instances.push(LazyInputs::MimcEnc {
			s0: message,
			hh: key,
			output: square,
			loc,
		});
		let chained = WireId(next + 2);
		cs.add_constraint(R1C::new(
			vec![Term::plain(cube)],
			vec![Term::plain(WireId::ONE)],
			vec![Term::plain(chained)],
		));
		message = chained;
		next += 3;
	}
	cs.levels = compute_levels(&cs);
	(cs, n_instances * 3)
}

#[test]
fn test_lazified_system_solves_like_the_unrolled_one() {
	let (unrolled, n_constraints) = cube_chain(5);
	let mut lazy = unrolled.clone();
	let old_to_new = lazy
		.lazify(&BTreeMap::from([(TemplateKey::MimcEnc, 2)]))
		.unwrap();
	assert_eq!(lazy.n_materialized(), 5);
	assert_eq!(lazy.n_constraints(), n_constraints);

	let witness = [Fr::from(3u64), Fr::from(7u64)];
	let expected = run(&unrolled, &witness, &quiet_config()).unwrap();
	let solved = run(&lazy, &witness, &quiet_config()).unwrap();
	assert_eq!(solved.values, expected.values);
	for (old, &new) in old_to_new.iter().enumerate() {
		assert_eq!(solved.a[new], expected.a[old]);
		assert_eq!(solved.b[new], expected.b[old]);
		assert_eq!(solved.c[new], expected.c[old]);
	}

	let mut state = Fr::from(7u64);
	for _ in 0..5 {
		let sum = state + Fr::from(3u64);
		state = sum * sum * sum;
	}
	assert_eq!(solved.values[3 * 5 + 2], state);
}

#[test]
fn test_hint_shared_across_parallel_chunks_runs_once() {
	let n_outputs = 400;
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 2,
		n_secret: 0,
		n_internal: 2 * n_outputs,
	});
	let fanned = |i: usize| WireId((2 + i) as u32);
	let copied = |i: usize| WireId((2 + n_outputs + i) as u32);
	cs.add_hint("fan", vec![plain(1)], (0..n_outputs).map(fanned).collect());
	for i in 0..n_outputs {
		cs.add_constraint(R1C::new(
			vec![Term::plain(fanned(i))],
			plain(0),
			vec![Term::plain(copied(i))],
		));
	}
	cs.levels = vec![(0..n_outputs).collect()];

	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let config = quiet_config()
		.with_workers(8)
		.with_min_work_per_worker(1)
		.with_hint(FnHint::new("fan", move |inputs: &[Fr], outputs: &mut [Fr]| {
			counter.fetch_add(1, Ordering::SeqCst);
			// Keep the call running while other chunks reach it.
			thread::sleep(Duration::from_millis(5));
			for (i, output) in outputs.iter_mut().enumerate() {
				*output = inputs[0] + Fr::from(i as u64);
			}
			Ok(())
		}));

	let n_solves = 20;
	for round in 0..n_solves {
		let x = Fr::from(1000 + round as u64);
		let solved = run(&cs, &[x], &config).unwrap();
		for i in 0..n_outputs {
			let expected = x + Fr::from(i as u64);
			assert_eq!(solved.values[fanned(i).index()], expected);
			assert_eq!(solved.values[copied(i).index()], expected);
		}
	}
	assert_eq!(calls.load(Ordering::SeqCst), n_solves);
}

/// A chain of width-2 permutations over the public wires `1` and `2`. Each instance maps
/// `[a, b]` to `[(a + 7)³ + b, ((a + 7)³ + b) ⋅ (a + b)]` through four fresh wires, and a final
/// materialized constraint multiplies the last state.
fn permutation_chain(n_instances: usize) -> ConstraintSystem<Fr> {
	let mut cs = ConstraintSystem::new(WireLayout {
		n_public: 3,
		n_secret: 0,
		n_internal: 4 * n_instances + 1,
	});
	let seven = cs.coefficients.intern(Fr::from(7u64));
	let mut state = [WireId(1), WireId(2)];
	let mut next = 3;
	for _ in 0..n_instances {
		let [a, b] = state;
		let shifted = vec![Term::plain(a), Term::new(seven, WireId::ONE)];
		let square = WireId(next);
		let cube = WireId(next + 1);
		let first = WireId(next + 2);
		let second = WireId(next + 3);
		let loc = cs.n_materialized();
		cs.add_constraint(R1C::new(shifted.clone(), shifted.clone(), vec![Term::plain(square)]));
		cs.add_constraint(R1C::new(vec![Term::plain(square)], shifted, vec![Term::plain(cube)]));
		cs.add_constraint(R1C::new(
			vec![Term::plain(cube), Term::plain(b)],
			plain(0),
			vec![Term::plain(first)],
		));
		cs.add_constraint(R1C::new(
			vec![Term::plain(first)],
			vec![Term::plain(a), Term::plain(b)],
			vec![Term::plain(second)],
		));
		cs.lazy_instances.push(LazyInputs::Poseidon {
			state: state.to_vec(),
			output: square,
			loc,
		});
		state = [first, second];
		next += 4;
	}
	cs.add_constraint(R1C::new(
		vec![Term::plain(state[0])],
		vec![Term::plain(state[1])],
		vec![Term::plain(WireId(next))],
	));
	cs.levels = compute_levels(&cs);
	cs
}

#[test]
fn test_lazified_permutations_solve_like_the_unrolled_ones() {
	let n_instances = 4;
	let unrolled = permutation_chain(n_instances);
	let mut lazy = unrolled.clone();
	let old_to_new = lazy
		.lazify(&BTreeMap::from([(TemplateKey::Poseidon { width: 2 }, 4)]))
		.unwrap();
	assert_eq!(lazy.n_materialized(), 1);
	assert_eq!(lazy.n_constraints(), unrolled.n_constraints());

	let witness = [Fr::from(2u64), Fr::from(5u64)];
	let expected = run(&unrolled, &witness, &quiet_config()).unwrap();
	let solved = run(&lazy, &witness, &quiet_config()).unwrap();
	assert_eq!(solved.values, expected.values);
	for (old, &new) in old_to_new.iter().enumerate() {
		assert_eq!(
			(solved.a[new], solved.b[new], solved.c[new]),
			(expected.a[old], expected.b[old], expected.c[old])
		);
	}

	let (mut a, mut b) = (witness[0], witness[1]);
	for _ in 0..n_instances {
		let shifted = a + Fr::from(7u64);
		let first = shifted * shifted * shifted + b;
		(a, b) = (first, first * (a + b));
	}
	assert_eq!(solved.values[3 + 4 * n_instances], a * b);
}
