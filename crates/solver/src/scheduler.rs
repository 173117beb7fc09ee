// Copyright 2025 Irreducible Inc.
//! Level-by-level driver of the constraint resolution.

use std::{
	ops::Range,
	sync::atomic::{AtomicBool, Ordering},
};

use ark_ff::PrimeField;
use r1cs_core::R1C;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{config::SolverConfig, error::SolveError, resolve::solve_constraint, solution::Solution};

/// Destination of the evaluated `L`, `R` and `O` of every logical constraint.
pub struct Outputs<'o, F> {
	/// Values of `L`.
	pub a: &'o mut [F],
	/// Values of `R`.
	pub b: &'o mut [F],
	/// Values of `O`.
	pub c: &'o mut [F],
}

impl<F: Copy> Outputs<'_, F> {
	#[inline]
	fn write(&mut self, index: usize, (a, b, c): (F, F, F)) {
		self.a[index] = a;
		self.b[index] = b;
		self.c[index] = c;
	}
}

/// The number of chunks a level of `len` constraints is split into. One means the level runs on
/// the calling thread.
pub fn n_tasks(len: usize, n_workers: usize, min_work_per_worker: usize) -> usize {
	let min_work = min_work_per_worker.max(1);
	if len <= min_work {
		return 1;
	}
	n_workers.min(len.div_ceil(min_work)).max(1)
}

/// Splits `0..len` into `n_tasks` contiguous, near-equal ranges. The first `len % n_tasks`
/// ranges hold one extra item.
pub fn partition(len: usize, n_tasks: usize) -> Vec<Range<usize>> {
	let n_tasks = n_tasks.clamp(1, len.max(1));
	let base = len / n_tasks;
	let extra = len % n_tasks;
	let mut start = 0;
	(0..n_tasks)
		.map(|i| {
			let end = start + base + usize::from(i < extra);
			let range = start..end;
			start = end;
			range
		})
		.collect()
}

/// What one chunk of a parallel level produced.
struct ChunkResult<F> {
	/// `(a, b, c)` of the constraints solved, in chunk order.
	values: Vec<(F, F, F)>,
	error: Option<SolveError>,
}

/// Solves every level of the schedule in order, writing `(a, b, c)` of each constraint into
/// `outputs`.
///
/// Within a level, constraints are independent and may be solved by several workers. The first
/// failure stops every worker before its next constraint; the level is then drained and the
/// error of the earliest failing chunk is returned.
pub fn solve_levels<F: PrimeField>(
	solution: &Solution<F>,
	outputs: &mut Outputs<'_, F>,
	config: &SolverConfig<F>,
) -> Result<(), SolveError> {
	let cs = solution.constraint_system();
	let n_workers = config.workers();
	let min_work = config.min_work_per_worker;

	let needs_pool = cs
		.levels
		.iter()
		.any(|level| n_tasks(level.len(), n_workers, min_work) > 1);
	let pool = if needs_pool {
		Some(ThreadPoolBuilder::new().num_threads(n_workers).build()?)
	} else {
		None
	};

	let mut scratch = R1C::default();
	for (depth, level) in cs.levels.iter().enumerate() {
		let tasks = n_tasks(level.len(), n_workers, min_work);
		match &pool {
			Some(pool) if tasks > 1 => {
				let _scope = tracing::debug_span!(
					"Solve level",
					depth,
					n_constraints = level.len(),
					n_tasks = tasks
				)
				.entered();
				solve_parallel(pool, level, tasks, solution, outputs, config)?;
			}
			_ => {
				for &index in level {
					let values = solve_constraint(index, solution, &mut scratch)
						.map_err(|err| attach_debug_info(err, solution, config))?;
					outputs.write(index, values);
				}
			}
		}
	}
	Ok(())
}

fn solve_parallel<F: PrimeField>(
	pool: &ThreadPool,
	level: &[usize],
	n_tasks: usize,
	solution: &Solution<F>,
	outputs: &mut Outputs<'_, F>,
	config: &SolverConfig<F>,
) -> Result<(), SolveError> {
	let chunks = partition(level.len(), n_tasks);
	let abort = AtomicBool::new(false);

	let results = pool.install(|| {
		chunks
			.par_iter()
			.map(|range| {
				let chunk = &level[range.clone()];
				let mut scratch = R1C::default();
				let mut values = Vec::with_capacity(chunk.len());
				for &index in chunk {
					if abort.load(Ordering::Relaxed) {
						break;
					}
					match solve_constraint(index, solution, &mut scratch) {
						Ok(abc) => values.push(abc),
						Err(err) => {
							abort.store(true, Ordering::Relaxed);
							return ChunkResult {
								values,
								error: Some(attach_debug_info(err, solution, config)),
							};
						}
					}
				}
				ChunkResult {
					values,
					error: None,
				}
			})
			.collect::<Vec<_>>()
	});

	let mut first_error = None;
	for (range, result) in chunks.into_iter().zip(results) {
		for (&index, abc) in level[range].iter().zip(result.values) {
			outputs.write(index, abc);
		}
		if first_error.is_none() {
			first_error = result.error;
		}
	}
	match first_error {
		Some(err) => Err(err),
		None => Ok(()),
	}
}

/// Fills in the debug message of an unsatisfied constraint, when one was retained.
fn attach_debug_info<F: PrimeField>(
	err: SolveError,
	solution: &Solution<F>,
	config: &SolverConfig<F>,
) -> SolveError {
	match err {
		SolveError::UnsatisfiedConstraint {
			constraint,
			message,
			debug_info: None,
		} if config.debug => {
			let debug_info = solution
				.constraint_system()
				.debug_info_of(constraint)
				.map(|entry| entry.render(|expr| solution.render(expr)));
			SolveError::UnsatisfiedConstraint {
				constraint,
				message,
				debug_info,
			}
		}
		err => err,
	}
}
