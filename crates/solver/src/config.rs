// Copyright 2025 Irreducible Inc.
//! Solver configuration.

use std::{
	io::Write,
	num::NonZeroUsize,
	sync::{Arc, Mutex},
};

use ark_ff::PrimeField;
use r1cs_core::Fr;

use crate::hints::{Hint, HintRegistry};

/// A level with at most this many constraints runs on the calling thread. Larger levels are split
/// into at most `len.div_ceil(MIN_WORK_PER_WORKER)` chunks.
pub const MIN_WORK_PER_WORKER: usize = 50;

/// Environment variable overriding the number of solver workers.
pub const SOLVER_THREADS_ENV: &str = "R1CS_SOLVER_THREADS";

/// Sink for the circuit print statements rendered after solving.
pub trait CircuitLogger: Send + Sync {
	/// Emits one rendered log line.
	fn log(&self, line: &str);
}

impl<W: Write + Send> CircuitLogger for Mutex<W> {
	fn log(&self, line: &str) {
		// A poisoned writer only loses log lines.
		if let Ok(mut writer) = self.lock() {
			let _ = writeln!(writer, "{line}");
		}
	}
}

/// Forwards circuit logs to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl CircuitLogger for TracingLogger {
	fn log(&self, line: &str) {
		tracing::info!(target: "circuit", "{line}");
	}
}

/// Options for a solve.
pub struct SolverConfig<F: PrimeField = Fr> {
	/// Hint functions available to the circuit.
	pub hints: HintRegistry<F>,
	/// Attach the debug message of a failing constraint to the error.
	pub debug: bool,
	/// Where circuit logs go. `None` drops them.
	pub logger: Option<Arc<dyn CircuitLogger>>,
	/// Number of worker threads. Defaults to the available parallelism.
	pub n_workers: Option<usize>,
	/// A level runs in parallel only if it has more than this many constraints, and is split
	/// into no more than `len.div_ceil(min_work_per_worker)` chunks.
	pub min_work_per_worker: usize,
}

impl<F: PrimeField> Default for SolverConfig<F> {
	fn default() -> Self {
		Self {
			hints: HintRegistry::with_builtins(),
			debug: true,
			logger: Some(Arc::new(TracingLogger)),
			n_workers: None,
			min_work_per_worker: MIN_WORK_PER_WORKER,
		}
	}
}

impl<F: PrimeField> SolverConfig<F> {
	/// The default configuration, with the worker count overridden by the
	/// `R1CS_SOLVER_THREADS` environment variable when it holds a positive integer.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Some(n_workers) = std::env::var(SOLVER_THREADS_ENV)
			.ok()
			.and_then(|value| value.parse::<usize>().ok())
			.filter(|&n| n > 0)
		{
			config.n_workers = Some(n_workers);
		}
		config
	}

	/// Registers an additional hint.
	pub fn with_hint(mut self, hint: impl Hint<F> + 'static) -> Self {
		self.hints.register(hint);
		self
	}

	/// Replaces the hint registry.
	pub fn with_hints(mut self, hints: HintRegistry<F>) -> Self {
		self.hints = hints;
		self
	}

	/// Sets the circuit log sink.
	pub fn with_logger(mut self, logger: Option<Arc<dyn CircuitLogger>>) -> Self {
		self.logger = logger;
		self
	}

	/// Sets the number of worker threads.
	pub fn with_workers(mut self, n_workers: usize) -> Self {
		self.n_workers = Some(n_workers);
		self
	}

	/// Sets the minimum work per worker before a level runs in parallel.
	pub fn with_min_work_per_worker(mut self, min_work_per_worker: usize) -> Self {
		self.min_work_per_worker = min_work_per_worker;
		self
	}

	/// Enables or disables debug messages in errors.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// The number of workers a solve uses.
	pub fn workers(&self) -> usize {
		self.n_workers
			.unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
			.max(1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = SolverConfig::<Fr>::default();
		assert!(config.debug);
		assert!(config.logger.is_some());
		assert_eq!(config.min_work_per_worker, MIN_WORK_PER_WORKER);
		assert_eq!(config.hints.len(), 4);
		assert!(config.workers() >= 1);
	}

	#[test]
	fn test_builder() {
		let config = SolverConfig::<Fr>::default()
			.with_workers(0)
			.with_min_work_per_worker(2)
			.with_debug(false)
			.with_logger(None);
		assert_eq!(config.workers(), 1);
		assert_eq!(config.min_work_per_worker, 2);
		assert!(!config.debug);
		assert!(config.logger.is_none());
	}

	#[test]
	fn test_workers_from_env() {
		// The only test in this crate touching the variable.
		for (value, expected) in [("3", Some(3)), ("0", None), ("abc", None), ("-2", None)] {
			unsafe { std::env::set_var(SOLVER_THREADS_ENV, value) };
			assert_eq!(SolverConfig::<Fr>::from_env().n_workers, expected, "{value}");
		}
		unsafe { std::env::remove_var(SOLVER_THREADS_ENV) };
		assert_eq!(SolverConfig::<Fr>::from_env().n_workers, None);
	}

	#[test]
	fn test_writer_logger() {
		let logger = Mutex::new(Vec::<u8>::new());
		logger.log("x = 3");
		logger.log("y = 4");
		let written = logger.into_inner().unwrap();
		assert_eq!(String::from_utf8(written).unwrap(), "x = 3\ny = 4\n");
	}
}
