//! The four execution strategies and the harness that runs them.
//!
//! Every strategy is one linear pass: seed lanes, run the loop, combine
//! partials, stop the clock. The clock brackets worker creation through
//! join, so thread start-up and teardown are part of the measurement.

mod scalar;
mod threaded;
mod vectorized;
pub(crate) mod worker;

use std::fmt;

use crate::accumulate::Accumulation;
use crate::error::{invalid_workload, Result};
use crate::result::BenchmarkResult;
use crate::simd::SimdBackend;
use crate::timer::Timer;
use crate::workload::{LaneSeed, RemainderPolicy, WorkloadSpec};

/// Name the GPU collaborator's result is reported under.
pub const GPU_STRATEGY_NAME: &str = "GPU compute kernel";

/// Execution strategy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One lane, one thread. Baseline for every speedup.
    Scalar,
    /// One thread, `W` lanes per step.
    Vectorized,
    /// `T` threads, one lane each.
    ThreadedScalar,
    /// `T` threads, `W` lanes each.
    ThreadedVectorized,
}

impl Strategy {
    /// All strategies in report order.
    pub const ALL: [Strategy; 4] = [
        Strategy::Scalar,
        Strategy::Vectorized,
        Strategy::ThreadedScalar,
        Strategy::ThreadedVectorized,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Scalar => "Single-threaded scalar",
            Strategy::Vectorized => "Single-threaded vectorized",
            Strategy::ThreadedScalar => "Multi-threaded scalar",
            Strategy::ThreadedVectorized => "Multi-threaded vectorized",
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Strategy::Scalar)
    }

    pub fn is_threaded(&self) -> bool {
        matches!(self, Strategy::ThreadedScalar | Strategy::ThreadedVectorized)
    }

    pub fn is_vectorized(&self) -> bool {
        matches!(self, Strategy::Vectorized | Strategy::ThreadedVectorized)
    }

    /// The workload this strategy runs for the given machine shape.
    pub fn workload(
        &self,
        total_operations: u64,
        thread_count: usize,
        lane_width: usize,
    ) -> Result<WorkloadSpec> {
        let width = if self.is_vectorized() { lane_width } else { 1 };
        let threads = if self.is_threaded() { thread_count } else { 1 };
        WorkloadSpec::new(total_operations, width, threads)
    }

    fn validate(&self, spec: &WorkloadSpec) -> Result<()> {
        if !self.is_vectorized() && spec.lane_width != 1 {
            return Err(invalid_workload(format!(
                "{} runs one lane per worker, got lane width {}",
                self.name(),
                spec.lane_width
            )));
        }
        if !self.is_threaded() && spec.thread_count != 1 {
            return Err(invalid_workload(format!(
                "{} runs on one thread, got {} threads",
                self.name(),
                spec.thread_count
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs strategies against one clock, backend and policy set.
#[derive(Debug, Clone, Copy)]
pub struct Harness {
    timer: Timer,
    backend: SimdBackend,
    seed: LaneSeed,
    remainder: RemainderPolicy,
    accumulation: Accumulation,
}

impl Harness {
    pub fn new(timer: Timer, backend: SimdBackend) -> Self {
        Self {
            timer,
            backend,
            seed: LaneSeed::CPU,
            remainder: RemainderPolicy::default(),
            accumulation: Accumulation::default(),
        }
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_seed(mut self, seed: LaneSeed) -> Self {
        self.seed = seed;
        self
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    pub fn seed(&self) -> &LaneSeed {
        &self.seed
    }

    pub fn remainder(&self) -> RemainderPolicy {
        self.remainder
    }

    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    /// Runs one strategy to completion.
    pub fn run(&self, strategy: Strategy, spec: &WorkloadSpec) -> Result<BenchmarkResult> {
        strategy.validate(spec)?;
        if strategy.is_vectorized() {
            self.backend.check_width(spec.lane_width)?;
        }

        let plan = spec.partition(self.remainder);
        tracing::debug!(
            strategy = strategy.name(),
            total_operations = spec.total_operations,
            lane_width = spec.lane_width,
            thread_count = spec.thread_count,
            steps_per_lane = plan.steps_per_lane,
            tail_steps = plan.tail_steps,
            dropped = plan.dropped,
            "running strategy"
        );

        let result = match strategy {
            Strategy::Scalar => scalar::run(self, spec, &plan),
            Strategy::Vectorized => vectorized::run(self, spec, &plan)?,
            Strategy::ThreadedScalar => threaded::run_scalar(self, spec, &plan)?,
            Strategy::ThreadedVectorized => threaded::run_vectorized(self, spec, &plan)?,
        };

        tracing::debug!(
            strategy = strategy.name(),
            elapsed_seconds = result.elapsed_seconds,
            lane_steps = result.executed.lane_steps(),
            "strategy finished"
        );
        if !result.is_sane() {
            tracing::warn!(strategy = strategy.name(), "accumulator is zero after a non-empty run");
        }

        Ok(result)
    }

    /// Runs every strategy in report order, scalar first.
    pub fn run_all(
        &self,
        total_operations: u64,
        thread_count: usize,
        lane_width: usize,
    ) -> Result<Vec<BenchmarkResult>> {
        Strategy::ALL
            .iter()
            .map(|strategy| {
                let spec = strategy.workload(total_operations, thread_count, lane_width)?;
                self.run(*strategy, &spec)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_shapes() {
        let scalar = Strategy::Scalar.workload(1_000, 8, 4).unwrap();
        assert_eq!((scalar.lane_width, scalar.thread_count), (1, 1));

        let vectorized = Strategy::Vectorized.workload(1_000, 8, 4).unwrap();
        assert_eq!((vectorized.lane_width, vectorized.thread_count), (4, 1));

        let threaded = Strategy::ThreadedScalar.workload(1_000, 8, 4).unwrap();
        assert_eq!((threaded.lane_width, threaded.thread_count), (1, 8));

        let both = Strategy::ThreadedVectorized.workload(1_000, 8, 4).unwrap();
        assert_eq!((both.lane_width, both.thread_count), (4, 8));
    }

    #[test]
    fn test_mismatched_spec_is_rejected() {
        let harness = Harness::new(Timer::calibrate().unwrap(), SimdBackend::Portable);
        let spec = WorkloadSpec::new(100, 1, 2).unwrap();
        let err = harness.run(Strategy::Scalar, &spec).unwrap_err();
        assert!(err.to_string().contains("one thread"));
    }

    #[test]
    fn test_only_scalar_is_baseline() {
        let baselines: Vec<_> = Strategy::ALL.iter().filter(|s| s.is_baseline()).collect();
        assert_eq!(baselines, vec![&Strategy::Scalar]);
    }
}
