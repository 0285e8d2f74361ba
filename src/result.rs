//! Measured outcome of one strategy run.

use crate::throughput::total_flops;
use crate::workload::FLOPS_PER_STEP;

/// Outcome of one strategy (or GPU) run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    /// Display name of the strategy that produced this result.
    pub strategy: String,
    /// Wall-clock seconds from the first worker start to the last join.
    pub elapsed_seconds: f64,
    /// Operations charged to this run (`total_operations` of the workload).
    pub total_operations: u64,
    /// `total_operations * 4`, derived rather than measured.
    pub total_flops: f64,
    /// Combined accumulator of every lane. Consumed by the report so the
    /// computation can never be proven dead.
    pub final_result: f64,
    /// Work the kernels reported executing.
    pub executed: ExecutedWork,
}

impl BenchmarkResult {
    pub fn new(
        strategy: impl Into<String>,
        total_operations: u64,
        elapsed_seconds: f64,
        final_result: f64,
        executed: ExecutedWork,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            elapsed_seconds,
            total_operations,
            total_flops: total_flops(total_operations),
            final_result,
            executed,
        }
    }

    /// A zero accumulator after a non-empty run means the loop never ran.
    pub fn is_sane(&self) -> bool {
        self.executed.lane_steps() == 0 || self.final_result != 0.0
    }
}

/// Step counts reported back by the kernels, independent of timing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutedWork {
    /// Lanes advanced together by each worker.
    pub lane_width: usize,
    /// Main-loop steps each worker executed, indexed by worker.
    pub worker_steps: Vec<u64>,
    /// Scalar steps executed on the tail lane, if any.
    pub tail_steps: u64,
}

impl ExecutedWork {
    pub fn lanes(&self) -> u64 {
        (self.lane_width * self.worker_steps.len()) as u64
    }

    /// Steps per lane if every worker ran the same count.
    pub fn steps_per_lane(&self) -> Option<u64> {
        let first = *self.worker_steps.first()?;
        self.worker_steps
            .iter()
            .all(|steps| *steps == first)
            .then_some(first)
    }

    /// Recurrence steps executed across all lanes, tail included.
    pub fn lane_steps(&self) -> u64 {
        self.worker_steps.iter().sum::<u64>() * self.lane_width as u64 + self.tail_steps
    }

    /// Floating-point operations actually executed.
    pub fn logical_flops(&self) -> u64 {
        self.lane_steps() * FLOPS_PER_STEP
    }
}
