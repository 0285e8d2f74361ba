use crate::result::{BenchmarkResult, ExecutedWork};
use crate::workload::{Partition, WorkloadSpec};

use super::worker::scalar_worker;
use super::{Harness, Strategy};

/// Single lane on the calling thread.
pub(super) fn run(harness: &Harness, spec: &WorkloadSpec, plan: &Partition) -> BenchmarkResult {
    let watch = harness.timer().start();
    let outcome = scalar_worker(harness.seed(), 0, plan, true);
    let elapsed = watch.elapsed_seconds();

    BenchmarkResult::new(
        Strategy::Scalar.name(),
        spec.total_operations,
        elapsed,
        outcome.partial,
        ExecutedWork {
            lane_width: 1,
            worker_steps: vec![outcome.steps],
            tail_steps: outcome.tail_steps,
        },
    )
}
