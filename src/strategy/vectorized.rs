use crate::error::Result;
use crate::result::{BenchmarkResult, ExecutedWork};
use crate::workload::{Partition, WorkloadSpec};

use super::worker::vector_worker;
use super::{Harness, Strategy};

/// `W` lanes on the calling thread, one vector step at a time.
pub(super) fn run(
    harness: &Harness,
    spec: &WorkloadSpec,
    plan: &Partition,
) -> Result<BenchmarkResult> {
    let watch = harness.timer().start();
    let outcome = vector_worker(
        harness.backend(),
        harness.seed(),
        0,
        spec.lane_width,
        plan,
        true,
    )?;
    let elapsed = watch.elapsed_seconds();

    Ok(BenchmarkResult::new(
        Strategy::Vectorized.name(),
        spec.total_operations,
        elapsed,
        outcome.partial,
        ExecutedWork {
            lane_width: spec.lane_width,
            worker_steps: vec![outcome.steps],
            tail_steps: outcome.tail_steps,
        },
    ))
}
