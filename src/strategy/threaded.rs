//! Multi-threaded strategies.
//!
//! Each run builds a scoped rayon pool with exactly `thread_count` threads
//! and broadcasts one worker onto every thread. `build_scoped` joins all
//! threads before returning, so no pool outlives the strategy and the
//! measured time covers spawn through join.

use rayon::ThreadPoolBuilder;

use crate::accumulate::{ordered_sum, Accumulation, SharedTotal};
use crate::error::{worker_pool, Result};
use crate::result::{BenchmarkResult, ExecutedWork};
use crate::workload::{Partition, WorkloadSpec};

use super::worker::{scalar_worker, vector_worker, WorkerOutcome};
use super::{Harness, Strategy};

pub(super) fn run_scalar(
    harness: &Harness,
    spec: &WorkloadSpec,
    plan: &Partition,
) -> Result<BenchmarkResult> {
    let seed = harness.seed();
    run(harness, Strategy::ThreadedScalar, spec, plan, |index| {
        Ok(scalar_worker(seed, index, plan, index == 0))
    })
}

pub(super) fn run_vectorized(
    harness: &Harness,
    spec: &WorkloadSpec,
    plan: &Partition,
) -> Result<BenchmarkResult> {
    let backend = harness.backend();
    let seed = harness.seed();
    let width = spec.lane_width;
    run(harness, Strategy::ThreadedVectorized, spec, plan, |index| {
        vector_worker(backend, seed, index, width, plan, index == 0)
    })
}

fn run<F>(
    harness: &Harness,
    strategy: Strategy,
    spec: &WorkloadSpec,
    plan: &Partition,
    worker: F,
) -> Result<BenchmarkResult>
where
    F: Fn(usize) -> Result<WorkerOutcome> + Sync,
{
    let accumulation = harness.accumulation();
    let total = SharedTotal::new();

    let watch = harness.timer().start();

    let outcomes = ThreadPoolBuilder::new()
        .num_threads(spec.thread_count)
        .thread_name(|index| format!("flops-worker-{index}"))
        .build_scoped(
            |thread| thread.run(),
            |pool| {
                pool.broadcast(|ctx| -> Result<WorkerOutcome> {
                    let outcome = worker(ctx.index())?;
                    if accumulation == Accumulation::Atomic {
                        total.add(outcome.partial);
                    }
                    Ok(outcome)
                })
            },
        )
        .map_err(|err| worker_pool(strategy.name(), err))?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    let final_result = match accumulation {
        Accumulation::Atomic => total.load(),
        Accumulation::Ordered => ordered_sum(outcomes.iter().map(|outcome| outcome.partial)),
    };

    let elapsed = watch.elapsed_seconds();

    Ok(BenchmarkResult::new(
        strategy.name(),
        spec.total_operations,
        elapsed,
        final_result,
        ExecutedWork {
            lane_width: spec.lane_width,
            worker_steps: outcomes.iter().map(|outcome| outcome.steps).collect(),
            tail_steps: outcomes.iter().map(|outcome| outcome.tail_steps).sum(),
        },
    ))
}
