//! Per-worker loops shared by the single- and multi-threaded strategies.
//!
//! Global lane numbering: scalar worker `i` owns lane `i`; vector worker `i`
//! owns lanes `i*W .. i*W + W`; the tail lane is `partition.lanes`.

use crate::error::Result;
use crate::simd::SimdBackend;
use crate::workload::{LaneSeed, Partition, MAX_LANE_WIDTH};

/// What a worker hands back once its loop is done.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorkerOutcome {
    /// Sum of the worker's lane accumulators (tail lane included).
    pub partial: f64,
    /// Main-loop steps executed per lane.
    pub steps: u64,
    pub tail_steps: u64,
}

/// One scalar lane, unfused.
pub(crate) fn scalar_worker(
    seed: &LaneSeed,
    index: usize,
    plan: &Partition,
    runs_tail: bool,
) -> WorkerOutcome {
    let mut lane = seed.lane(index);
    let steps = lane.run(plan.steps_per_lane);

    let (tail, tail_steps) = if runs_tail { run_tail(seed, plan) } else { (0.0, 0) };

    WorkerOutcome {
        partial: lane.result + tail,
        steps,
        tail_steps,
    }
}

/// `width` lanes advanced together by `backend`, then summed horizontally.
pub(crate) fn vector_worker(
    backend: SimdBackend,
    seed: &LaneSeed,
    index: usize,
    width: usize,
    plan: &Partition,
    runs_tail: bool,
) -> Result<WorkerOutcome> {
    let mut a = [0.0; MAX_LANE_WIDTH];
    let mut b = [0.0; MAX_LANE_WIDTH];
    for (slot, lane) in seed.lanes(index * width, width).enumerate() {
        a[slot] = lane.a;
        b[slot] = lane.b;
    }

    let mut out = [0.0; MAX_LANE_WIDTH];
    let steps = backend.run_lanes(
        width,
        &a[..width],
        &b[..width],
        plan.steps_per_lane,
        &mut out[..width],
    )?;

    let horizontal: f64 = out[..width].iter().sum();
    let (tail, tail_steps) = if runs_tail { run_tail(seed, plan) } else { (0.0, 0) };

    Ok(WorkerOutcome {
        partial: horizontal + tail,
        steps,
        tail_steps,
    })
}

fn run_tail(seed: &LaneSeed, plan: &Partition) -> (f64, u64) {
    if plan.tail_steps == 0 {
        return (0.0, 0);
    }
    let mut lane = seed.lane(plan.lanes as usize);
    let executed = lane.run(plan.tail_steps);
    (lane.result, executed)
}
