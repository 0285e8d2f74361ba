use flopbench::{
    Accumulation, Harness, LaneSeed, RemainderPolicy, SimdBackend, Strategy, Timer, WorkloadSpec,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn harness() -> Harness {
    Harness::new(Timer::calibrate().unwrap(), SimdBackend::detect())
}

fn ordered() -> Harness {
    harness().with_accumulation(Accumulation::Ordered)
}

#[test]
fn scalar_runs_every_operation_on_one_lane() {
    let spec = Strategy::Scalar.workload(1_000_000, 1, 1).unwrap();
    let result = harness().run(Strategy::Scalar, &spec).unwrap();

    assert_eq!(result.strategy, "Single-threaded scalar");
    assert_eq!(result.executed.worker_steps, vec![1_000_000]);
    assert_eq!(result.executed.lane_steps(), 1_000_000);
    assert_eq!(result.total_flops, 4_000_000.0);
    assert!(result.elapsed_seconds >= 0.0);
    assert!(result.is_sane());
}

#[test]
fn vectorized_runs_total_over_width_steps_per_lane() {
    let harness = harness();
    let width = harness.backend().natural_width();
    let spec = Strategy::Vectorized.workload(1_000_003, 1, width).unwrap();
    let result = harness.run(Strategy::Vectorized, &spec).unwrap();

    assert_eq!(result.executed.lane_width, width);
    assert_eq!(result.executed.steps_per_lane(), Some(1_000_003 / width as u64));
}

#[test]
fn threaded_scalar_splits_evenly_across_workers() {
    let spec = Strategy::ThreadedScalar.workload(4_000_000, 4, 1).unwrap();
    let result = harness().run(Strategy::ThreadedScalar, &spec).unwrap();

    assert_eq!(result.executed.worker_steps, vec![1_000_000; 4]);
    assert_eq!(result.executed.lanes(), 4);
}

#[test]
fn threaded_vectorized_runs_total_over_threads_times_width() {
    let harness = harness();
    let width = harness.backend().natural_width();
    let spec = Strategy::ThreadedVectorized.workload(3_000_001, 3, width).unwrap();
    let result = harness.run(Strategy::ThreadedVectorized, &spec).unwrap();

    let expected = 3_000_001 / (3 * width as u64);
    assert_eq!(result.executed.worker_steps, vec![expected; 3]);
    assert_eq!(result.executed.lanes(), 3 * width as u64);
}

#[test]
fn every_strategy_charges_the_same_operations() {
    let harness = harness();
    let results = harness
        .run_all(2_000_000, 2, harness.backend().natural_width())
        .unwrap();

    assert_eq!(results.len(), 4);
    for (result, strategy) in results.iter().zip(Strategy::ALL) {
        assert_eq!(result.strategy, strategy.name());
        assert_eq!(result.total_operations, 2_000_000);
        assert_eq!(result.total_flops, 8_000_000.0);
    }
}

/// Accumulator of global lane `index` after `steps` steps, computed the way
/// the kernel for `width` computes it: native vector kernels fuse the
/// multiply-add, width 1 does not.
fn reference_lane(index: usize, width: usize, steps: u64) -> f64 {
    let mut lane = LaneSeed::CPU.lane(index);
    if width == 1 {
        lane.run(steps);
    } else {
        lane.run_fused(steps);
    }
    lane.result
}

/// Ordered total of `threads` workers of `width` lanes each.
fn reference_total(threads: usize, width: usize, steps: u64) -> f64 {
    (0..threads).fold(0.0, |total, worker| {
        let partial: f64 = (worker * width..worker * width + width)
            .map(|index| reference_lane(index, width, steps))
            .sum();
        total + partial
    })
}

#[test]
fn repeated_runs_are_bit_identical() {
    let harness = ordered();
    let width = harness.backend().natural_width();
    let threads = 4;
    for strategy in Strategy::ALL {
        // four steps per lane keeps every accumulator finite
        let lanes = strategy.workload(0, threads, width).unwrap().lanes();
        let spec = strategy.workload(4 * lanes, threads, width).unwrap();

        let first = harness.run(strategy, &spec).unwrap();
        let second = harness.run(strategy, &spec).unwrap();

        assert_eq!(first.executed.steps_per_lane(), Some(4), "{strategy}");
        assert!(first.final_result.is_finite(), "{strategy} overflowed");
        assert_eq!(
            first.final_result.to_bits(),
            second.final_result.to_bits(),
            "{strategy} is not reproducible"
        );
    }
}

#[test]
fn every_strategy_matches_an_isolated_lane_reference() {
    let harness = ordered();
    let width = harness.backend().natural_width();
    let threads = 3;
    for strategy in Strategy::ALL {
        let spec = strategy.workload(0, threads, width).unwrap();
        let spec = strategy
            .workload(5 * spec.lanes(), threads, width)
            .unwrap();
        let result = harness.run(strategy, &spec).unwrap();

        let expected = reference_total(spec.thread_count, spec.lane_width, 5);
        assert!(expected.is_finite());
        assert_eq!(
            result.final_result.to_bits(),
            expected.to_bits(),
            "{strategy}: {} != {expected}",
            result.final_result
        );
    }
}

#[test]
fn threaded_total_equals_sum_of_isolated_lanes() {
    // few enough steps that every lane stays finite
    let spec = WorkloadSpec::new(20, 1, 4).unwrap();
    let result = ordered().run(Strategy::ThreadedScalar, &spec).unwrap();

    let isolated = (0..4).fold(0.0, |total, index| {
        let mut lane = LaneSeed::CPU.lane(index);
        lane.run(5);
        total + lane.result
    });

    assert!(result.final_result.is_finite());
    assert_eq!(result.final_result.to_bits(), isolated.to_bits());
}

#[test]
fn atomic_total_matches_ordered_total_closely() {
    let spec = WorkloadSpec::new(24, 1, 8).unwrap();
    let atomic = harness().run(Strategy::ThreadedScalar, &spec).unwrap();
    let ordered = ordered().run(Strategy::ThreadedScalar, &spec).unwrap();

    let relative = ((atomic.final_result - ordered.final_result) / ordered.final_result).abs();
    assert!(relative < 1e-12, "relative difference {relative}");
}

#[test]
fn long_runs_saturate_without_nan() {
    // the accumulator overflows after about ten steps; inf must stay inf
    let spec = WorkloadSpec::new(4_000_000, 1, 4).unwrap();
    let result = ordered().run(Strategy::ThreadedScalar, &spec).unwrap();

    assert_eq!(result.executed.worker_steps, vec![1_000_000; 4]);
    assert_eq!(result.final_result, f64::INFINITY);
}

#[test]
fn tail_policy_executes_every_operation() {
    let harness = harness().with_remainder(RemainderPolicy::Tail);
    let width = harness.backend().natural_width();
    for strategy in Strategy::ALL {
        let spec = strategy.workload(1_000_003, 3, width).unwrap();
        let result = harness.run(strategy, &spec).unwrap();
        assert_eq!(result.executed.lane_steps(), 1_000_003, "{strategy}");
    }
}

#[test]
fn truncate_policy_drops_the_remainder() {
    let spec = Strategy::ThreadedScalar.workload(1_003, 4, 1).unwrap();
    let result = harness().run(Strategy::ThreadedScalar, &spec).unwrap();
    assert_eq!(result.executed.lane_steps(), 1_000);
    assert_eq!(result.executed.tail_steps, 0);
    // the charged count still reflects the request
    assert_eq!(result.total_operations, 1_003);
}

#[test]
fn randomized_step_counts() {
    let harness = harness();
    let width = harness.backend().natural_width();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20 {
        let total = rng.random_range(0..50_000u64);
        let threads = rng.random_range(1..=6usize);
        let strategy = Strategy::ALL[rng.random_range(0..4)];

        let spec = strategy.workload(total, threads, width).unwrap();
        let result = harness.run(strategy, &spec).unwrap();

        let lanes = spec.lanes();
        assert_eq!(result.executed.lanes(), lanes);
        assert_eq!(result.executed.lane_steps(), total / lanes * lanes);
    }
}

#[test]
fn unsupported_width_is_a_capability_error() {
    let harness = Harness::new(Timer::calibrate().unwrap(), SimdBackend::Portable);
    let spec = Strategy::Vectorized.workload(1_000, 1, 4).unwrap();
    let err = harness.run(Strategy::Vectorized, &spec).unwrap_err();
    assert!(matches!(
        err,
        flopbench::BenchError::CapabilityUnsupported { requested: 4, .. }
    ));
}
