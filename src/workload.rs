//! The anti-optimization recurrence and its work partitioning.
//!
//! Every lane of every strategy runs the same serially dependent update:
//!
//! ```text
//! result = a*b + result
//! a      = result * 0.999999
//! b      = a + 1.000001
//! ```
//!
//! Each step is charged [`FLOPS_PER_STEP`] floating-point operations, also
//! when the multiply-add executes as a single fused instruction.
//!
//! Lane `i` starts from `(a0 + i*increment, b0 + i*increment, 0)` so that no
//! two lanes compute the same sequence.

use std::hint::black_box;

use num::traits::AsPrimitive;
use num::Float;

use crate::error::{invalid_workload, Result};

/// Logical floating-point operations charged per recurrence step.
pub const FLOPS_PER_STEP: u64 = 4;

/// Widest lane group a single worker may run.
pub const MAX_LANE_WIDTH: usize = 8;

/// Floating-point types the recurrence runs on.
pub trait RecurrenceFloat: Float + 'static {
    /// Multiplier applied to the accumulator to form the next `a`.
    const DECAY: Self;
    /// Addend applied to `a` to form the next `b`.
    const BUMP: Self;
}

impl RecurrenceFloat for f64 {
    const DECAY: f64 = 0.999999;
    const BUMP: f64 = 1.000001;
}

impl RecurrenceFloat for f32 {
    const DECAY: f32 = 0.999999;
    const BUMP: f32 = 1.000001;
}

/// Mutable `(a, b, result)` triple of one lane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneState<T = f64> {
    pub a: T,
    pub b: T,
    pub result: T,
}

impl<T: RecurrenceFloat> LaneState<T> {
    pub fn new(a: T, b: T) -> Self {
        Self {
            a,
            b,
            result: T::zero(),
        }
    }

    /// One step with a separate multiply and add.
    #[inline(always)]
    pub fn step(&mut self) {
        self.result = self.a * self.b + self.result;
        self.a = self.result * T::DECAY;
        self.b = self.a + T::BUMP;
    }

    /// One step with the multiply-add fused.
    #[inline(always)]
    pub fn step_fused(&mut self) {
        self.result = self.a.mul_add(self.b, self.result);
        self.a = self.result * T::DECAY;
        self.b = self.a + T::BUMP;
    }

    /// Runs `steps` unfused steps and returns how many were executed.
    ///
    /// The state passes through [`black_box`] on the way in and out so the
    /// optimizer can neither constant-fold the seed nor discard the loop.
    #[inline]
    pub fn run(&mut self, steps: u64) -> u64 {
        let mut lane = black_box(*self);
        let mut executed = 0u64;
        for _ in 0..steps {
            lane.step();
            executed += 1;
        }
        *self = black_box(lane);
        executed
    }

    /// Fused counterpart of [`LaneState::run`].
    #[inline]
    pub fn run_fused(&mut self, steps: u64) -> u64 {
        let mut lane = black_box(*self);
        let mut executed = 0u64;
        for _ in 0..steps {
            lane.step_fused();
            executed += 1;
        }
        *self = black_box(lane);
        executed
    }
}

/// Deterministic per-lane seeding scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSeed<T = f64> {
    pub a0: T,
    pub b0: T,
    pub increment: T,
}

impl LaneSeed<f64> {
    /// Seeds used by the CPU strategies.
    pub const CPU: LaneSeed<f64> = LaneSeed {
        a0: 1.23456789,
        b0: 9.87654321,
        increment: 0.1,
    };
}

impl LaneSeed<f32> {
    /// Seeds used by the GPU kernel, one lane per work item.
    pub const GPU: LaneSeed<f32> = LaneSeed {
        a0: 1.23456,
        b0: 9.87654,
        increment: 0.001,
    };
}

impl Default for LaneSeed<f64> {
    fn default() -> Self {
        Self::CPU
    }
}

impl<T> LaneSeed<T>
where
    T: RecurrenceFloat,
    usize: AsPrimitive<T>,
{
    /// Fresh state for global lane `index`.
    pub fn lane(&self, index: usize) -> LaneState<T> {
        let offset = index.as_() * self.increment;
        LaneState::new(self.a0 + offset, self.b0 + offset)
    }

    /// Fresh states for `width` consecutive lanes starting at `first`.
    pub fn lanes(&self, first: usize, width: usize) -> impl Iterator<Item = LaneState<T>> + '_ {
        (first..first + width).map(move |index| self.lane(index))
    }
}

/// What to do with operations that do not divide evenly across lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// Drop the remainder; every lane runs `total / lanes` steps.
    #[default]
    Truncate,
    /// Run the remainder as scalar steps on one extra tail lane.
    Tail,
}

impl RemainderPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "truncate" | "drop" => Some(Self::Truncate),
            "tail" => Some(Self::Tail),
            _ => None,
        }
    }
}

/// Shape of one strategy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub total_operations: u64,
    pub lane_width: usize,
    pub thread_count: usize,
}

impl WorkloadSpec {
    pub fn new(total_operations: u64, lane_width: usize, thread_count: usize) -> Result<Self> {
        if lane_width == 0 || lane_width > MAX_LANE_WIDTH {
            return Err(invalid_workload(format!(
                "lane width must be in 1..={MAX_LANE_WIDTH}, got {lane_width}"
            )));
        }
        if thread_count == 0 {
            return Err(invalid_workload("thread count must be at least 1"));
        }
        if thread_count.checked_mul(lane_width).is_none() {
            return Err(invalid_workload(format!(
                "{thread_count} threads x {lane_width} lanes overflows the lane count"
            )));
        }
        Ok(Self {
            total_operations,
            lane_width,
            thread_count,
        })
    }

    /// Total number of independent lanes, `thread_count * lane_width`.
    ///
    /// [`WorkloadSpec::new`] rejects shapes whose product does not fit;
    /// hand-built specs saturate instead of wrapping.
    pub fn lanes(&self) -> u64 {
        (self.thread_count as u64).saturating_mul(self.lane_width as u64)
    }

    pub fn partition(&self, policy: RemainderPolicy) -> Partition {
        let lanes = self.lanes();
        let steps_per_lane = self.total_operations / lanes;
        let remainder = self.total_operations % lanes;

        let (tail_steps, dropped) = match policy {
            RemainderPolicy::Truncate => (0, remainder),
            RemainderPolicy::Tail => (remainder, 0),
        };

        Partition {
            lanes,
            steps_per_lane,
            tail_steps,
            dropped,
        }
    }
}

/// Steps each lane runs for a given [`WorkloadSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Lanes in the main loop; also the global index of the tail lane.
    pub lanes: u64,
    pub steps_per_lane: u64,
    /// Scalar steps run by the tail lane (always 0 under `Truncate`).
    pub tail_steps: u64,
    /// Operations silently dropped (always 0 under `Tail`).
    pub dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_matches_hand_computation() {
        let mut lane = LaneSeed::CPU.lane(0);
        lane.step();

        let expected = 1.23456789f64 * 9.87654321;
        assert_eq!(lane.result, expected);
        assert!((lane.result - 12.19326).abs() < 1e-5, "got {}", lane.result);
        assert_eq!(lane.a, expected * 0.999999);
        assert_eq!(lane.b, lane.a + 1.000001);
    }

    #[test]
    fn test_run_reports_executed_steps() {
        let mut lane = LaneSeed::CPU.lane(3);
        assert_eq!(lane.run(0), 0);
        assert_eq!(lane.run(17), 17);
        assert_eq!(lane.run_fused(5), 5);
    }

    #[test]
    fn test_run_is_bit_reproducible() {
        let mut first = LaneSeed::CPU.lane(2);
        let mut second = LaneSeed::CPU.lane(2);
        first.run(1_000);
        second.run(1_000);
        assert_eq!(first.result.to_bits(), second.result.to_bits());
        assert_eq!(first.a.to_bits(), second.a.to_bits());
    }

    #[test]
    fn test_lanes_diverge() {
        let seeds: Vec<_> = LaneSeed::CPU.lanes(0, 4).collect();
        for pair in seeds.windows(2) {
            assert!(pair[1].a > pair[0].a);
            assert!(pair[1].b > pair[0].b);
        }
        assert_eq!(seeds[0], LaneSeed::CPU.lane(0));
        assert!((seeds[3].a - (1.23456789 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_gpu_seed_is_f32() {
        let lane: LaneState<f32> = LaneSeed::GPU.lane(10);
        assert!((lane.a - 1.24456).abs() < 1e-5);
        assert_eq!(lane.result, 0.0);
    }

    #[test]
    fn test_fused_and_unfused_agree_closely_for_few_steps() {
        let mut plain = LaneSeed::CPU.lane(1);
        let mut fused = plain;
        plain.run(3);
        fused.run_fused(3);
        let relative = ((plain.result - fused.result) / plain.result).abs();
        assert!(relative < 1e-12, "relative difference {}", relative);
    }

    #[test]
    fn test_partition_truncates_by_default() {
        let spec = WorkloadSpec::new(103, 4, 2).unwrap();
        let plan = spec.partition(RemainderPolicy::default());
        assert_eq!(plan.lanes, 8);
        assert_eq!(plan.steps_per_lane, 12);
        assert_eq!(plan.tail_steps, 0);
        assert_eq!(plan.dropped, 7);
    }

    #[test]
    fn test_partition_tail_keeps_every_operation() {
        let spec = WorkloadSpec::new(103, 4, 2).unwrap();
        let plan = spec.partition(RemainderPolicy::Tail);
        assert_eq!(plan.steps_per_lane * plan.lanes + plan.tail_steps, 103);
        assert_eq!(plan.dropped, 0);
    }

    #[test]
    fn test_workload_rejects_zero_threads_and_bad_widths() {
        assert!(WorkloadSpec::new(10, 1, 0).is_err());
        assert!(WorkloadSpec::new(10, 0, 1).is_err());
        assert!(WorkloadSpec::new(10, MAX_LANE_WIDTH + 1, 1).is_err());
        assert!(WorkloadSpec::new(0, 1, 1).is_ok());
    }

    #[test]
    fn test_workload_rejects_overflowing_lane_count() {
        let err = WorkloadSpec::new(400_000_000, 4, usize::MAX / 2).unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert!(WorkloadSpec::new(400_000_000, MAX_LANE_WIDTH, usize::MAX).is_err());
    }

    #[test]
    fn test_remainder_policy_parse() {
        assert_eq!(RemainderPolicy::parse("Tail"), Some(RemainderPolicy::Tail));
        assert_eq!(RemainderPolicy::parse(" truncate "), Some(RemainderPolicy::Truncate));
        assert_eq!(RemainderPolicy::parse("round-up"), None);
    }
}
