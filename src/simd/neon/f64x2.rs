//! NEON 2-lane f64 vector.
//!
//! `F64x2` wraps a `float64x2_t` register. `vfmaq_f64(c, a, b)` computes
//! `c + a*b` in one rounding.

use std::arch::aarch64::*;

use crate::simd::traits::{run_lanes, LaneVector};

/// Number of f64 elements in a 128-bit NEON register.
pub(crate) const LANE_COUNT: usize = 2;

/// NEON register holding 2 packed f64 lanes.
#[derive(Copy, Clone, Debug)]
pub struct F64x2 {
    pub elements: float64x2_t,
}

impl LaneVector for F64x2 {
    const LANES: usize = LANE_COUNT;

    #[inline(always)]
    unsafe fn load(values: &[f64]) -> Self {
        debug_assert!(values.len() >= LANE_COUNT);
        Self {
            elements: vld1q_f64(values.as_ptr()),
        }
    }

    #[inline(always)]
    unsafe fn splat(value: f64) -> Self {
        Self {
            elements: vdupq_n_f64(value),
        }
    }

    #[inline(always)]
    unsafe fn fmadd(self, b: Self, c: Self) -> Self {
        Self {
            elements: vfmaq_f64(c.elements, self.elements, b.elements),
        }
    }

    #[inline(always)]
    unsafe fn mul(self, rhs: Self) -> Self {
        Self {
            elements: vmulq_f64(self.elements, rhs.elements),
        }
    }

    #[inline(always)]
    unsafe fn add(self, rhs: Self) -> Self {
        Self {
            elements: vaddq_f64(self.elements, rhs.elements),
        }
    }

    #[inline(always)]
    unsafe fn store(self, out: &mut [f64]) {
        debug_assert!(out.len() >= LANE_COUNT);
        vst1q_f64(out.as_mut_ptr(), self.elements);
    }
}

/// Runs the recurrence on 2 lanes with NEON.
///
/// # Safety
///
/// The CPU must support `neon`; see [`super::available`].
#[target_feature(enable = "neon")]
pub unsafe fn run_f64x2(a: &[f64], b: &[f64], steps: u64, out: &mut [f64]) -> u64 {
    assert!(a.len() >= LANE_COUNT && b.len() >= LANE_COUNT && out.len() >= LANE_COUNT);
    run_lanes::<F64x2>(a, b, steps, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::LaneSeed;

    #[test]
    fn test_f64x2_lanes_track_fused_scalar() {
        let seeds: Vec<_> = LaneSeed::CPU.lanes(4, LANE_COUNT).collect();
        let a: Vec<f64> = seeds.iter().map(|s| s.a).collect();
        let b: Vec<f64> = seeds.iter().map(|s| s.b).collect();
        let mut out = [0.0; LANE_COUNT];

        let executed = unsafe { run_f64x2(&a, &b, 5, &mut out) };
        assert_eq!(executed, 5);

        for (lane, seed) in out.iter().zip(seeds) {
            let mut expected = seed;
            expected.run_fused(5);
            assert!(lane.is_finite());
            assert_eq!(lane.to_bits(), expected.result.to_bits());
        }
    }
}
