//! AVX2 4-lane f64 vector.
//!
//! `F64x4` wraps an `__m256d` register. The recurrence step maps onto
//! `_mm256_fmadd_pd`, `_mm256_mul_pd` and `_mm256_add_pd`.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::simd::traits::{run_lanes, LaneVector};

/// Number of f64 elements in an AVX2 256-bit register.
pub(crate) const LANE_COUNT: usize = 4;

/// AVX2 register holding 4 packed f64 lanes.
#[derive(Copy, Clone, Debug)]
pub struct F64x4 {
    pub elements: __m256d,
}

impl LaneVector for F64x4 {
    const LANES: usize = LANE_COUNT;

    #[inline(always)]
    unsafe fn load(values: &[f64]) -> Self {
        debug_assert!(values.len() >= LANE_COUNT);
        Self {
            elements: _mm256_loadu_pd(values.as_ptr()),
        }
    }

    #[inline(always)]
    unsafe fn splat(value: f64) -> Self {
        Self {
            elements: _mm256_set1_pd(value),
        }
    }

    #[inline(always)]
    unsafe fn fmadd(self, b: Self, c: Self) -> Self {
        Self {
            elements: _mm256_fmadd_pd(self.elements, b.elements, c.elements),
        }
    }

    #[inline(always)]
    unsafe fn mul(self, rhs: Self) -> Self {
        Self {
            elements: _mm256_mul_pd(self.elements, rhs.elements),
        }
    }

    #[inline(always)]
    unsafe fn add(self, rhs: Self) -> Self {
        Self {
            elements: _mm256_add_pd(self.elements, rhs.elements),
        }
    }

    #[inline(always)]
    unsafe fn store(self, out: &mut [f64]) {
        debug_assert!(out.len() >= LANE_COUNT);
        _mm256_storeu_pd(out.as_mut_ptr(), self.elements);
    }
}

/// Runs the recurrence on 4 lanes with AVX2 + FMA.
///
/// # Safety
///
/// The CPU must support `avx2` and `fma`; see [`super::available`].
#[target_feature(enable = "avx2,fma")]
pub unsafe fn run_f64x4(a: &[f64], b: &[f64], steps: u64, out: &mut [f64]) -> u64 {
    assert!(a.len() >= LANE_COUNT && b.len() >= LANE_COUNT && out.len() >= LANE_COUNT);
    run_lanes::<F64x4>(a, b, steps, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::LaneSeed;

    #[test]
    fn test_f64x4_lanes_track_fused_scalar() {
        if !super::super::available() {
            return;
        }

        let seeds: Vec<_> = LaneSeed::CPU.lanes(0, LANE_COUNT).collect();
        let a: Vec<f64> = seeds.iter().map(|s| s.a).collect();
        let b: Vec<f64> = seeds.iter().map(|s| s.b).collect();
        let mut out = [0.0; LANE_COUNT];

        let executed = unsafe { run_f64x4(&a, &b, 5, &mut out) };
        assert_eq!(executed, 5);

        for (lane, seed) in out.iter().zip(seeds) {
            let mut expected = seed;
            expected.run_fused(5);
            assert!(lane.is_finite());
            assert_eq!(lane.to_bits(), expected.result.to_bits());
        }
    }
}
