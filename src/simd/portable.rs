//! Portable fixed-size array lanes.
//!
//! Used where no native vector unit was detected, and for width 1 on every
//! backend. Arithmetic is plain multiply then add, so `LaneArray<1>`
//! reproduces the scalar strategy bit for bit.

use super::traits::LaneVector;

/// `W` f64 lanes held in an ordinary array.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LaneArray<const W: usize>(pub [f64; W]);

impl<const W: usize> LaneVector for LaneArray<W> {
    const LANES: usize = W;

    #[inline(always)]
    unsafe fn load(values: &[f64]) -> Self {
        let mut lanes = [0.0; W];
        lanes.copy_from_slice(&values[..W]);
        Self(lanes)
    }

    #[inline(always)]
    unsafe fn splat(value: f64) -> Self {
        Self([value; W])
    }

    #[inline(always)]
    unsafe fn fmadd(self, b: Self, c: Self) -> Self {
        let mut lanes = [0.0; W];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = self.0[i] * b.0[i] + c.0[i];
        }
        Self(lanes)
    }

    #[inline(always)]
    unsafe fn mul(self, rhs: Self) -> Self {
        let mut lanes = self.0;
        for (lane, r) in lanes.iter_mut().zip(rhs.0) {
            *lane *= r;
        }
        Self(lanes)
    }

    #[inline(always)]
    unsafe fn add(self, rhs: Self) -> Self {
        let mut lanes = self.0;
        for (lane, r) in lanes.iter_mut().zip(rhs.0) {
            *lane += r;
        }
        Self(lanes)
    }

    #[inline(always)]
    unsafe fn store(self, out: &mut [f64]) {
        out[..W].copy_from_slice(&self.0);
    }
}

/// Runs the recurrence on `W` array lanes.
pub fn run_array<const W: usize>(a: &[f64], b: &[f64], steps: u64, out: &mut [f64]) -> u64 {
    // SAFETY: LaneArray uses no target-specific instructions; slice bounds
    // are checked by `load`/`store`.
    unsafe { super::traits::run_lanes::<LaneArray<W>>(a, b, steps, out) }
}
