use crate::workload::RecurrenceFloat;

/// A register of `LANES` packed f64 values advanced in lockstep.
///
/// Implementations wrap one native vector register. All methods are
/// `unsafe` because they issue ISA-specific instructions: callers must have
/// verified the backend's CPU features before use.
pub trait LaneVector: Copy {
    /// Number of f64 lanes in the register.
    const LANES: usize;

    /// Loads the first `LANES` values of `values`.
    ///
    /// # Safety
    ///
    /// The target features of the backend must be available and
    /// `values.len() >= LANES`.
    unsafe fn load(values: &[f64]) -> Self;

    /// Broadcasts `value` to every lane.
    ///
    /// # Safety
    ///
    /// The target features of the backend must be available.
    unsafe fn splat(value: f64) -> Self;

    /// `self * b + c`, fused where the backend has FMA.
    ///
    /// # Safety
    ///
    /// The target features of the backend must be available.
    unsafe fn fmadd(self, b: Self, c: Self) -> Self;

    /// # Safety
    ///
    /// The target features of the backend must be available.
    unsafe fn mul(self, rhs: Self) -> Self;

    /// # Safety
    ///
    /// The target features of the backend must be available.
    unsafe fn add(self, rhs: Self) -> Self;

    /// Writes every lane into `out`.
    ///
    /// # Safety
    ///
    /// The target features of the backend must be available and
    /// `out.len() >= LANES`.
    unsafe fn store(self, out: &mut [f64]);
}

/// Runs `steps` recurrence steps on `V::LANES` lanes at once.
///
/// `a` and `b` hold the per-lane seeds; the per-lane accumulators are
/// written to `out`. Returns the number of vector steps executed.
///
/// # Safety
///
/// Same contract as the [`LaneVector`] methods. Callers inline this into a
/// `#[target_feature]` function so the whole loop is compiled for the ISA.
#[inline(always)]
pub unsafe fn run_lanes<V: LaneVector>(a: &[f64], b: &[f64], steps: u64, out: &mut [f64]) -> u64 {
    debug_assert!(a.len() >= V::LANES && b.len() >= V::LANES && out.len() >= V::LANES);

    let mut a_vec = V::load(std::hint::black_box(a));
    let mut b_vec = V::load(std::hint::black_box(b));
    let mut result_vec = V::splat(0.0);
    let decay = V::splat(<f64 as RecurrenceFloat>::DECAY);
    let bump = V::splat(<f64 as RecurrenceFloat>::BUMP);

    let mut executed = 0u64;
    for _ in 0..steps {
        result_vec = a_vec.fmadd(b_vec, result_vec);
        a_vec = result_vec.mul(decay);
        b_vec = a_vec.add(bump);
        executed += 1;
    }

    result_vec.store(out);
    executed
}
