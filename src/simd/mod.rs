//! Vector backends for the recurrence.
//!
//! `build.rs` emits exactly one of `cfg(avx2)`, `cfg(neon)` or
//! `cfg(fallback)`. Native modules compile only under their flag; the
//! backend actually used is picked at runtime by [`SimdBackend::detect`].

#[cfg(all(avx2, any(target_arch = "x86", target_arch = "x86_64")))]
pub mod avx2;

#[cfg(all(neon, target_arch = "aarch64"))]
pub mod neon;

pub mod portable;
pub mod traits;

use std::fmt;

use crate::error::{capability_unsupported, Result};

/// Instruction set used for the vectorized strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdBackend {
    /// 256-bit AVX2 with fused multiply-add, 4 x f64.
    Avx2Fma,
    /// 128-bit NEON, 2 x f64.
    Neon,
    /// Array arithmetic without explicit SIMD, 1 lane.
    Portable,
}

impl SimdBackend {
    /// Best backend this binary was built for and this CPU can run.
    pub fn detect() -> Self {
        #[cfg(all(avx2, any(target_arch = "x86", target_arch = "x86_64")))]
        {
            if avx2::available() {
                return SimdBackend::Avx2Fma;
            }
        }

        #[cfg(all(neon, target_arch = "aarch64"))]
        {
            if neon::available() {
                return SimdBackend::Neon;
            }
        }

        #[cfg(fallback)]
        tracing::debug!("built without native vector kernels");

        SimdBackend::Portable
    }

    pub fn name(&self) -> &'static str {
        match self {
            SimdBackend::Avx2Fma => "avx2+fma",
            SimdBackend::Neon => "neon",
            SimdBackend::Portable => "portable",
        }
    }

    /// Width of one native register in f64 lanes.
    pub fn natural_width(&self) -> usize {
        match self {
            SimdBackend::Avx2Fma => 4,
            SimdBackend::Neon => 2,
            SimdBackend::Portable => 1,
        }
    }

    /// Lane widths this backend can run: its native width, plus 1.
    pub fn supported_widths(&self) -> &'static [usize] {
        match self {
            SimdBackend::Avx2Fma => &[1, 4],
            SimdBackend::Neon => &[1, 2],
            SimdBackend::Portable => &[1],
        }
    }

    /// Fails with `CapabilityUnsupported` unless `width` can run here.
    pub fn check_width(&self, width: usize) -> Result<()> {
        if self.supported_widths().contains(&width) {
            Ok(())
        } else {
            Err(capability_unsupported(
                width,
                self.name(),
                self.supported_widths(),
            ))
        }
    }

    /// Runs `steps` recurrence steps on `width` lanes seeded from `a`/`b`.
    ///
    /// Per-lane accumulators land in `out[..width]`. Returns the number of
    /// vector steps executed.
    pub fn run_lanes(
        &self,
        width: usize,
        a: &[f64],
        b: &[f64],
        steps: u64,
        out: &mut [f64],
    ) -> Result<u64> {
        self.check_width(width)?;

        match (self, width) {
            (_, 1) => Ok(portable::run_array::<1>(a, b, steps, out)),

            #[cfg(all(avx2, any(target_arch = "x86", target_arch = "x86_64")))]
            (SimdBackend::Avx2Fma, 4) if avx2::available() => {
                // SAFETY: avx2 and fma were just detected.
                Ok(unsafe { avx2::f64x4::run_f64x4(a, b, steps, out) })
            }

            #[cfg(all(neon, target_arch = "aarch64"))]
            (SimdBackend::Neon, 2) if neon::available() => {
                // SAFETY: neon was just detected.
                Ok(unsafe { neon::f64x2::run_f64x2(a, b, steps, out) })
            }

            // native module not compiled in, or the CPU lacks the features
            _ => Err(capability_unsupported(width, self.name(), &[1])),
        }
    }
}

impl fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} x f64)", self.name(), self.natural_width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_backend_supports_its_natural_width() {
        let backend = SimdBackend::detect();
        assert!(backend.check_width(backend.natural_width()).is_ok());
        assert!(backend.check_width(1).is_ok());
    }

    #[test]
    fn test_unsupported_width_is_capability_error() {
        let backend = SimdBackend::detect();
        let err = backend.check_width(3).unwrap_err();
        assert!(matches!(
            err,
            crate::error::BenchError::CapabilityUnsupported { requested: 3, .. }
        ));
    }

    #[test]
    fn test_portable_only_runs_one_lane() {
        assert_eq!(SimdBackend::Portable.supported_widths(), &[1]);
        assert!(SimdBackend::Portable.check_width(4).is_err());
    }

    #[test]
    fn test_run_lanes_width_one_on_every_backend() {
        let mut out = [0.0];
        let executed = SimdBackend::detect()
            .run_lanes(1, &[1.5], &[2.5], 10, &mut out)
            .unwrap();
        assert_eq!(executed, 10);
        assert!(out[0] != 0.0);
    }

    #[test]
    fn test_run_lanes_natural_width() {
        let backend = SimdBackend::detect();
        let width = backend.natural_width();
        let a = [1.1, 1.2, 1.3, 1.4];
        let b = [2.1, 2.2, 2.3, 2.4];
        let mut out = [0.0; 4];

        let executed = backend.run_lanes(width, &a, &b, 7, &mut out).unwrap();
        assert_eq!(executed, 7);
        assert!(out[..width].iter().all(|lane| *lane != 0.0));
    }
}
