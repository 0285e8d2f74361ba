//! ARM NEON kernels for aarch64.
//!
//! Compiled when `build.rs` detects advanced SIMD on the build host.

pub mod f64x2;

/// Runtime check for the instructions the NEON kernels use.
#[inline]
pub fn available() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}
