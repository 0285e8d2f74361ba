//! AVX2 kernels for x86 / x86_64.
//!
//! Compiled when `build.rs` detects `avx2` and `fma` on the build host.
//! [`available`] repeats the check at runtime before any kernel is called,
//! so a binary copied to an older machine falls back instead of faulting.

pub mod f64x4;

/// Runtime check for the instructions the AVX2 kernels use.
#[inline]
pub fn available() -> bool {
    is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
}
