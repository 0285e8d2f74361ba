//! Combining per-worker partial results.
//!
//! Workers never touch shared memory inside their loops. After its loop a
//! worker contributes one value, either through a single atomic add into a
//! [`SharedTotal`] or by returning it for an ordered reduction once every
//! worker has been joined.

use std::sync::atomic::{AtomicU64, Ordering};

/// How worker partials are combined into the strategy's final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accumulation {
    /// One atomic add per worker, in completion order.
    #[default]
    Atomic,
    /// One slot per worker, summed by the coordinator in worker order.
    Ordered,
}

impl Accumulation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "atomic" => Some(Self::Atomic),
            "ordered" | "slots" => Some(Self::Ordered),
            _ => None,
        }
    }
}

/// An f64 running total that tolerates concurrent adds.
///
/// The value lives in an `AtomicU64` as its bit pattern; [`SharedTotal::add`]
/// is a compare-and-swap loop, so no update is lost and no reader sees a
/// torn value.
#[derive(Debug, Default)]
pub struct SharedTotal {
    bits: AtomicU64,
}

impl SharedTotal {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    pub fn add(&self, value: f64) {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Sums `partials` front to back.
pub fn ordered_sum(partials: impl IntoIterator<Item = f64>) -> f64 {
    partials.into_iter().fold(0.0, |total, partial| total + partial)
}
