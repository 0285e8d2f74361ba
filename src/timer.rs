//! Monotonic wall-clock time source.
//!
//! Wall time (not CPU time) so that parallel speedup is visible. Every
//! strategy brackets its whole run, including worker start and join, with a
//! single [`Timer::start`] / [`Stopwatch::elapsed_seconds`] pair.

use std::time::{Duration, Instant};

use crate::error::{clock_unavailable, Result};

/// Iterations the startup check spins waiting for the clock to tick.
const CALIBRATION_SPINS: u32 = 10_000_000;

/// Resolution the benchmark expects from the clock.
pub const REQUIRED_RESOLUTION: Duration = Duration::from_micros(1);

/// Startup-verified clock.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    epoch: Instant,
    resolution: Duration,
}

impl Timer {
    /// Checks the monotonic clock once and fails fast if it does not advance.
    pub fn calibrate() -> Result<Self> {
        let epoch = Instant::now();
        let resolution = observed_tick(epoch)?;

        if resolution > REQUIRED_RESOLUTION {
            tracing::warn!(
                resolution_ns = resolution.as_nanos() as u64,
                "clock resolution is coarser than 1 us; short runs may report undefined rates"
            );
        } else {
            tracing::debug!(resolution_ns = resolution.as_nanos() as u64, "clock calibrated");
        }

        Ok(Self { epoch, resolution })
    }

    /// Seconds since the timer was calibrated.
    #[inline]
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Smallest tick observed during calibration.
    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    /// Starts a measurement.
    #[inline]
    pub fn start(&self) -> Stopwatch {
        Stopwatch {
            started: Instant::now(),
        }
    }
}

/// A running measurement.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    #[inline]
    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

fn observed_tick(from: Instant) -> Result<Duration> {
    let mut previous = from;
    for _ in 0..CALIBRATION_SPINS {
        let now = Instant::now();
        if now > previous {
            return Ok(now - previous);
        }
        previous = now;
    }
    Err(clock_unavailable(format!(
        "Instant::now did not advance after {CALIBRATION_SPINS} reads"
    )))
}
