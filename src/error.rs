//! Error types for flopbench.
//!
//! Startup failures (`ClockUnavailable`, `CapabilityUnsupported`, `Config`)
//! are fatal for the driver. `DivisionDegenerate` is a per-strategy warning:
//! the report marks the rate as undefined and keeps going.

use thiserror::Error;

/// Errors that can occur while configuring or running the benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BenchError {
    /// The monotonic clock never advanced during startup calibration.
    #[error("monotonic clock unavailable: {message}")]
    ClockUnavailable {
        /// Human-readable error message.
        message: String,
    },

    /// Elapsed time was zero or negative, so no rate can be derived.
    #[error("cannot derive {quantity} for {strategy}: elapsed time {elapsed} s is not positive")]
    DivisionDegenerate {
        /// Strategy whose measurement was degenerate.
        strategy: String,
        /// The quantity that could not be computed (e.g. "MFLOPS").
        quantity: &'static str,
        /// The offending elapsed time, formatted.
        elapsed: String,
    },

    /// The requested vector width cannot run on this hardware.
    #[error("lane width {requested} is not supported by the {backend} backend (supported: {supported:?})")]
    CapabilityUnsupported {
        /// Requested lane width.
        requested: usize,
        /// Name of the detected SIMD backend.
        backend: &'static str,
        /// Widths that backend can run.
        supported: Vec<usize>,
    },

    /// Workload shape that cannot be partitioned.
    #[error("invalid workload: {message}")]
    InvalidWorkload {
        /// Human-readable error message.
        message: String,
    },

    /// Worker threads could not be created.
    #[error("failed to start {strategy} workers: {message}")]
    WorkerPool {
        /// Strategy that asked for the workers.
        strategy: String,
        /// Error reported by the thread pool builder.
        message: String,
    },

    /// Malformed configuration value.
    #[error("invalid value {value:?} for {key}: {message}")]
    Config {
        /// Configuration key (environment variable name).
        key: String,
        /// The raw value that failed to parse.
        value: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Result type alias for flopbench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Creates a clock error.
pub fn clock_unavailable(message: impl Into<String>) -> BenchError {
    BenchError::ClockUnavailable {
        message: message.into(),
    }
}

/// Creates a degenerate-division error for a strategy's measured elapsed time.
pub fn division_degenerate(
    strategy: impl Into<String>,
    quantity: &'static str,
    elapsed: f64,
) -> BenchError {
    BenchError::DivisionDegenerate {
        strategy: strategy.into(),
        quantity,
        elapsed: format!("{elapsed:e}"),
    }
}

/// Creates a capability error.
pub fn capability_unsupported(
    requested: usize,
    backend: &'static str,
    supported: &[usize],
) -> BenchError {
    BenchError::CapabilityUnsupported {
        requested,
        backend,
        supported: supported.to_vec(),
    }
}

/// Creates a workload validation error.
pub fn invalid_workload(message: impl Into<String>) -> BenchError {
    BenchError::InvalidWorkload {
        message: message.into(),
    }
}

/// Creates a worker pool error.
pub fn worker_pool(strategy: impl Into<String>, message: impl ToString) -> BenchError {
    BenchError::WorkerPool {
        strategy: strategy.into(),
        message: message.to_string(),
    }
}

/// Creates a configuration error.
pub fn config_error(
    key: impl Into<String>,
    value: impl Into<String>,
    message: impl Into<String>,
) -> BenchError {
    BenchError::Config {
        key: key.into(),
        value: value.into(),
        message: message.into(),
    }
}
