//! # flopbench
//!
//! Floating-point throughput micro-benchmark. The same serially dependent
//! multiply-add recurrence runs under four execution strategies (scalar,
//! vectorized, threaded scalar, threaded vectorized) and, with the `gpu`
//! feature, as a wgpu compute kernel. Each run reports elapsed wall time,
//! MFLOPS/GFLOPS and speedup relative to the scalar baseline.
//!
//! ```no_run
//! use flopbench::{Harness, SimdBackend, Timer};
//!
//! let harness = Harness::new(Timer::calibrate()?, SimdBackend::detect());
//! let results = harness.run_all(10_000_000, 4, harness.backend().natural_width())?;
//! let rows = flopbench::throughput::reports(&results);
//! # Ok::<(), flopbench::BenchError>(())
//! ```

pub mod accumulate;
pub mod config;
pub mod error;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod host;
pub mod logging;
pub mod report;
pub mod result;
pub mod simd;
pub mod strategy;
pub mod throughput;
pub mod timer;
pub mod workload;

pub use accumulate::Accumulation;
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use host::HostInfo;
pub use result::{BenchmarkResult, ExecutedWork};
pub use simd::SimdBackend;
pub use strategy::{Harness, Strategy};
pub use throughput::ThroughputReport;
pub use timer::Timer;
pub use workload::{LaneSeed, RemainderPolicy, WorkloadSpec};
