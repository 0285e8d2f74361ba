//! Run configuration: compiled-in defaults with environment overrides.
//!
//! There are no command-line flags. Every knob is a constant that can be
//! overridden through a `FLOPBENCH_*` variable:
//!
//! | variable | default |
//! |---|---|
//! | `FLOPBENCH_OPERATIONS` | 400000000 |
//! | `FLOPBENCH_THREADS` | host parallelism |
//! | `FLOPBENCH_LANE_WIDTH` | natural width of the SIMD backend |
//! | `FLOPBENCH_REMAINDER` | `truncate` |
//! | `FLOPBENCH_ACCUMULATION` | `atomic` |
//! | `FLOPBENCH_GPU` | off |
//! | `FLOPBENCH_GPU_WORK_ITEMS` | 16384 |
//! | `FLOPBENCH_GPU_OPS_PER_ITEM` | 1000000 |

use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::accumulate::Accumulation;
use crate::error::{config_error, Result};
use crate::simd::SimdBackend;
use crate::workload::{RemainderPolicy, MAX_LANE_WIDTH};

pub const DEFAULT_OPERATIONS: u64 = 400_000_000;
pub const DEFAULT_GPU_WORK_ITEMS: u32 = 1024 * 16;
pub const DEFAULT_GPU_OPS_PER_ITEM: u32 = 1_000_000;
/// Upper bound on `FLOPBENCH_THREADS`.
pub const MAX_THREADS: usize = u16::MAX as usize;

const OPERATIONS_ENV: &str = "FLOPBENCH_OPERATIONS";
const THREADS_ENV: &str = "FLOPBENCH_THREADS";
const LANE_WIDTH_ENV: &str = "FLOPBENCH_LANE_WIDTH";
const REMAINDER_ENV: &str = "FLOPBENCH_REMAINDER";
const ACCUMULATION_ENV: &str = "FLOPBENCH_ACCUMULATION";
const GPU_ENV: &str = "FLOPBENCH_GPU";
const GPU_WORK_ITEMS_ENV: &str = "FLOPBENCH_GPU_WORK_ITEMS";
const GPU_OPS_ENV: &str = "FLOPBENCH_GPU_OPS_PER_ITEM";

/// Shape of the optional GPU run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuConfig {
    pub enabled: bool,
    pub work_items: u32,
    pub ops_per_work_item: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            work_items: DEFAULT_GPU_WORK_ITEMS,
            ops_per_work_item: DEFAULT_GPU_OPS_PER_ITEM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    pub total_operations: u64,
    /// `None` means host parallelism.
    pub threads: Option<usize>,
    /// `None` means the backend's natural width.
    pub lane_width: Option<usize>,
    pub remainder: RemainderPolicy,
    pub accumulation: Accumulation,
    pub gpu: GpuConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            total_operations: DEFAULT_OPERATIONS,
            threads: None,
            lane_width: None,
            remainder: RemainderPolicy::default(),
            accumulation: Accumulation::default(),
            gpu: GpuConfig::default(),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operations(mut self, total_operations: u64) -> Self {
        self.total_operations = total_operations;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_lane_width(mut self, lane_width: usize) -> Self {
        self.lane_width = Some(lane_width);
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    pub fn with_gpu(mut self, gpu: GpuConfig) -> Self {
        self.gpu = gpu;
        self
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(OPERATIONS_ENV) {
            config.total_operations = parse_number(OPERATIONS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(THREADS_ENV) {
            config.threads = Some(parse_number(THREADS_ENV, &raw)?);
        }
        if let Some(raw) = lookup(LANE_WIDTH_ENV) {
            config.lane_width = Some(parse_number(LANE_WIDTH_ENV, &raw)?);
        }
        if let Some(raw) = lookup(REMAINDER_ENV) {
            config.remainder = RemainderPolicy::parse(&raw).ok_or_else(|| {
                config_error(REMAINDER_ENV, raw.as_str(), "expected truncate or tail")
            })?;
        }
        if let Some(raw) = lookup(ACCUMULATION_ENV) {
            config.accumulation = Accumulation::parse(&raw).ok_or_else(|| {
                config_error(ACCUMULATION_ENV, raw.as_str(), "expected atomic or ordered")
            })?;
        }
        if let Some(raw) = lookup(GPU_ENV) {
            config.gpu.enabled = parse_flag(GPU_ENV, &raw)?;
        }
        if let Some(raw) = lookup(GPU_WORK_ITEMS_ENV) {
            config.gpu.work_items = parse_number(GPU_WORK_ITEMS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(GPU_OPS_ENV) {
            config.gpu.ops_per_work_item = parse_number(GPU_OPS_ENV, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_operations == 0 {
            return Err(config_error(OPERATIONS_ENV, "0", "must be at least 1"));
        }
        match self.threads {
            Some(0) => return Err(config_error(THREADS_ENV, "0", "must be at least 1")),
            Some(threads) if threads > MAX_THREADS => {
                return Err(config_error(
                    THREADS_ENV,
                    threads.to_string(),
                    format!("must be at most {MAX_THREADS}"),
                ));
            }
            _ => {}
        }
        match self.lane_width {
            Some(width) if width == 0 || width > MAX_LANE_WIDTH => {
                return Err(config_error(
                    LANE_WIDTH_ENV,
                    width.to_string(),
                    format!("must be in 1..={MAX_LANE_WIDTH}"),
                ));
            }
            _ => {}
        }
        if self.gpu.work_items == 0 {
            return Err(config_error(GPU_WORK_ITEMS_ENV, "0", "must be at least 1"));
        }
        Ok(())
    }

    /// Configured worker count, or the host's parallelism.
    pub fn thread_count(&self, host: NonZeroUsize) -> usize {
        self.threads.unwrap_or(host.get())
    }

    /// Configured lane width, or the backend's natural width.
    pub fn lane_width(&self, backend: SimdBackend) -> usize {
        self.lane_width.unwrap_or_else(|| backend.natural_width())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    // allow 400_000_000 the way it is written in code
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    cleaned
        .parse()
        .map_err(|err: T::Err| config_error(key, raw, err.to_string()))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(config_error(key, raw, "expected a boolean")),
    }
}
