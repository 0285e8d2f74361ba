//! Converts raw timings into FLOPS figures and speedups.
//!
//! Rates are derived, never measured: the FLOP count comes from the charged
//! operation count, and only the elapsed time is observed. A non-positive
//! elapsed time is reported as [`BenchError::DivisionDegenerate`] instead of
//! turning into an infinite rate.

use crate::error::{division_degenerate, BenchError, Result};
use crate::result::BenchmarkResult;
use crate::workload::FLOPS_PER_STEP;

/// Floating-point operations charged per logical operation.
pub const FLOPS_PER_OPERATION: f64 = FLOPS_PER_STEP as f64;

#[inline]
pub fn total_flops(total_operations: u64) -> f64 {
    total_operations as f64 * FLOPS_PER_OPERATION
}

fn positive_elapsed(result: &BenchmarkResult, quantity: &'static str) -> Result<f64> {
    if result.elapsed_seconds > 0.0 {
        Ok(result.elapsed_seconds)
    } else {
        Err(division_degenerate(
            result.strategy.as_str(),
            quantity,
            result.elapsed_seconds,
        ))
    }
}

/// Millions of floating-point operations per second.
pub fn mflops(result: &BenchmarkResult) -> Result<f64> {
    let elapsed = positive_elapsed(result, "MFLOPS")?;
    Ok(result.total_flops / elapsed / 1e6)
}

/// Billions of floating-point operations per second.
pub fn gflops(result: &BenchmarkResult) -> Result<f64> {
    Ok(mflops(result)? / 1e3)
}

/// How many times faster `candidate` ran than `baseline`.
///
/// For equal charged work this is the elapsed-time ratio. Runs charging a
/// different operation count (the GPU kernel) are compared by rate instead,
/// since their elapsed times measure different amounts of work.
pub fn speedup(baseline: &BenchmarkResult, candidate: &BenchmarkResult) -> Result<f64> {
    let candidate_elapsed = positive_elapsed(candidate, "speedup")?;
    let baseline_elapsed = positive_elapsed(baseline, "speedup")?;
    if baseline.total_operations == candidate.total_operations {
        Ok(baseline_elapsed / candidate_elapsed)
    } else {
        let baseline_rate = baseline.total_flops / baseline_elapsed;
        let candidate_rate = candidate.total_flops / candidate_elapsed;
        if baseline_rate > 0.0 {
            Ok(candidate_rate / baseline_rate)
        } else {
            Err(division_degenerate(
                baseline.strategy.as_str(),
                "speedup",
                baseline_elapsed,
            ))
        }
    }
}

/// Derived figures for one strategy, ready for the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputReport {
    pub strategy_name: String,
    /// NaN when the rate is undefined.
    pub mflops: f64,
    pub gflops: f64,
    /// `None` for the baseline itself.
    pub speedup_vs_baseline: Option<f64>,
    pub elapsed_seconds: f64,
    pub final_result: f64,
}

impl ThroughputReport {
    /// Computes the figures for `result`, measured against `baseline`.
    ///
    /// Pass `None` as `baseline` for the baseline row itself.
    pub fn from_result(
        result: &BenchmarkResult,
        baseline: Option<&BenchmarkResult>,
    ) -> Result<Self> {
        let mflops = mflops(result)?;
        let speedup_vs_baseline = baseline
            .map(|baseline| speedup(baseline, result))
            .transpose()?;

        Ok(Self {
            strategy_name: result.strategy.clone(),
            mflops,
            gflops: mflops / 1e3,
            speedup_vs_baseline,
            elapsed_seconds: result.elapsed_seconds,
            final_result: result.final_result,
        })
    }

    /// A row whose rates could not be computed.
    pub fn undefined(result: &BenchmarkResult, is_baseline: bool) -> Self {
        Self {
            strategy_name: result.strategy.clone(),
            mflops: f64::NAN,
            gflops: f64::NAN,
            speedup_vs_baseline: if is_baseline { None } else { Some(f64::NAN) },
            elapsed_seconds: result.elapsed_seconds,
            final_result: result.final_result,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.speedup_vs_baseline.is_none()
    }

    pub fn is_defined(&self) -> bool {
        self.mflops.is_finite()
    }
}

/// Builds one report per result. The first result is the baseline.
///
/// A degenerate measurement yields an undefined row and a warning; the
/// remaining rows are still computed.
pub fn reports(results: &[BenchmarkResult]) -> Vec<ThroughputReport> {
    let Some(baseline) = results.first() else {
        return Vec::new();
    };

    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let against = (index > 0).then_some(baseline);
            match ThroughputReport::from_result(result, against) {
                Ok(report) => report,
                Err(err) => {
                    tracing::warn!(strategy = %result.strategy, error = %err, "rate undefined");
                    let mut report = ThroughputReport::undefined(result, index == 0);
                    // the rate may be fine while only the speedup degenerates
                    if let (Ok(rate), BenchError::DivisionDegenerate { quantity, .. }) =
                        (mflops(result), &err)
                    {
                        if *quantity == "speedup" {
                            report.mflops = rate;
                            report.gflops = rate / 1e3;
                        }
                    }
                    report
                }
            }
        })
        .collect()
}
