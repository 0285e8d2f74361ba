//! Console report: one block per strategy, then a summary table.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::host::HostInfo;
use crate::strategy::{Strategy, GPU_STRATEGY_NAME};
use crate::throughput::ThroughputReport;

/// Run-wide facts printed above the per-strategy blocks.
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub started: DateTime<Local>,
    pub backend: String,
    pub lane_width: usize,
    pub thread_count: usize,
    pub total_operations: u64,
    pub host: HostInfo,
    /// Adapter description when the GPU kernel ran.
    pub gpu_device: Option<String>,
}

impl ReportHeader {
    pub fn now(
        backend: impl Into<String>,
        lane_width: usize,
        thread_count: usize,
        total_operations: u64,
    ) -> Self {
        Self {
            started: Local::now(),
            backend: backend.into(),
            lane_width,
            thread_count,
            total_operations,
            host: HostInfo::detect(),
            gpu_device: None,
        }
    }

    pub fn with_host(mut self, host: HostInfo) -> Self {
        self.host = host;
        self
    }

    pub fn with_gpu_device(mut self, device: impl Into<String>) -> Self {
        self.gpu_device = Some(device.into());
        self
    }
}

fn rate(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "undefined".to_string()
    }
}

fn shows_gflops(name: &str) -> bool {
    name == Strategy::ThreadedVectorized.name() || name == GPU_STRATEGY_NAME
}

/// Renders the full report. Rows are printed in the order given; the first
/// row is the baseline.
pub fn render(header: &ReportHeader, rows: &[ThroughputReport]) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_report(&mut out, header, rows);
    out
}

fn write_report(
    out: &mut String,
    header: &ReportHeader,
    rows: &[ThroughputReport],
) -> std::fmt::Result {
    writeln!(out, "=== FLOPS Benchmark ===")?;
    writeln!(out, "Started: {}", header.started.format("%Y-%m-%d %H:%M:%S %:z"))?;
    writeln!(
        out,
        "CPU: {}",
        header.host.cpu_model.as_deref().unwrap_or("unknown")
    )?;
    writeln!(out, "Available cores: {}", header.host.available_cores)?;
    if let Some(device) = &header.gpu_device {
        writeln!(out, "GPU: {device}")?;
    }
    writeln!(out, "SIMD backend: {} (lane width {})", header.backend, header.lane_width)?;
    writeln!(out, "Worker threads: {}", header.thread_count)?;
    writeln!(out, "Operations per test: {}", header.total_operations)?;
    writeln!(out)?;

    let baseline = rows.first().map(|row| row.strategy_name.to_lowercase());

    for (index, row) in rows.iter().enumerate() {
        writeln!(out, "{}. {}:", index + 1, row.strategy_name)?;
        writeln!(out, "   Time: {:.6} seconds", row.elapsed_seconds)?;
        writeln!(out, "   MFLOPS: {}", rate(row.mflops))?;
        if let (Some(speedup), Some(baseline)) = (row.speedup_vs_baseline, baseline.as_deref()) {
            let speedup = if speedup.is_finite() {
                format!("{speedup:.2}x")
            } else {
                "undefined".to_string()
            };
            writeln!(out, "   Speedup vs {baseline}: {speedup}")?;
        }
        writeln!(out, "   Result: {}", row.final_result)?;
        writeln!(out)?;
    }

    writeln!(out, "=== Performance Summary ===")?;
    for row in rows {
        let label = format!("{}:", row.strategy_name);
        write!(out, "{label:<29}{:>10} MFLOPS", rate(row.mflops))?;
        if shows_gflops(&row.strategy_name) {
            write!(out, " ({} GFLOPS)", rate(row.gflops))?;
        }
        writeln!(out)?;
    }

    if let Some(best) = peak(rows) {
        writeln!(out)?;
        writeln!(
            out,
            "Peak performance: {:.2} GFLOPS (best configuration: {})",
            best.gflops, best.strategy_name
        )?;
    }

    Ok(())
}

/// Fastest row with a defined rate.
pub fn peak(rows: &[ThroughputReport]) -> Option<&ThroughputReport> {
    rows.iter()
        .filter(|row| row.is_defined())
        .max_by(|left, right| left.mflops.total_cmp(&right.mflops))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, mflops: f64, speedup: Option<f64>) -> ThroughputReport {
        ThroughputReport {
            strategy_name: name.to_string(),
            mflops,
            gflops: mflops / 1e3,
            speedup_vs_baseline: speedup,
            elapsed_seconds: 0.25,
            final_result: f64::INFINITY,
        }
    }

    fn header() -> ReportHeader {
        ReportHeader::now("portable", 1, 4, 400_000_000)
    }

    #[test]
    fn test_blocks_and_summary() {
        let rows = vec![
            row(Strategy::Scalar.name(), 1600.0, None),
            row(Strategy::Vectorized.name(), 3200.0, Some(2.0)),
            row(Strategy::ThreadedScalar.name(), 6400.0, Some(4.0)),
            row(Strategy::ThreadedVectorized.name(), 12800.0, Some(8.0)),
        ];
        let text = render(&header(), &rows);

        assert!(text.contains("Operations per test: 400000000"));
        assert!(text.contains("1. Single-threaded scalar:"));
        assert!(text.contains("   Time: 0.250000 seconds"));
        assert!(text.contains("   MFLOPS: 1600.00"));
        assert!(text.contains("Speedup vs single-threaded scalar: 8.00x"));
        assert!(text.contains("   Result: inf"));
        assert!(text.contains("12800.00 MFLOPS (12.80 GFLOPS)"));
        assert!(text.contains("best configuration: Multi-threaded vectorized"));

        // the baseline block carries no speedup line
        let first_block = text.split("2. ").next().unwrap();
        assert!(!first_block.contains("Speedup"));
    }

    #[test]
    fn test_undefined_rates_are_marked() {
        let rows = vec![
            row(Strategy::Scalar.name(), 1600.0, None),
            row(Strategy::Vectorized.name(), f64::NAN, Some(f64::NAN)),
        ];
        let text = render(&header(), &rows);
        assert!(text.contains("   MFLOPS: undefined"));
        assert!(text.contains("Speedup vs single-threaded scalar: undefined"));
        assert!(text.contains("best configuration: Single-threaded scalar"));
    }

    #[test]
    fn test_header_lists_host_and_gpu() {
        let host = HostInfo {
            cpu_model: Some("Test CPU 9000".to_string()),
            available_cores: 12,
        };
        let text = render(&header().with_host(host.clone()), &[]);
        assert!(text.contains("CPU: Test CPU 9000"));
        assert!(text.contains("Available cores: 12"));
        assert!(!text.contains("GPU:"));

        let with_gpu = header()
            .with_host(HostInfo { cpu_model: None, ..host })
            .with_gpu_device("Radeon (Vulkan, DiscreteGpu, max workgroup size 1024)");
        let text = render(&with_gpu, &[]);
        assert!(text.contains("CPU: unknown"));
        assert!(text.contains("GPU: Radeon (Vulkan, DiscreteGpu, max workgroup size 1024)"));
    }

    #[test]
    fn test_peak_skips_undefined_rows() {
        let rows = vec![row("a", f64::NAN, None), row("b", 10.0, Some(1.0))];
        assert_eq!(peak(&rows).unwrap().strategy_name, "b");
        assert!(peak(&[row("a", f64::NAN, None)]).is_none());
    }
}
