use std::num::NonZeroUsize;
use std::process::ExitCode;

use flopbench::report::{self, ReportHeader};
use flopbench::{
    logging, throughput, BenchConfig, BenchmarkResult, Harness, HostInfo, SimdBackend, Timer,
};

fn main() -> ExitCode {
    logging::init_logging_from_env();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "benchmark aborted");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> flopbench::Result<()> {
    let timer = Timer::calibrate()?;
    let backend = SimdBackend::detect();
    let config = BenchConfig::from_env()?;

    let parallelism = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
    let thread_count = config.thread_count(parallelism);
    let lane_width = config.lane_width(backend);
    backend.check_width(lane_width)?;

    tracing::info!(
        backend = backend.name(),
        lane_width,
        thread_count,
        total_operations = config.total_operations,
        remainder = ?config.remainder,
        accumulation = ?config.accumulation,
        "starting benchmark"
    );

    let host = HostInfo::detect();
    tracing::info!(
        cpu_model = host.cpu_model.as_deref().unwrap_or("unknown"),
        available_cores = host.available_cores,
        "host"
    );

    let harness = Harness::new(timer, backend)
        .with_remainder(config.remainder)
        .with_accumulation(config.accumulation);

    let results = harness.run_all(config.total_operations, thread_count, lane_width)?;
    for result in &results {
        tracing::info!(
            strategy = %result.strategy,
            elapsed_seconds = result.elapsed_seconds,
            final_result = result.final_result,
            "strategy complete"
        );
    }

    let header = ReportHeader::now(backend.name(), lane_width, thread_count, config.total_operations)
        .with_host(host);
    let (results, header) = if config.gpu.enabled {
        run_gpu(&harness, &config, results, header)
    } else {
        (results, header)
    };

    let rows = throughput::reports(&results);
    print!("{}", report::render(&header, &rows));

    Ok(())
}

/// Appends the GPU row and names the adapter in the header. A failed GPU
/// run is logged and leaves both untouched.
#[cfg(feature = "gpu")]
fn run_gpu(
    harness: &Harness,
    config: &BenchConfig,
    mut results: Vec<BenchmarkResult>,
    mut header: ReportHeader,
) -> (Vec<BenchmarkResult>, ReportHeader) {
    use flopbench::gpu::GpuDevice;

    let outcome = GpuDevice::new().and_then(|device| {
        let result = device.run_flops_kernel(
            harness.timer(),
            config.gpu.work_items,
            config.gpu.ops_per_work_item,
        )?;
        Ok((device.info.to_string(), result))
    });

    match outcome {
        Ok((device, result)) => {
            tracing::info!(
                elapsed_seconds = result.elapsed_seconds,
                final_result = result.final_result,
                "GPU kernel complete"
            );
            results.push(result);
            header = header.with_gpu_device(device);
        }
        Err(err) => tracing::warn!(error = %err, "GPU benchmark skipped"),
    }
    (results, header)
}

#[cfg(not(feature = "gpu"))]
fn run_gpu(
    _harness: &Harness,
    _config: &BenchConfig,
    results: Vec<BenchmarkResult>,
    header: ReportHeader,
) -> (Vec<BenchmarkResult>, ReportHeader) {
    tracing::warn!("FLOPBENCH_GPU is set but this build lacks the `gpu` feature");
    (results, header)
}
