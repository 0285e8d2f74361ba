//! GPU collaborator: the same recurrence as a wgpu compute kernel.
//!
//! Device management failures stay inside this module as [`GpuError`]; the
//! driver logs them and carries on with the CPU results.

pub mod shaders;

use std::fmt;

use thiserror::Error;

use crate::result::{BenchmarkResult, ExecutedWork};
use crate::strategy::GPU_STRATEGY_NAME;
use crate::timer::Timer;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),

    #[error("failed to map result buffer: {0}")]
    BufferMap(String),

    #[error("invalid dispatch: {0}")]
    InvalidDispatch(String),
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    work_items: u32,
    ops_per_item: u32,
    _pad0: u32,
    _pad1: u32,
}

/// Facts about the selected adapter, for the report header and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
    pub backend: String,
    pub device_type: String,
    /// Invocations one workgroup may hold.
    pub max_workgroup_size: u32,
    /// Workgroups one dispatch dimension may launch.
    pub max_workgroups: u32,
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, max workgroup size {})",
            self.name, self.backend, self.device_type, self.max_workgroup_size
        )
    }
}

/// Adapter, device and queue for one benchmark run.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: GpuInfo,
}

impl GpuDevice {
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("flopbench device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

        let limits = device.limits();
        let info = GpuInfo {
            name: adapter_info.name,
            backend: format!("{:?}", adapter_info.backend),
            device_type: format!("{:?}", adapter_info.device_type),
            max_workgroup_size: limits.max_compute_invocations_per_workgroup,
            max_workgroups: limits.max_compute_workgroups_per_dimension,
        };
        tracing::info!(
            adapter = %info.name,
            backend = %info.backend,
            device_type = %info.device_type,
            max_workgroup_size = info.max_workgroup_size,
            max_workgroups = info.max_workgroups,
            "GPU adapter selected"
        );

        Ok(Self {
            device,
            queue,
            info,
        })
    }

    /// Runs `work_items` lanes of `ops_per_work_item` steps each.
    ///
    /// `timer` brackets submission through completion; pipeline creation
    /// and readback are outside it.
    pub fn run_flops_kernel(
        &self,
        timer: &Timer,
        work_items: u32,
        ops_per_work_item: u32,
    ) -> Result<BenchmarkResult, GpuError> {
        let (elapsed, values) =
            pollster::block_on(self.dispatch(timer, work_items, ops_per_work_item))?;
        let final_result = values.iter().map(|v| *v as f64).sum::<f64>();

        Ok(BenchmarkResult::new(
            GPU_STRATEGY_NAME,
            work_items as u64 * ops_per_work_item as u64,
            elapsed,
            final_result,
            ExecutedWork {
                lane_width: 1,
                worker_steps: vec![ops_per_work_item as u64; work_items as usize],
                tail_steps: 0,
            },
        ))
    }

    /// Runs the kernel and returns the elapsed seconds and every lane's
    /// accumulator.
    async fn dispatch(
        &self,
        timer: &Timer,
        work_items: u32,
        ops_per_work_item: u32,
    ) -> Result<(f64, Vec<f32>), GpuError> {
        let workgroups = dispatch_size(work_items, self.info.max_workgroups)?;
        let results_size = (work_items as usize * std::mem::size_of::<f32>()) as u64;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("FLOPS shader"),
                source: wgpu::ShaderSource::Wgsl(shaders::flops_shader().into()),
            });

        let results_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Results"),
            size: results_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params = Params {
            work_items,
            ops_per_item: ops_per_work_item,
            _pad0: 0,
            _pad1: 0,
        };
        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("FLOPS bind group layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: false },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("FLOPS bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: results_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("FLOPS pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("FLOPS pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "main",
                compilation_options: Default::default(),
                cache: None,
            });

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging"),
            size: results_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FLOPS encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("FLOPS pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&results_buffer, 0, &staging_buffer, 0, results_size);

        tracing::debug!(
            adapter = %self.info.name,
            work_items,
            ops_per_work_item,
            workgroups,
            "dispatching GPU kernel"
        );

        let watch = timer.start();
        self.queue.submit(Some(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
        let elapsed = watch.elapsed_seconds();

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .receive()
            .await
            .ok_or_else(|| GpuError::BufferMap("mapping callback dropped".to_string()))?
            .map_err(|e| GpuError::BufferMap(format!("{e:?}")))?;

        let values = {
            let data = buffer_slice.get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&data).to_vec()
        };
        staging_buffer.unmap();

        Ok((elapsed, values))
    }
}

/// Workgroups needed to cover `work_items` invocations.
fn dispatch_size(work_items: u32, max_workgroups: u32) -> Result<u32, GpuError> {
    if work_items == 0 {
        return Err(GpuError::InvalidDispatch("work_items must be at least 1".to_string()));
    }
    let workgroups = work_items.div_ceil(shaders::WORKGROUP_SIZE);
    if workgroups > max_workgroups {
        return Err(GpuError::InvalidDispatch(format!(
            "{work_items} work items need {workgroups} workgroups, limit is {max_workgroups}"
        )));
    }
    Ok(workgroups)
}

/// Acquires a device and runs the kernel once.
pub fn run_gpu_flops_kernel(
    timer: &Timer,
    work_items: u32,
    ops_per_work_item: u32,
) -> Result<BenchmarkResult, GpuError> {
    let device = GpuDevice::new()?;
    device.run_flops_kernel(timer, work_items, ops_per_work_item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::LaneSeed;

    const DEFAULT_MAX_WORKGROUPS: u32 = 65_535;

    #[test]
    fn test_dispatch_size() {
        assert_eq!(dispatch_size(1, DEFAULT_MAX_WORKGROUPS).unwrap(), 1);
        assert_eq!(dispatch_size(256, DEFAULT_MAX_WORKGROUPS).unwrap(), 1);
        assert_eq!(dispatch_size(257, DEFAULT_MAX_WORKGROUPS).unwrap(), 2);
        assert_eq!(dispatch_size(16_384, DEFAULT_MAX_WORKGROUPS).unwrap(), 64);
    }

    #[test]
    fn test_invalid_dispatch() {
        assert!(matches!(
            dispatch_size(0, DEFAULT_MAX_WORKGROUPS),
            Err(GpuError::InvalidDispatch(_))
        ));
        assert!(matches!(
            dispatch_size(u32::MAX, DEFAULT_MAX_WORKGROUPS),
            Err(GpuError::InvalidDispatch(_))
        ));
        assert!(matches!(dispatch_size(1_024, 2), Err(GpuError::InvalidDispatch(_))));
    }

    #[test]
    fn test_params_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<Params>(), 16);
    }

    #[test]
    fn test_gpu_kernel_when_available() {
        let device = match GpuDevice::new() {
            Ok(device) => device,
            Err(err) => {
                eprintln!("skipping GPU test: {err}");
                return;
            }
        };
        let timer = Timer::calibrate().unwrap();

        let result = device.run_flops_kernel(&timer, 512, 3).unwrap();
        assert_eq!(result.total_operations, 1_536);
        assert_eq!(result.total_flops, 6_144.0);
        assert!(result.final_result > 0.0);
        assert_eq!(result.executed.lane_steps(), 1_536);

        // every invocation tracks the f32 lane of the same index
        let (_, values) = pollster::block_on(device.dispatch(&timer, 512, 3)).unwrap();
        for (gid, value) in values.iter().enumerate() {
            let mut lane = LaneSeed::GPU.lane(gid);
            lane.run_fused(3);
            let relative = ((value - lane.result) / lane.result).abs();
            assert!(relative < 1e-5, "lane {gid}: {value} vs {}", lane.result);
        }
    }

    #[test]
    fn test_entry_point_reports_gpu_row() {
        let timer = Timer::calibrate().unwrap();
        match run_gpu_flops_kernel(&timer, 300, 2) {
            Ok(result) => {
                assert_eq!(result.strategy, GPU_STRATEGY_NAME);
                assert_eq!(result.total_operations, 600);
                assert!(result.elapsed_seconds >= 0.0);
            }
            Err(GpuError::NoAdapter) | Err(GpuError::DeviceRequest(_)) => {
                eprintln!("skipping GPU test: no device");
            }
            Err(err) => panic!("unexpected GPU failure: {err}"),
        }
    }
}
