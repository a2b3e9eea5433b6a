//! WGPU offload executor - 100% Safe Rust
//!
//! Compiles the WGSL autocorrelation program and runs it on the
//! highest-performance adapter wgpu can find (Vulkan, Metal, DX12, GL).
//! Buffers, pipelines and the staging area are wgpu handles dropped at the
//! end of `run`, so a failure at any step releases what was already
//! created.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Instant;

use ::wgpu::util::DeviceExt;
use ::wgpu::{
    Backends, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BufferBindingType, BufferDescriptor, BufferUsages,
    CommandEncoderDescriptor, ComputePassDescriptor, ComputePipelineDescriptor, Device,
    DeviceDescriptor, ErrorFilter, Instance, InstanceDescriptor, Maintain, MapMode,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PowerPreference, Queue,
    RequestAdapterOptions, ShaderModuleDescriptor, ShaderSource, ShaderStages,
};
use tokio::runtime::{Builder, Runtime};

use super::{check_input, KernelProgram, OffloadExecutor, OffloadRun};
use crate::error::{DeviceStage, Error, Result};
use crate::logging::TimingGuard;

/// Runs autocorrelation programs on a wgpu adapter.
pub struct WgpuExecutor {
    device: Device,
    queue: Queue,
    adapter_name: String,
    runtime: Runtime,
}

impl WgpuExecutor {
    /// Selects an adapter and opens a device on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapability`] if no adapter exists and
    /// [`Error::Device`] if the device cannot be opened.
    pub fn new() -> Result<Self> {
        let _guard = TimingGuard::new("wgpu device setup");
        let runtime = Builder::new_current_thread().build()?;

        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let adapter = runtime
            .block_on(instance.request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            }))
            .ok_or_else(|| Error::MissingCapability("no wgpu adapter available".to_string()))?;

        let info = adapter.get_info();
        log::info!("wgpu adapter selected: {} ({:?})", info.name, info.backend);

        let (device, queue) = runtime
            .block_on(adapter.request_device(
                &DeviceDescriptor { label: Some("kernel_bench_device"), ..Default::default() },
                None,
            ))
            .map_err(|e| Error::device(DeviceStage::Device, e.to_string()))?;

        Ok(Self { device, queue, adapter_name: info.name, runtime })
    }

    fn storage_entry(binding: u32, read_only: bool) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }
}

impl OffloadExecutor for WgpuExecutor {
    fn device_name(&self) -> String {
        format!("gpu ({})", self.adapter_name)
    }

    fn run(&self, program: &KernelProgram, input: &[f32], output_len: usize) -> Result<OffloadRun> {
        check_input(input, output_len).map_err(|e| Error::device(DeviceStage::Buffer, e.to_string()))?;

        let limits = self.device.limits();
        let input_bytes = std::mem::size_of_val(input) as u64;
        let output_bytes = (output_len * std::mem::size_of::<f32>()) as u64;
        if input_bytes > u64::from(limits.max_storage_buffer_binding_size) {
            return Err(Error::device(
                DeviceStage::Buffer,
                format!(
                    "signal needs {input_bytes} bytes, binding limit is {}",
                    limits.max_storage_buffer_binding_size
                ),
            ));
        }
        let work_groups = u32::try_from(program.work_groups(output_len))
            .ok()
            .filter(|&groups| groups <= limits.max_compute_workgroups_per_dimension)
            .ok_or_else(|| {
                Error::device(
                    DeviceStage::Dispatch,
                    format!(
                        "{} work groups exceed the per-dimension limit {}",
                        program.work_groups(output_len),
                        limits.max_compute_workgroups_per_dimension
                    ),
                )
            })?;
        let size = u32::try_from(output_len)
            .map_err(|_| Error::device(DeviceStage::Buffer, "signal length exceeds u32"))?;

        // Program build; validation errors surface through the error scope.
        self.device.push_error_scope(ErrorFilter::Validation);
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("autocorrelate_shader"),
            source: ShaderSource::Wgsl(program.source().into()),
        });
        let bind_group_layout = self.device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("autocorrelate_bind_group_layout"),
            entries: &[
                // binding 0: doubled signal (read-only)
                Self::storage_entry(0, true),
                // binding 1: sums (read-write)
                Self::storage_entry(1, false),
                // binding 2: uniforms (size)
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = self.device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("autocorrelate_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let constants = HashMap::from([("local_size".to_string(), f64::from(program.local_size()))]);
        let pipeline = self.device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("autocorrelate_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(program.entry_point()),
            compilation_options: PipelineCompilationOptions {
                constants: &constants,
                zero_initialize_workgroup_memory: true,
            },
            cache: None,
        });
        if let Some(err) = self.runtime.block_on(self.device.pop_error_scope()) {
            return Err(Error::device(DeviceStage::ProgramBuild, err.to_string()));
        }

        // Buffers
        self.device.push_error_scope(ErrorFilter::OutOfMemory);
        let signal_buffer = self.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("autocorrelate_signal"),
            contents: bytemuck::cast_slice(input),
            usage: BufferUsages::STORAGE,
        });
        let sums_buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("autocorrelate_sums"),
            size: output_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params: [u32; 4] = [size, 0, 0, 0];
        let params_buffer = self.device.create_buffer_init(&::wgpu::util::BufferInitDescriptor {
            label: Some("autocorrelate_params"),
            contents: bytemuck::cast_slice(&params),
            usage: BufferUsages::UNIFORM,
        });
        let staging = self.device.create_buffer(&BufferDescriptor {
            label: Some("autocorrelate_staging"),
            size: output_bytes,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(err) = self.runtime.block_on(self.device.pop_error_scope()) {
            return Err(Error::device(DeviceStage::Buffer, err.to_string()));
        }

        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("autocorrelate_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                BindGroupEntry { binding: 0, resource: signal_buffer.as_entire_binding() },
                BindGroupEntry { binding: 1, resource: sums_buffer.as_entire_binding() },
                BindGroupEntry { binding: 2, resource: params_buffer.as_entire_binding() },
            ],
        });

        // Upload is complete once the queue drains.
        let _ = self.device.poll(Maintain::Wait);

        // Dispatch
        let start = Instant::now();
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("autocorrelate_dispatch_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("autocorrelate_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(work_groups, 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        let _ = self.device.poll(Maintain::Wait);
        let kernel_elapsed = start.elapsed();

        // Read-back by element count
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("autocorrelate_readback_encoder"),
        });
        encoder.copy_buffer_to_buffer(&sums_buffer, 0, &staging, 0, output_bytes);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| Error::device(DeviceStage::ReadBack, e.to_string()))?
            .map_err(|e| Error::device(DeviceStage::ReadBack, e.to_string()))?;

        let output: Vec<f32> = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice(&data).to_vec()
        };
        staging.unmap();

        log::debug!(
            "gpu kernel on {}: {work_groups} work groups of {} in {:?}",
            self.adapter_name,
            program.local_size(),
            kernel_elapsed
        );
        Ok(OffloadRun { output, kernel_elapsed })
    }
}
