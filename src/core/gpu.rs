//! GPU step executor using wgpu.
//!
//! The weight matrix is uploaded once at initialization and stays
//! device-resident; each dispatch uploads the current activation vector,
//! runs the update kernel across one thread per neuron, and reads the
//! next vector back through a staging buffer. The driver blocks on the
//! readback, so consecutive steps never overlap.
//!
//! Enable with the `gpu` feature flag.

use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use wgpu::util::DeviceExt;

use crate::error::Error;
use crate::executor::{StepExecutor, FIRE_THRESHOLD, LEAK_FACTOR};
use crate::topology::Network;

/// Kernel parameters (16-byte uniform).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct KernelParams {
    size: u32,
    _pad: u32,
    threshold: f32,
    leak: f32,
}

pub struct GpuExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    current_buffer: wgpu::Buffer,
    next_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
    size: usize,
}

impl GpuExecutor {
    /// Bring up the device and upload the weight matrix. Blocks until the
    /// GPU is ready; any missing piece surfaces as `ExecutorInit` with
    /// the diagnostic.
    pub fn new(net: &Network) -> Result<Self, Error> {
        let size = net.size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| Error::ExecutorInit("no compatible GPU adapter found".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("spikenet"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| Error::ExecutorInit(format!("device request failed: {e}")))?;

        log::debug!("gpu executor on adapter {:?}", adapter.get_info().name);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Spike Kernel"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SPIKE_SHADER)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Spike Bind Group Layout"),
            entries: &[
                // Weights (read-only, device-resident for the whole run)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Current activations (read-only)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Next activations (write target)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Spike Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Spike Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let weights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Weights Buffer"),
            contents: bytemuck::cast_slice(net.weights()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let vector_bytes = (size * std::mem::size_of::<f32>()) as u64;

        let current_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Current Buffer"),
            size: vector_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let next_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Next Buffer"),
            size: vector_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params = KernelParams {
            size: size as u32,
            _pad: 0,
            threshold: FIRE_THRESHOLD,
            leak: LEAK_FACTOR,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: vector_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Spike Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: weights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: current_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: next_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group,
            current_buffer,
            next_buffer,
            staging_buffer,
            size,
        })
    }
}

impl StepExecutor for GpuExecutor {
    fn dispatch(
        &mut self,
        _net: &Network,
        current: &[f32],
        next: &mut [f32],
    ) -> Result<(), Error> {
        if current.len() != self.size || next.len() != self.size {
            return Err(Error::ExecutorRuntime(format!(
                "vector length {} does not match device buffers ({})",
                current.len(),
                self.size
            )));
        }

        self.queue
            .write_buffer(&self.current_buffer, 0, bytemuck::cast_slice(current));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Spike Encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Spike Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            // One thread per neuron, 64 threads per workgroup.
            pass.dispatch_workgroups(self.size.div_ceil(64) as u32, 1, 1);
        }

        let vector_bytes = (self.size * std::mem::size_of::<f32>()) as u64;
        encoder.copy_buffer_to_buffer(&self.next_buffer, 0, &self.staging_buffer, 0, vector_bytes);

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        let map_result = rx
            .recv()
            .map_err(|_| Error::ExecutorRuntime("readback channel closed".into()))?;
        map_result.map_err(|e| Error::ExecutorRuntime(format!("buffer mapping failed: {e:?}")))?;

        {
            let data = buffer_slice.get_mapped_range();
            next.copy_from_slice(bytemuck::cast_slice(&data));
        }
        self.staging_buffer.unmap();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gpu"
    }
}

/// WGSL spike kernel: same thresholded leaky integrate-and-fire rule as
/// the CPU executors.
const SPIKE_SHADER: &str = r#"
struct Params {
    size: u32,
    _pad: u32,
    threshold: f32,
    leak: f32,
}

@group(0) @binding(0) var<storage, read> weights: array<f32>;
@group(0) @binding(1) var<storage, read> current: array<f32>;
@group(0) @binding(2) var<storage, read_write> next: array<f32>;
@group(0) @binding(3) var<uniform> params: Params;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dst = gid.x;
    if dst >= params.size {
        return;
    }

    var acc: f32 = 0.0;
    if current[dst] <= params.threshold {
        acc = current[dst] * params.leak;
    }

    for (var src: u32 = 0u; src < params.size; src = src + 1u) {
        if current[src] > params.threshold {
            acc = acc + weights[src * params.size + dst];
        }
    }

    next[dst] = acc;
}
"#;
