//! Dispatch-based execution types.
//!
//! A compiled `OpDispatch` runs against a `DispatchCtx`, which is either
//! backed by a wgpu device or by host memory. Tensors live in the storage
//! that matches the context they were created by.

use crate::compile_ctx::CompileOptions;
use crate::types::{DataType, Target};
use crate::{Error, Result};
use std::sync::Arc;

/// Backing storage of a `RuntimeTensor`.
#[derive(Debug, Clone)]
pub enum TensorStorage {
    /// GPU storage buffer.
    Gpu(Arc<wgpu::Buffer>),

    /// Little-endian element bytes in host memory.
    Host(Vec<u8>),
}

/// A tensor resident where its kernel executes.
#[derive(Debug, Clone)]
pub struct RuntimeTensor {
    /// Buffer or host bytes holding the tensor data.
    pub storage: TensorStorage,

    /// Concrete shape dimensions.
    pub shape: Vec<usize>,

    /// Element data type.
    pub dtype: DataType,

    /// Total data size in bytes.
    pub size_bytes: usize,
}

impl RuntimeTensor {
    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Host bytes, or an execution error for GPU-resident tensors.
    pub fn host_bytes(&self) -> Result<&[u8]> {
        match &self.storage {
            TensorStorage::Host(bytes) => Ok(bytes),
            TensorStorage::Gpu(_) => Err(Error::KernelExecution(
                "Expected a host tensor, found a GPU buffer".to_string(),
            )),
        }
    }

    /// Mutable host bytes, or an execution error for GPU-resident tensors.
    pub fn host_bytes_mut(&mut self) -> Result<&mut Vec<u8>> {
        match &mut self.storage {
            TensorStorage::Host(bytes) => Ok(bytes),
            TensorStorage::Gpu(_) => Err(Error::KernelExecution(
                "Expected a host tensor, found a GPU buffer".to_string(),
            )),
        }
    }

    /// GPU buffer, or an execution error for host tensors.
    pub fn gpu_buffer(&self) -> Result<&wgpu::Buffer> {
        match &self.storage {
            TensorStorage::Gpu(buffer) => Ok(buffer),
            TensorStorage::Host(_) => Err(Error::KernelExecution(
                "Expected a GPU buffer, found a host tensor".to_string(),
            )),
        }
    }
}

enum Backend {
    Gpu {
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
    },
    Host,
}

/// Runtime context for executing compiled dispatches.
///
/// Passed to `OpDispatch::dispatch()`. Owns nothing that outlives a call
/// besides the device handles; pipelines are built per dispatch.
pub struct DispatchCtx {
    backend: Backend,
}

impl DispatchCtx {
    /// Create a context that executes on a GPU device.
    pub fn gpu(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            backend: Backend::Gpu { device, queue },
        }
    }

    /// Create a context that executes on the host CPU.
    pub fn host() -> Self {
        Self {
            backend: Backend::Host,
        }
    }

    /// The execution target of this context.
    pub fn target(&self) -> Target {
        match self.backend {
            Backend::Gpu { .. } => Target::Gpu,
            Backend::Host => Target::Host,
        }
    }

    /// Compile options for dispatches that will run on this context.
    ///
    /// GPU contexts take their workgroup limits from the device; host
    /// contexts keep wgpu's defaults.
    pub fn compile_options(&self, workgroup_size: u32) -> CompileOptions {
        let mut options = CompileOptions {
            target: self.target(),
            workgroup_size,
            ..Default::default()
        };

        if let Backend::Gpu { device, .. } = &self.backend {
            let limits = device.limits();
            options.max_workgroup_size = limits
                .max_compute_invocations_per_workgroup
                .min(limits.max_compute_workgroup_size_x);
            options.max_workgroups = limits.max_compute_workgroups_per_dimension;
        }
        options
    }

    fn gpu_handles(&self) -> Result<(&wgpu::Device, &wgpu::Queue)> {
        match &self.backend {
            Backend::Gpu { device, queue } => Ok((device.as_ref(), queue.as_ref())),
            Backend::Host => Err(Error::KernelExecution(
                "GPU operation requested on a host dispatch context".to_string(),
            )),
        }
    }

    /// Allocate a tensor for a kernel to write into.
    ///
    /// GPU buffers are left uninitialized; host tensors are zero-filled.
    /// Either way the contents are meaningless until a dispatch completes.
    pub fn create_output_tensor(&self, shape: &[usize], dtype: DataType) -> Result<RuntimeTensor> {
        let num_elements: usize = shape.iter().product();
        let size_bytes = num_elements * dtype.size();

        let storage = match &self.backend {
            Backend::Gpu { device, .. } => {
                // wgpu requires buffers to be at least 4 bytes
                let buffer_size = size_bytes.max(4) as u64;
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("output_tensor"),
                    size: buffer_size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                TensorStorage::Gpu(Arc::new(buffer))
            }
            Backend::Host => TensorStorage::Host(vec![0; size_bytes]),
        };

        Ok(RuntimeTensor {
            storage,
            shape: shape.to_vec(),
            dtype,
            size_bytes,
        })
    }

    /// Copy host bytes into a new tensor owned by this context.
    pub fn upload_tensor(
        &self,
        data: &[u8],
        shape: &[usize],
        dtype: DataType,
    ) -> Result<RuntimeTensor> {
        let num_elements: usize = shape.iter().product();
        let size_bytes = num_elements * dtype.size();
        if data.len() != size_bytes {
            return Err(Error::InvalidShape(format!(
                "Data length {} doesn't match shape {shape:?} of {dtype:?} (expected {size_bytes} bytes)",
                data.len()
            )));
        }

        let storage = match &self.backend {
            Backend::Gpu { device, queue } => {
                let buffer_size = size_bytes.max(4) as u64;
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("input_tensor"),
                    size: buffer_size,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_SRC
                        | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                queue.write_buffer(&buffer, 0, data);
                TensorStorage::Gpu(Arc::new(buffer))
            }
            Backend::Host => TensorStorage::Host(data.to_vec()),
        };

        Ok(RuntimeTensor {
            storage,
            shape: shape.to_vec(),
            dtype,
            size_bytes,
        })
    }

    /// Build a compute pipeline from a pre-compiled naga module.
    ///
    /// The bind group layout is derived from the shader, so bindings only
    /// have to agree with the WGSL declarations.
    pub fn create_pipeline(
        &self,
        label: &str,
        module: &naga::Module,
        entry_point: &str,
    ) -> Result<wgpu::ComputePipeline> {
        let (device, _) = self.gpu_handles()?;

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(std::borrow::Cow::Owned(module.clone())),
        });

        Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: None,
            module: &shader_module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        }))
    }

    /// Encode and submit one compute dispatch.
    ///
    /// `bindings[i]` is bound at `@group(0) @binding(i)`.
    pub fn dispatch_compute(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bindings: &[&RuntimeTensor],
        workgroups: [u32; 3],
    ) -> Result<()> {
        let (device, queue) = self.gpu_handles()?;

        let buffers = bindings
            .iter()
            .map(|tensor| tensor.gpu_buffer())
            .collect::<Result<Vec<_>>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group_layout = pipeline.get_bind_group_layout(0);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dispatch_bind_group"),
            layout: &bind_group_layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("dispatch_encoder"),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("dispatch_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        queue.submit(std::iter::once(encoder.finish()));

        tracing::trace!(?workgroups, num_bindings = bindings.len(), "submitted dispatch");
        Ok(())
    }

    /// Block until all submitted work has completed.
    ///
    /// A no-op on the host, where dispatches run to completion inline.
    pub fn synchronize(&self) -> Result<()> {
        if let Backend::Gpu { device, .. } = &self.backend {
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: None,
                })
                .map_err(|e| Error::KernelExecution(format!("GPU poll failed: {e:?}")))?;
        }
        Ok(())
    }

    /// Copy tensor data back to host memory.
    pub fn download_tensor(&self, tensor: &RuntimeTensor) -> Result<Vec<u8>> {
        let buffer = match &tensor.storage {
            TensorStorage::Host(bytes) => return Ok(bytes.clone()),
            TensorStorage::Gpu(buffer) => buffer,
        };
        let (device, queue) = self.gpu_handles()?;
        let buffer_size = tensor.size_bytes as u64;

        // Create a staging buffer for readback
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("download_staging"),
            size: buffer_size.max(4),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("download_copy"),
        });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, buffer_size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..buffer_size);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.synchronize()?;

        receiver
            .recv()
            .map_err(|e| Error::KernelExecution(format!("Map recv failed: {e}")))?
            .map_err(|e| Error::KernelExecution(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();

        Ok(data)
    }
}

/// Trait for runtime operation dispatch.
///
/// Each `OpDispatch` is bound to the shape parameters it was compiled for.
/// Arguments are positional: the destination first, then inputs in the
/// operator's documented order.
pub trait OpDispatch: Send + Sync {
    /// Shape parameters this dispatch was specialized with.
    fn shape_params(&self) -> &crate::types::ShapeParams;

    /// The compiled shader module, for dispatches that run one.
    fn shader_module(&self) -> Option<&naga::Module> {
        None
    }

    /// Execute once, writing into `output`.
    ///
    /// Completion may be asynchronous on a GPU; callers use
    /// `DispatchCtx::synchronize()` before reading `output`.
    fn dispatch(
        &self,
        ctx: &mut DispatchCtx,
        output: &mut RuntimeTensor,
        inputs: &[&RuntimeTensor],
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_context_round_trip() {
        let ctx = DispatchCtx::host();
        assert_eq!(ctx.target(), Target::Host);

        let values = [1.5f32, -2.0, 3.25];
        let tensor = ctx
            .upload_tensor(bytemuck::cast_slice(&values), &[3], DataType::F32)
            .unwrap();
        assert_eq!(tensor.len(), 3);
        assert_eq!(tensor.size_bytes, 12);

        let bytes = ctx.download_tensor(&tensor).unwrap();
        let back: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(back, values);
    }

    #[test]
    fn test_host_compile_options() {
        let options = DispatchCtx::host().compile_options(64);
        assert_eq!(options.target, Target::Host);
        assert_eq!(options.workgroup_size, 64);
        assert_eq!(
            options.max_workgroup_size,
            crate::compile_ctx::DEFAULT_MAX_WORKGROUP_SIZE
        );
    }

    #[test]
    fn test_upload_length_mismatch() {
        let ctx = DispatchCtx::host();
        let err = ctx.upload_tensor(&[0u8; 8], &[3], DataType::F32).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn test_host_output_tensor() {
        let ctx = DispatchCtx::host();
        let mut output = ctx.create_output_tensor(&[4], DataType::F32).unwrap();

        assert_eq!(output.size_bytes, 16);
        assert_eq!(output.host_bytes_mut().unwrap().len(), 16);
        assert!(output.gpu_buffer().is_err());
        assert!(ctx.synchronize().is_ok());
    }

    #[test]
    fn test_gpu_operations_fail_on_host_context() {
        let ctx = DispatchCtx::host();
        let module = naga::Module::default();
        let err = ctx.create_pipeline("empty", &module, "main").unwrap_err();
        assert!(matches!(err, Error::KernelExecution(_)));
    }
}
