//! Runtime initialization and GPU device management.

use crate::dispatcher::{ConvolutionDispatcher, DispatcherConfig};
use crate::error::{Result, RuntimeError};
use conveyor_core::{DispatchCtx, OperatorRegistry};
use std::sync::Arc;

/// Main entry point for GPU execution.
///
/// Owns the wgpu device and queue and hands out dispatch contexts and
/// dispatchers that share them.
///
/// # Example
/// ```no_run
/// # use conveyor_runtime::Runtime;
/// #[pollster::main]
/// async fn main() -> anyhow::Result<()> {
///     let runtime = Runtime::new().await?;
///     println!("GPU: {}", runtime.adapter_info().name);
///     Ok(())
/// }
/// ```
pub struct Runtime {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
}

impl Runtime {
    /// Initialize the runtime with the default GPU adapter.
    ///
    /// # Errors
    /// Returns an error if no suitable GPU is found or initialization fails.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| {
                RuntimeError::InitError(format!("Failed to find suitable GPU adapter: {e}"))
            })?;

        Self::with_adapter(&adapter).await
    }

    /// Initialize the runtime with a specific GPU adapter.
    ///
    /// # Errors
    /// Returns an error if device initialization fails.
    pub async fn with_adapter(adapter: &wgpu::Adapter) -> Result<Self> {
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| RuntimeError::InitError(format!("Failed to create device: {e}")))?;

        tracing::debug!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "initialized GPU runtime"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    /// Get information about the GPU adapter.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// A dispatch context on this runtime's device.
    pub fn dispatch_ctx(&self) -> DispatchCtx {
        DispatchCtx::gpu(Arc::clone(&self.device), Arc::clone(&self.queue))
    }

    /// A convolution dispatcher that executes on this runtime's device.
    pub fn dispatcher(
        &self,
        registry: OperatorRegistry,
        config: DispatcherConfig,
    ) -> ConvolutionDispatcher {
        ConvolutionDispatcher::new(self.dispatch_ctx(), registry, config)
    }
}
