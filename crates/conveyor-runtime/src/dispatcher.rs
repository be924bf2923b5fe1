//! Shape-specialized convolution dispatch.
//!
//! Every call resolves the configured operator for the exact `(N, K)` of its
//! operands, compiles it, and invokes it once. Nothing compiled survives the
//! call.

use crate::error::Result;
use crate::tensor::Tensor;
use conveyor_core::{
    DataType, DispatchCtx, Error, OperatorRegistry, ShapeKey, ShapeParams, Target,
    compile_ctx::DEFAULT_WORKGROUP_SIZE,
};

/// Configuration for a [`ConvolutionDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Registered operator to resolve for each call.
    ///
    /// Defaults to `conv1d`, whose window starts at each output position.
    /// Use `conv1d_centered` for a window centered on it.
    pub operator: String,

    /// Threads per workgroup for GPU specializations. Sizes above the
    /// device limit fail resolution with `KernelResolution`.
    pub workgroup_size: u32,
}

impl DispatcherConfig {
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn with_workgroup_size(mut self, workgroup_size: u32) -> Self {
        self.workgroup_size = workgroup_size;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            operator: "conv1d".to_string(),
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
        }
    }
}

/// Runs `convolve1d` through a registry of shape-specialized operators.
pub struct ConvolutionDispatcher {
    ctx: DispatchCtx,
    registry: OperatorRegistry,
    config: DispatcherConfig,
}

impl ConvolutionDispatcher {
    /// Create a dispatcher executing on `ctx`.
    pub fn new(ctx: DispatchCtx, registry: OperatorRegistry, config: DispatcherConfig) -> Self {
        Self {
            ctx,
            registry,
            config,
        }
    }

    /// Create a dispatcher that executes host specializations, no GPU needed.
    pub fn host(registry: OperatorRegistry, config: DispatcherConfig) -> Self {
        Self::new(DispatchCtx::host(), registry, config)
    }

    pub fn target(&self) -> Target {
        self.ctx.target()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.registry
    }

    /// Convolve `input` (length N) with `kernel` (length K).
    ///
    /// Returns a new tensor of length N. The kernel is resolved and compiled
    /// for this `(N, K)` before anything runs, then invoked exactly once with
    /// output, input and kernel buffers in that order.
    ///
    /// # Errors
    /// - `InvalidShape` if either operand is not a non-empty 1-D `f32` tensor
    ///   or K > N.
    /// - `KernelResolution` if no operator provides this specialization.
    /// - `KernelExecution` if the invocation fails.
    #[tracing::instrument(
        skip_all,
        fields(operator = %self.config.operator, target = %self.ctx.target())
    )]
    pub fn convolve1d(&mut self, input: &Tensor, kernel: &Tensor) -> Result<Tensor> {
        let key = shape_key(input, kernel)?;
        let params = ShapeParams::from(key);

        // Compile before touching any buffers.
        let options = self.ctx.compile_options(self.config.workgroup_size);
        let dispatch = self
            .registry
            .resolve(&self.config.operator, &params, &options)?;

        let shape = [key.input_size];
        let mut output = self.ctx.create_output_tensor(&shape, DataType::F32)?;
        let input = self
            .ctx
            .upload_tensor(input.as_bytes(), input.shape(), DataType::F32)?;
        let kernel = self
            .ctx
            .upload_tensor(kernel.as_bytes(), kernel.shape(), DataType::F32)?;

        {
            let _span = tracing::debug_span!("dispatch", %key).entered();
            dispatch.dispatch(&mut self.ctx, &mut output, &[&input, &kernel])?;
            self.ctx.synchronize()?;
        }

        let data = self.ctx.download_tensor(&output)?;
        if data.len() != key.input_size * DataType::F32.size() {
            return Err(Error::KernelExecution(format!(
                "Kernel produced {} bytes, expected {} elements",
                data.len(),
                key.input_size
            ))
            .into());
        }

        tracing::debug!(%key, "convolution complete");
        Ok(Tensor::from_raw(data, &shape, DataType::F32))
    }
}

/// Validate the operands and derive the `(N, K)` they select.
fn shape_key(input: &Tensor, kernel: &Tensor) -> Result<ShapeKey> {
    for (role, tensor) in [("input", input), ("kernel", kernel)] {
        if tensor.shape().len() != 1 {
            return Err(Error::InvalidShape(format!(
                "{role} must be 1-D, got shape {:?}",
                tensor.shape()
            ))
            .into());
        }
        if tensor.dtype() != DataType::F32 {
            return Err(Error::InvalidShape(format!(
                "{role} must be F32, got {:?}",
                tensor.dtype()
            ))
            .into());
        }
    }

    let key = ShapeKey::new(input.len(), kernel.len());
    key.validate()?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeError;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.operator, "conv1d");
        assert_eq!(config.workgroup_size, DEFAULT_WORKGROUP_SIZE);

        let config = config.with_operator("conv1d_centered").with_workgroup_size(64);
        assert_eq!(config.operator, "conv1d_centered");
        assert_eq!(config.workgroup_size, 64);
    }

    #[test]
    fn test_shape_key_from_operands() {
        let input = Tensor::from_vec(vec![0.0f32; 6], &[6]);
        let kernel = Tensor::from_vec(vec![0.0f32; 3], &[3]);
        assert_eq!(shape_key(&input, &kernel).unwrap(), ShapeKey::new(6, 3));
    }

    #[test]
    fn test_shape_key_rejects_non_vector() {
        let input = Tensor::from_vec(vec![0.0f32; 6], &[2, 3]);
        let kernel = Tensor::from_vec(vec![0.0f32; 3], &[3]);
        assert!(matches!(
            shape_key(&input, &kernel),
            Err(RuntimeError::Core(Error::InvalidShape(_)))
        ));
    }

    #[test]
    fn test_shape_key_rejects_integer_tensors() {
        let input = Tensor::from_vec(vec![0i32; 6], &[6]);
        let kernel = Tensor::from_vec(vec![0.0f32; 3], &[3]);
        let err = shape_key(&input, &kernel).unwrap_err();
        assert!(err.to_string().contains("F32"));
    }

    #[test]
    fn test_empty_registry_is_resolution_error() {
        let mut dispatcher =
            ConvolutionDispatcher::host(OperatorRegistry::new(), DispatcherConfig::default());
        let input = Tensor::from_vec(vec![1.0f32; 4], &[4]);
        let kernel = Tensor::from_vec(vec![1.0f32; 2], &[2]);

        assert!(matches!(
            dispatcher.convolve1d(&input, &kernel),
            Err(RuntimeError::Core(Error::KernelResolution(_)))
        ));
    }
}
