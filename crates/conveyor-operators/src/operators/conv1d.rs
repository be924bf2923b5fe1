//! Conv1d operator implementation.
//!
//! Same-length 1D convolution of a signal with a short kernel. Each
//! specialization is bound to one `(input_size, conv_size)` pair.

use conveyor_core::operator::check_param_names;
use conveyor_core::types::{CONV_SIZE, INPUT_SIZE};
use conveyor_core::{
    CompileCtx, DataType, DispatchCtx, Error, OpDispatch, Operator, Result, RuntimeTensor,
    ShapeKey, ShapeParams, Target,
};

use crate::reference;

/// Shader source for the Conv1d operator.
const CONV1D_SHADER: &str = include_str!("../../shaders/conv1d.wgsl");

/// Placement of the kernel window relative to the output position.
///
/// With `input = [1, 2, 3, 4, 5]` and `kernel = [1, 0, -1]`:
/// - `Leading` gives `[-2, -2, -2, 4, 5]`, the taps running off the end.
/// - `Centered` gives `[-2, -2, -2, -2, 4]`, interior `in[i-1] - in[i+1]`
///   with truncated windows at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Window starts at the output position: `out[i]` reads `in[i..i+K]`.
    #[default]
    Leading,

    /// Window is centered on the output position, rounding the origin down
    /// for even kernel lengths.
    Centered,
}

impl Alignment {
    /// Offset of tap 0 to the left of the output position.
    pub fn origin(&self, conv_size: usize) -> usize {
        match self {
            Alignment::Leading => 0,
            Alignment::Centered => conv_size.saturating_sub(1) / 2,
        }
    }
}

/// Conv1d operator.
///
/// Registered as `conv1d` (leading window, the dispatcher default) and
/// `conv1d_centered`. Callers expecting a centered stencil must ask for
/// `conv1d_centered`; see [`Alignment`] for both outputs on one vector.
///
/// **Signature:** `(output, input, kernel)`, all `f32`, 1-D.
/// - output - length `input_size`, written in place
/// - input - length `input_size`
/// - kernel - length `conv_size`
///
/// **Shape parameters:** `input_size`, `conv_size`, with
/// `1 <= conv_size <= input_size`.
///
/// **Implementation:**
/// - GPU: `conv1d.wgsl` specialized through `INPUT_SIZE`, `CONV_SIZE` and
///   `ORIGIN` defines, one invocation per output element
/// - Host: the reference loop in [`crate::reference`]
/// - Kernel taps outside the input contribute nothing
pub struct Conv1dOp {
    alignment: Alignment,
}

impl Conv1dOp {
    pub fn new(alignment: Alignment) -> Self {
        Self { alignment }
    }

    /// Window starting at each output position.
    pub fn leading() -> Self {
        Self::new(Alignment::Leading)
    }

    /// Window centered on each output position.
    pub fn centered() -> Self {
        Self::new(Alignment::Centered)
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }
}

impl Operator for Conv1dOp {
    fn name(&self) -> &str {
        match self.alignment {
            Alignment::Leading => "conv1d",
            Alignment::Centered => "conv1d_centered",
        }
    }

    fn shape_params(&self) -> Vec<&str> {
        vec![INPUT_SIZE, CONV_SIZE]
    }

    fn validate_params(&self, params: &ShapeParams) -> Result<()> {
        check_param_names(self.name(), &self.shape_params(), params)?;

        let key = ShapeKey::from_params(params)?;
        if key.validate().is_err() || key.input_size > i32::MAX as usize {
            return Err(Error::KernelResolution(format!(
                "Operator '{}' has no specialization for {key}",
                self.name()
            )));
        }
        Ok(())
    }

    fn create_dispatch(&self, ctx: &mut CompileCtx) -> Result<Box<dyn OpDispatch>> {
        let key = ctx.shape_key()?;
        let params = ctx.params().clone();

        match ctx.target() {
            Target::Host => Ok(Box::new(Conv1dHostDispatch {
                params,
                key,
                alignment: self.alignment,
            })),
            Target::Gpu => {
                let workgroups = ctx.launch_size(key.input_size)?;

                let mut shader_defs = ctx.shader_defines();
                shader_defs.insert(
                    "ORIGIN".to_string(),
                    self.alignment.origin(key.conv_size).to_string(),
                );

                let label = ctx.specialization_label();
                let module = ctx.compile_shader(&label, CONV1D_SHADER, &shader_defs)?;

                Ok(Box::new(Conv1dGpuDispatch {
                    module,
                    label,
                    params,
                    key,
                    workgroups,
                }))
            }
        }
    }
}

/// Check the positional operands against the compiled specialization.
///
/// Returns `(input, kernel)`.
fn check_operands<'t>(
    key: &ShapeKey,
    output: &RuntimeTensor,
    inputs: &[&'t RuntimeTensor],
) -> Result<(&'t RuntimeTensor, &'t RuntimeTensor)> {
    let [input, kernel] = inputs else {
        return Err(Error::KernelExecution(format!(
            "conv1d expects 2 inputs (input, kernel), got {}",
            inputs.len()
        )));
    };

    for (role, tensor, expected) in [
        ("output", output, key.input_size),
        ("input", *input, key.input_size),
        ("kernel", *kernel, key.conv_size),
    ] {
        if tensor.dtype != DataType::F32 {
            return Err(Error::KernelExecution(format!(
                "conv1d {role} must be F32, got {:?}",
                tensor.dtype
            )));
        }
        if tensor.shape != [expected] {
            return Err(Error::KernelExecution(format!(
                "conv1d {role} has shape {:?} but the kernel was compiled for {key}",
                tensor.shape
            )));
        }
    }

    Ok((*input, *kernel))
}

/// Runtime dispatch for Conv1d on the host.
struct Conv1dHostDispatch {
    params: ShapeParams,
    key: ShapeKey,
    alignment: Alignment,
}

impl OpDispatch for Conv1dHostDispatch {
    fn shape_params(&self) -> &ShapeParams {
        &self.params
    }

    fn dispatch(
        &self,
        _ctx: &mut DispatchCtx,
        output: &mut RuntimeTensor,
        inputs: &[&RuntimeTensor],
    ) -> Result<()> {
        let (input, kernel) = check_operands(&self.key, output, inputs)?;

        let input: Vec<f32> = bytemuck::pod_collect_to_vec(input.host_bytes()?);
        let kernel: Vec<f32> = bytemuck::pod_collect_to_vec(kernel.host_bytes()?);

        let mut result = vec![0.0f32; self.key.input_size];
        reference::conv1d_into(&mut result, &input, &kernel, self.alignment);

        let dst = output.host_bytes_mut()?;
        dst.clear();
        dst.extend_from_slice(bytemuck::cast_slice(&result));
        Ok(())
    }
}

/// Runtime dispatch for Conv1d on the GPU.
struct Conv1dGpuDispatch {
    /// Pre-compiled naga module for this specialization.
    module: naga::Module,

    /// Label for the pipeline.
    label: String,

    params: ShapeParams,
    key: ShapeKey,

    /// Workgroups along x, one invocation per output element.
    workgroups: u32,
}

impl OpDispatch for Conv1dGpuDispatch {
    fn shape_params(&self) -> &ShapeParams {
        &self.params
    }

    fn shader_module(&self) -> Option<&naga::Module> {
        Some(&self.module)
    }

    fn dispatch(
        &self,
        ctx: &mut DispatchCtx,
        output: &mut RuntimeTensor,
        inputs: &[&RuntimeTensor],
    ) -> Result<()> {
        let (input, kernel) = check_operands(&self.key, output, inputs)?;

        let pipeline = ctx.create_pipeline(&self.label, &self.module, "main")?;
        ctx.dispatch_compute(&pipeline, &[&*output, input, kernel], [self.workgroups, 1, 1])?;

        tracing::debug!(label = %self.label, workgroups = self.workgroups, "dispatched conv1d");
        Ok(())
    }
}
