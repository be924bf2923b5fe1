//! Compile-time context for creating dispatch objects.
//!
//! `CompileCtx` provides what is known when an operator is specialized: the
//! operator name, the shape parameters, the execution target and shader
//! compilation.

use crate::types::{ShapeKey, ShapeParams, Target};
use crate::{Error, Result};
use std::collections::HashMap;

/// Default number of invocations per compute workgroup.
pub const DEFAULT_WORKGROUP_SIZE: u32 = 256;

/// wgpu's default `max_compute_invocations_per_workgroup`.
pub const DEFAULT_MAX_WORKGROUP_SIZE: u32 = 256;

/// wgpu's default `max_compute_workgroups_per_dimension`.
pub const DEFAULT_MAX_WORKGROUPS: u32 = 65_535;

/// Options that apply to every specialization compiled in one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Where the compiled dispatch will execute.
    pub target: Target,

    /// Invocations per workgroup for GPU kernels (`WORKGROUP_SIZE` define).
    pub workgroup_size: u32,

    /// Largest `workgroup_size` the executing device accepts.
    pub max_workgroup_size: u32,

    /// Largest workgroup count per dispatch dimension.
    pub max_workgroups: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::Gpu,
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            max_workgroup_size: DEFAULT_MAX_WORKGROUP_SIZE,
            max_workgroups: DEFAULT_MAX_WORKGROUPS,
        }
    }
}

/// Compile-time context passed to `Operator::create_dispatch()`.
pub struct CompileCtx<'a> {
    /// Name the operator was resolved under.
    pub operator: &'a str,

    /// Shape parameters to specialize for.
    params: &'a ShapeParams,

    options: &'a CompileOptions,

    /// Shader compilation cache (label → naga module), scoped to one
    /// resolution.
    shader_cache: &'a mut HashMap<String, naga::Module>,
}

impl<'a> CompileCtx<'a> {
    /// Create a new compile context.
    pub fn new(
        operator: &'a str,
        params: &'a ShapeParams,
        options: &'a CompileOptions,
        shader_cache: &'a mut HashMap<String, naga::Module>,
    ) -> Self {
        Self {
            operator,
            params,
            options,
            shader_cache,
        }
    }

    /// The execution target the dispatch is compiled for.
    pub fn target(&self) -> Target {
        self.options.target
    }

    pub fn workgroup_size(&self) -> u32 {
        self.options.workgroup_size
    }

    /// Largest workgroup count one dispatch may launch.
    pub fn max_workgroups(&self) -> u32 {
        self.options.max_workgroups
    }

    /// Workgroups along x needed for one invocation per element of a
    /// `len`-element output.
    ///
    /// Fails with `KernelResolution` when `workgroup_size` is zero or above
    /// the device limit, or when the launch needs more workgroups than one
    /// dispatch allows.
    pub fn launch_size(&self, len: usize) -> Result<u32> {
        let workgroup_size = self.options.workgroup_size;
        if workgroup_size == 0 || workgroup_size > self.options.max_workgroup_size {
            return Err(Error::KernelResolution(format!(
                "Workgroup size {workgroup_size} is outside 1..={}",
                self.options.max_workgroup_size
            )));
        }

        let workgroups = len.div_ceil(workgroup_size as usize);
        match u32::try_from(workgroups) {
            Ok(count) if count <= self.options.max_workgroups => Ok(count),
            _ => Err(Error::KernelResolution(format!(
                "{}{} needs {workgroups} workgroups of {workgroup_size}, limit is {}",
                self.operator, self.params, self.options.max_workgroups
            ))),
        }
    }

    /// All shape parameters.
    pub fn params(&self) -> &ShapeParams {
        self.params
    }

    /// Get a required shape parameter.
    pub fn param(&self, name: &str) -> Result<usize> {
        self.params.require(name)
    }

    /// Interpret the parameters as a 1D convolution `(N, K)` key.
    pub fn shape_key(&self) -> Result<ShapeKey> {
        ShapeKey::from_params(self.params)
    }

    /// Shader defines for the shape parameters plus `WORKGROUP_SIZE`.
    pub fn shader_defines(&self) -> HashMap<String, String> {
        let mut defines = self.params.to_defines();
        defines.insert(
            "WORKGROUP_SIZE".to_string(),
            self.options.workgroup_size.to_string(),
        );
        defines
    }

    /// Label that identifies this specialization, e.g. `conv1d{conv_size=3, input_size=5}`.
    pub fn specialization_label(&self) -> String {
        format!("{}{}", self.operator, self.params)
    }

    /// Compile a WGSL shader source into a naga module.
    ///
    /// Results are cached by label for the lifetime of this resolution, so an
    /// operator that reuses a shader across passes compiles it once.
    pub fn compile_shader(
        &mut self,
        label: &str,
        source: &str,
        defines: &HashMap<String, String>,
    ) -> Result<naga::Module> {
        if let Some(module) = self.shader_cache.get(label) {
            return Ok(module.clone());
        }

        let module = compile_wgsl_to_naga(label, source, defines)?;
        tracing::debug!(label, num_defines = defines.len(), "compiled shader");

        self.shader_cache.insert(label.to_string(), module.clone());
        Ok(module)
    }
}

/// Compile WGSL source to a naga module using naga_oil preprocessing.
///
/// Defines whose value parses as an integer become `ShaderDefValue::Int`
/// (usable as `#{NAME}` substitutions), everything else a boolean.
fn compile_wgsl_to_naga(
    label: &str,
    source: &str,
    defines: &HashMap<String, String>,
) -> Result<naga::Module> {
    use naga_oil::compose::{Composer, NagaModuleDescriptor, ShaderDefValue};

    let mut composer = Composer::default();

    let shader_defs: HashMap<String, ShaderDefValue> = defines
        .iter()
        .map(|(k, v)| {
            if let Ok(int_val) = v.parse::<i32>() {
                (k.clone(), ShaderDefValue::Int(int_val))
            } else {
                (k.clone(), ShaderDefValue::Bool(v == "true"))
            }
        })
        .collect();

    let module = composer
        .make_naga_module(NagaModuleDescriptor {
            source,
            file_path: label,
            shader_defs,
            ..Default::default()
        })
        .map_err(|e| {
            Error::KernelResolution(format!("Shader compilation failed for '{label}': {e}"))
        })?;

    Ok(module)
}
