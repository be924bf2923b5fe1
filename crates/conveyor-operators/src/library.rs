//! External WGSL kernel libraries.
//!
//! A library is a directory of `.wgsl` files. Each file becomes an operator
//! named after its file stem, specialized through the `#{NAME}` placeholders
//! it contains: `#{INPUT_SIZE}` makes `input_size` a required shape
//! parameter. `#{WORKGROUP_SIZE}` is always supplied by the compiler and is
//! not a shape parameter.

use crate::{Error, Result};
use conveyor_core::operator::check_param_names;
use conveyor_core::types::{CONV_SIZE, INPUT_SIZE};
use conveyor_core::{
    CompileCtx, DispatchCtx, OpDispatch, Operator, OperatorRegistry, RuntimeTensor, ShapeParams,
    Target,
};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Defines supplied by `CompileCtx` rather than by shape parameters.
const BUILTIN_DEFINES: &[&str] = &["WORKGROUP_SIZE"];

/// A set of WGSL kernels loaded from disk.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    operators: Vec<ShaderOp>,
}

impl ShaderLibrary {
    /// Load every `*.wgsl` file in `dir` (non-recursive).
    ///
    /// Files are sorted by name so registration order is stable.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::Library(format!("Cannot read {}: {e}", dir.display())))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::Library(format!("Cannot read {}: {e}", dir.display())))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "wgsl") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut library = Self::default();
        for path in paths {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| {
                    Error::Library(format!("Kernel file name is not UTF-8: {}", path.display()))
                })?
                .to_string();
            let source = std::fs::read_to_string(&path)
                .map_err(|e| Error::Library(format!("Cannot read {}: {e}", path.display())))?;

            library.add_source(&name, source);
        }

        tracing::debug!(dir = %dir.display(), count = library.len(), "loaded kernel library");
        Ok(library)
    }

    /// Add a kernel from WGSL source text.
    pub fn add_source(&mut self, name: &str, source: impl Into<String>) -> &mut Self {
        self.operators.push(ShaderOp::new(name, source));
        self
    }

    /// Register every kernel into `registry`, replacing same-named operators.
    pub fn register_into(self, registry: &mut OperatorRegistry) {
        for op in self.operators {
            let name = op.name.clone();
            registry.register(&name, op);
        }
    }

    /// Names of the kernels in this library.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.iter().map(|op| op.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ShaderOp> {
        self.operators.iter().find(|op| op.name == name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// A GPU-only operator backed by a WGSL source with `#{NAME}` placeholders.
///
/// Bindings: output at `@binding(0)`, inputs at `@binding(1..)` in the order
/// passed to `dispatch`. Entry point `main`, one invocation per output
/// element.
///
/// Kernels that take `input_size` follow the conv1d operand layout: the
/// output and the first input hold `input_size` elements, and with
/// `conv_size` the second input holds `conv_size`. Operands of any other
/// length are rejected at dispatch.
#[derive(Debug, Clone)]
pub struct ShaderOp {
    name: String,
    source: String,
    params: Vec<String>,
}

impl ShaderOp {
    pub fn new(name: &str, source: impl Into<String>) -> Self {
        let source = source.into();
        let params = placeholder_params(&source);
        Self {
            name: name.to_string(),
            source,
            params,
        }
    }
}

/// Lower-cased placeholder names, sorted and deduplicated.
fn placeholder_params(source: &str) -> Vec<String> {
    let mut params: Vec<String> = PLACEHOLDER
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .filter(|name| !BUILTIN_DEFINES.contains(&name.as_str()))
        .map(|name| name.to_lowercase())
        .collect();
    params.sort();
    params.dedup();
    params
}

impl Operator for ShaderOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape_params(&self) -> Vec<&str> {
        self.params.iter().map(String::as_str).collect()
    }

    fn validate_params(&self, params: &ShapeParams) -> conveyor_core::Result<()> {
        check_param_names(&self.name, &self.shape_params(), params)?;

        if let Some((name, value)) = params.iter().find(|(_, value)| *value > i32::MAX as usize) {
            return Err(conveyor_core::Error::KernelResolution(format!(
                "Shape parameter '{name}' = {value} does not fit a shader constant"
            )));
        }
        Ok(())
    }

    fn create_dispatch(&self, ctx: &mut CompileCtx) -> conveyor_core::Result<Box<dyn OpDispatch>> {
        if ctx.target() != Target::Gpu {
            return Err(conveyor_core::Error::KernelResolution(format!(
                "Kernel '{}' has no {} implementation",
                self.name,
                ctx.target()
            )));
        }

        // Fixed-length kernels are launch-checked now; others per dispatch.
        let workgroups = match ctx.params().get(INPUT_SIZE) {
            Some(len) => Some(ctx.launch_size(len)?),
            None => {
                ctx.launch_size(0)?;
                None
            }
        };

        let label = ctx.specialization_label();
        let defines = ctx.shader_defines();
        let module = ctx.compile_shader(&label, &self.source, &defines)?;

        Ok(Box::new(ShaderDispatch {
            module,
            label,
            params: ctx.params().clone(),
            workgroup_size: ctx.workgroup_size(),
            max_workgroups: ctx.max_workgroups(),
            workgroups,
        }))
    }
}

/// Runtime dispatch for a library kernel.
struct ShaderDispatch {
    module: naga::Module,
    label: String,
    params: ShapeParams,
    workgroup_size: u32,
    max_workgroups: u32,

    /// Launch size computed at resolution when `input_size` is known.
    workgroups: Option<u32>,
}

impl ShaderDispatch {
    /// Check operand lengths against the compiled `input_size`/`conv_size`.
    fn check_operands(
        &self,
        output: &RuntimeTensor,
        inputs: &[&RuntimeTensor],
    ) -> conveyor_core::Result<()> {
        let operands = [
            ("output", Some(output), INPUT_SIZE),
            ("input 0", inputs.first().copied(), INPUT_SIZE),
            ("input 1", inputs.get(1).copied(), CONV_SIZE),
        ];

        for (role, tensor, param) in operands {
            let Some(expected) = self.params.get(param) else {
                continue;
            };
            match tensor {
                Some(tensor) if tensor.len() == expected => {}
                Some(tensor) => {
                    return Err(conveyor_core::Error::KernelExecution(format!(
                        "{}: {role} has {} elements but the kernel was compiled for {param}={expected}",
                        self.label,
                        tensor.len()
                    )));
                }
                None => {
                    return Err(conveyor_core::Error::KernelExecution(format!(
                        "{}: missing {role} ({param}={expected})",
                        self.label
                    )));
                }
            }
        }
        Ok(())
    }

    fn workgroups(&self, output: &RuntimeTensor) -> conveyor_core::Result<u32> {
        if let Some(workgroups) = self.workgroups {
            return Ok(workgroups);
        }

        let workgroups = output.len().div_ceil(self.workgroup_size as usize);
        match u32::try_from(workgroups) {
            Ok(count) if count <= self.max_workgroups => Ok(count),
            _ => Err(conveyor_core::Error::KernelExecution(format!(
                "{}: {} output elements need {workgroups} workgroups, limit is {}",
                self.label,
                output.len(),
                self.max_workgroups
            ))),
        }
    }
}

impl OpDispatch for ShaderDispatch {
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
    ) -> conveyor_core::Result<()> {
        self.check_operands(output, inputs)?;
        let workgroups = self.workgroups(output)?;

        let mut bindings: Vec<&RuntimeTensor> = Vec::with_capacity(inputs.len() + 1);
        bindings.push(output);
        bindings.extend_from_slice(inputs);

        let pipeline = ctx.create_pipeline(&self.label, &self.module, "main")?;
        ctx.dispatch_compute(&pipeline, &bindings, [workgroups, 1, 1])
    }
}
