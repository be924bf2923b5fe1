//! Conveyor CLI library - shared functionality for testing and binary.

use anyhow::{Context, Result};
use conveyor_core::OperatorRegistry;
use conveyor_operators::{ShaderLibrary, core_operator_registry};
use conveyor_runtime::{ConvolutionDispatcher, DispatcherConfig, Runtime, Tensor};
use std::path::Path;

/// Where a convolution executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetArg {
    /// Reference loop on the CPU
    Host,
    /// WGSL compute shader on the default GPU adapter
    Gpu,
}

/// Edge alignment for the built-in conv1d operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AlignmentArg {
    Leading,
    Centered,
}

impl AlignmentArg {
    /// Name of the built-in operator implementing this alignment.
    pub fn operator_name(self) -> &'static str {
        match self {
            AlignmentArg::Leading => "conv1d",
            AlignmentArg::Centered => "conv1d_centered",
        }
    }
}

/// Built-in operators, overridden by any kernels found in `library`.
pub fn build_registry(library: Option<&Path>) -> Result<OperatorRegistry> {
    let mut registry = core_operator_registry();

    if let Some(dir) = library {
        let library = ShaderLibrary::load(dir)
            .with_context(|| format!("Failed to load kernel library from {}", dir.display()))?;
        tracing::info!(count = library.len(), dir = %dir.display(), "loaded kernel library");
        library.register_into(&mut registry);
    }

    Ok(registry)
}

/// Registered operators with their shape parameters, sorted by name.
pub fn list_operators(registry: &OperatorRegistry) -> Vec<(String, Vec<String>)> {
    let mut names: Vec<&str> = registry.operator_names().collect();
    names.sort_unstable();

    names
        .into_iter()
        .filter_map(|name| {
            let op = registry.get(name)?;
            let params = op.shape_params().into_iter().map(str::to_string).collect();
            Some((name.to_string(), params))
        })
        .collect()
}

/// Convolve `input` with `kernel` using `registry` on `target`.
pub fn convolve(
    registry: OperatorRegistry,
    config: DispatcherConfig,
    target: TargetArg,
    input: &[f32],
    kernel: &[f32],
) -> Result<Vec<f32>> {
    let mut dispatcher = match target {
        TargetArg::Host => ConvolutionDispatcher::host(registry, config),
        TargetArg::Gpu => {
            let runtime = pollster::block_on(Runtime::new()).context("Failed to initialize GPU")?;
            tracing::info!(adapter = %runtime.adapter_info().name, "using GPU");
            runtime.dispatcher(registry, config)
        }
    };

    let input = Tensor::from_vec(input.to_vec(), &[input.len()]);
    let kernel = Tensor::from_vec(kernel.to_vec(), &[kernel.len()]);

    let output = dispatcher
        .convolve1d(&input, &kernel)
        .context("Convolution failed")?;
    Ok(output.to_vec::<f32>()?)
}

/// Render values the way they are accepted on the command line.
pub fn format_values(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
