//! Common test utilities for operator tests.
//!
//! Shared helpers for shader specialization checks (no GPU needed) and GPU
//! integration tests.

#![allow(dead_code)]

use conveyor_core::{
    CompileCtx, CompileOptions, DataType, OpDispatch, Operator, ShapeKey,
    ShapeParams, Target,
};
use std::collections::HashMap;

pub use conveyor_operators::{Alignment, Conv1dOp, core_operator_registry, reference};
pub use conveyor_runtime::Runtime;

/// Deterministic, non-trivial test signal of length `len`.
pub fn make_signal(len: usize, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            // Small integers keep float sums exact on every backend.
            ((state >> 24) % 9) as f32 - 4.0
        })
        .collect()
}

/// Specialize `op` for `key` without going through a registry.
pub fn compile_for(
    op: &dyn Operator,
    key: ShapeKey,
    target: Target,
) -> conveyor_core::Result<Box<dyn OpDispatch>> {
    let params = ShapeParams::from(key);
    op.validate_params(&params)?;

    let options = CompileOptions {
        target,
        ..Default::default()
    };
    let mut cache = HashMap::new();
    let mut ctx = CompileCtx::new(op.name(), &params, &options, &mut cache);
    op.create_dispatch(&mut ctx)
}

/// Run a registered conv1d operator on the GPU and return the output.
pub async fn run_conv1d_gpu(name: &str, input: &[f32], kernel: &[f32]) -> Vec<f32> {
    let runtime = Runtime::new()
        .await
        .expect("Runtime initialization should succeed");
    let mut ctx = runtime.dispatch_ctx();

    let registry = core_operator_registry();
    let params = ShapeParams::from(ShapeKey::new(input.len(), kernel.len()));
    let dispatch = registry
        .resolve(name, &params, &CompileOptions::default())
        .expect("Resolution should succeed");

    let mut output = ctx
        .create_output_tensor(&[input.len()], DataType::F32)
        .unwrap();
    let input = ctx
        .upload_tensor(bytemuck::cast_slice(input), &[input.len()], DataType::F32)
        .unwrap();
    let kernel = ctx
        .upload_tensor(bytemuck::cast_slice(kernel), &[kernel.len()], DataType::F32)
        .unwrap();

    dispatch
        .dispatch(&mut ctx, &mut output, &[&input, &kernel])
        .expect("Dispatch should succeed");
    ctx.synchronize().unwrap();

    bytemuck::pod_collect_to_vec(&ctx.download_tensor(&output).unwrap())
}
