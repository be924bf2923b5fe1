//! Common test utilities for dispatcher tests.

#![allow(dead_code)]

use conveyor_operators::core_operator_registry;
use conveyor_runtime::{ConvolutionDispatcher, DispatcherConfig, Tensor};

pub use conveyor_operators::{Alignment, reference};

/// Host dispatcher resolving `operator` from the built-in registry.
pub fn host_dispatcher(operator: &str) -> ConvolutionDispatcher {
    ConvolutionDispatcher::host(
        core_operator_registry(),
        DispatcherConfig::default().with_operator(operator),
    )
}

/// 1-D f32 tensor.
pub fn vector(data: &[f32]) -> Tensor {
    Tensor::from_vec(data.to_vec(), &[data.len()])
}

/// Deterministic test signal of small integers so float sums stay exact.
pub fn make_signal(len: usize, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 24) % 9) as f32 - 4.0
        })
        .collect()
}

/// Every `(N, K)` pair with `1 <= K <= N <= max_n`.
pub fn shape_pairs(max_n: usize) -> impl Iterator<Item = (usize, usize)> {
    (1..=max_n).flat_map(|n| (1..=n).map(move |k| (n, k)))
}
