//! Core operator registry.
//!
//! Provides a pre-populated registry with the built-in convolution operators.

use conveyor_core::OperatorRegistry;

use crate::operators::Conv1dOp;

/// Returns an operator registry pre-populated with the built-in operators.
///
/// The registry includes:
/// - `conv1d` - same-length 1D convolution, window leading each output
/// - `conv1d_centered` - same-length 1D convolution, window centered
///
/// Library kernels can be added to the returned registry via
/// `ShaderLibrary::register_into`.
pub fn core_operator_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::new();

    registry.register("conv1d", Conv1dOp::leading());
    registry.register("conv1d_centered", Conv1dOp::centered());

    registry
}
