//! Core operator traits, shape parameters and dispatch types for Conveyor.
//!
//! This crate provides the abstractions the other Conveyor crates build on:
//! - Shape parameters (`ShapeParams`, `ShapeKey`) used to specialize kernels
//! - Operator and dispatch traits (`Operator`, `OpDispatch`)
//! - Compile context for ahead-of-time shader specialization (`CompileCtx`)
//! - Dispatch context for GPU or host execution (`DispatchCtx`)
//! - Operator registry with shape-keyed resolution (`OperatorRegistry`)

pub mod compile_ctx;
pub mod dispatch;
pub mod operator;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use compile_ctx::{CompileCtx, CompileOptions};
pub use dispatch::{DispatchCtx, OpDispatch, RuntimeTensor, TensorStorage};
pub use operator::Operator;
pub use registry::OperatorRegistry;
pub use types::{DataType, ShapeKey, ShapeParams, Target};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kernel resolution and dispatch.
///
/// None of these are recovered locally. They propagate unchanged to the
/// caller of the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-supplied shapes are not a valid convolution problem.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// The named operator or its shape specialization could not be located
    /// or compiled.
    #[error("Kernel resolution failed: {0}")]
    KernelResolution(String),

    /// The kernel failed while executing (device fault, operand mismatch).
    #[error("Kernel execution failed: {0}")]
    KernelExecution(String),
}
