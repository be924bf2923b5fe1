//! Operator implementations for Conveyor.
//!
//! # Built-in operators
//!
//! - `conv1d` / `conv1d_centered`: same-length 1D convolution, specialized per
//!   `(input_size, conv_size)`, with GPU (WGSL) and host implementations
//!
//! # Kernel libraries
//!
//! [`ShaderLibrary`] loads a directory of `.wgsl` kernels and registers each
//! as a GPU operator named after its file.

pub mod library;
pub mod operators;
pub mod reference;

mod registry;

// Re-export operator types
pub use library::{ShaderLibrary, ShaderOp};
pub use operators::{Alignment, Conv1dOp};
pub use registry::core_operator_registry;

/// Result type for operator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for operator operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A kernel library could not be read.
    #[error("Kernel library error: {0}")]
    Library(String),

    #[error(transparent)]
    Core(#[from] conveyor_core::Error),
}
