//! Built-in operator implementations.

mod conv1d;

pub use conv1d::{Alignment, Conv1dOp};
