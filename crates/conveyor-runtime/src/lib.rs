//! GPU runtime and convolution dispatcher for Conveyor.
//!
//! The runtime has two responsibilities:
//! 1. **GPU initialization** - Set up a wgpu device and queue
//! 2. **Dispatch** - Resolve a shape-specialized kernel, allocate its
//!    output, invoke it once and hand back the result
//!
//! # Example
//!
//! ```no_run
//! use conveyor_runtime::{DispatcherConfig, Runtime, Tensor};
//!
//! #[pollster::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Runtime::new().await?;
//!     let mut dispatcher = runtime.dispatcher(
//!         conveyor_operators::core_operator_registry(),
//!         DispatcherConfig::default(),
//!     );
//!
//!     let input = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0], &[5]);
//!     let kernel = Tensor::from_vec(vec![1.0f32, 0.0, -1.0], &[3]);
//!     let output = dispatcher.convolve1d(&input, &kernel)?;
//!
//!     println!("Result: {:?}", output.to_vec::<f32>()?);
//!     Ok(())
//! }
//! ```

mod dispatcher;
mod error;
mod runtime;
mod tensor;

// Public exports
pub use dispatcher::{ConvolutionDispatcher, DispatcherConfig};
pub use error::{Result, RuntimeError};
pub use runtime::Runtime;
pub use tensor::Tensor;
