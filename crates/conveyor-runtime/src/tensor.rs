//! User-facing tensor type for host data interchange.

use crate::error::{Result, RuntimeError};
use bytemuck::Pod;
use conveyor_core::DataType;

/// Rust element types that map onto a `DataType`.
pub trait Element: Pod {
    const DTYPE: DataType;
}

impl Element for f32 {
    const DTYPE: DataType = DataType::F32;
}

impl Element for i32 {
    const DTYPE: DataType = DataType::I32;
}

impl Element for u32 {
    const DTYPE: DataType = DataType::U32;
}

/// User-facing tensor for input/output data.
///
/// Holds little-endian element bytes in host memory together with a shape
/// and element type. Create from a `Vec` and extract to a `Vec`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<u8>,
    shape: Vec<usize>,
    dtype: DataType,
}

impl Tensor {
    /// Create a tensor from a vector with a given shape.
    ///
    /// # Panics
    /// Panics if `data.len()` is not the product of `shape`.
    ///
    /// # Example
    /// ```
    /// # use conveyor_runtime::Tensor;
    /// let tensor = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[4]);
    /// assert_eq!(tensor.len(), 4);
    /// ```
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Self {
        let expected_len: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_len
        );

        Self {
            data: bytemuck::cast_slice(&data).to_vec(),
            shape: shape.to_vec(),
            dtype: T::DTYPE,
        }
    }

    /// Create a tensor from raw bytes.
    pub(crate) fn from_raw(data: Vec<u8>, shape: &[usize], dtype: DataType) -> Self {
        Self {
            data,
            shape: shape.to_vec(),
            dtype,
        }
    }

    /// Convert tensor to a Vec.
    ///
    /// # Errors
    /// Returns an error if `T` doesn't match the tensor's data type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype {
            return Err(RuntimeError::TensorError(format!(
                "Requested {:?} from a {:?} tensor",
                T::DTYPE,
                self.dtype
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(&self.data))
    }

    /// Get raw bytes of the tensor data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Get the total number of elements in the tensor.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if the tensor is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
