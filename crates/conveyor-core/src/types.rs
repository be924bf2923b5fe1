//! Core types for element types, execution targets and shape parameters.

use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Shape parameter name for the input signal length.
pub const INPUT_SIZE: &str = "input_size";

/// Shape parameter name for the convolution kernel length.
pub const CONV_SIZE: &str = "conv_size";

/// Element data type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    I32,
    U32,
}

impl DataType {
    /// Size of this data type in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
        }
    }
}

/// Where a compiled kernel executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    /// A wgpu device with compute shaders.
    #[default]
    Gpu,

    /// The host CPU, using the operator's reference implementation.
    Host,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Gpu => write!(f, "gpu"),
            Target::Host => write!(f, "host"),
        }
    }
}

/// Named shape parameters used to select a kernel specialization.
///
/// Equivalent to a mapping like `{"input_size": 5, "conv_size": 3}`. Names
/// are kept sorted so labels and comparisons are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShapeParams {
    values: BTreeMap<String, usize>,
}

impl ShapeParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: usize) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: usize) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.values.get(name).copied()
    }

    /// Look up a parameter that a kernel cannot be specialized without.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.get(name).ok_or_else(|| {
            Error::KernelResolution(format!("Missing shape parameter '{name}' in {self}"))
        })
    }

    /// Iterate over parameter names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }

    /// Iterate over `(name, value)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shader defines for these parameters.
    ///
    /// Names are upper-cased, so `input_size` becomes `INPUT_SIZE`.
    pub fn to_defines(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.to_uppercase(), v.to_string()))
            .collect()
    }
}

impl fmt::Display for ShapeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

/// The `(N, K)` pair a 1D convolution kernel is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    /// Input signal length (N).
    pub input_size: usize,

    /// Convolution kernel length (K).
    pub conv_size: usize,
}

impl ShapeKey {
    pub fn new(input_size: usize, conv_size: usize) -> Self {
        Self {
            input_size,
            conv_size,
        }
    }

    /// Check that the pair describes a valid same-length convolution.
    ///
    /// Requires `N >= 1`, `K >= 1` and `K <= N`.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(Error::InvalidShape(
                "Input signal must have at least one element".to_string(),
            ));
        }
        if self.conv_size == 0 {
            return Err(Error::InvalidShape(
                "Kernel must have at least one element".to_string(),
            ));
        }
        if self.conv_size > self.input_size {
            return Err(Error::InvalidShape(format!(
                "Kernel length {} exceeds input length {}",
                self.conv_size, self.input_size
            )));
        }
        Ok(())
    }

    /// Read a key back out of named shape parameters.
    pub fn from_params(params: &ShapeParams) -> Result<Self> {
        Ok(Self {
            input_size: params.require(INPUT_SIZE)?,
            conv_size: params.require(CONV_SIZE)?,
        })
    }
}

impl From<ShapeKey> for ShapeParams {
    fn from(key: ShapeKey) -> Self {
        ShapeParams::new()
            .with(INPUT_SIZE, key.input_size)
            .with(CONV_SIZE, key.conv_size)
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(N={}, K={})", self.input_size, self.conv_size)
    }
}
