//! Operator registry with shape-keyed resolution.

use crate::compile_ctx::{CompileCtx, CompileOptions};
use crate::dispatch::OpDispatch;
use crate::operator::Operator;
use crate::types::ShapeParams;
use crate::{Error, Result};
use std::collections::HashMap;

/// Registry for operator implementations.
///
/// Maps operator names (e.g., "conv1d") to their `Operator` implementations.
/// Resolving a name together with shape parameters yields a compiled
/// dispatch for exactly that specialization.
///
/// # Example
///
/// ```ignore
/// let mut registry = OperatorRegistry::new();
/// registry.register("conv1d", Conv1dOp::leading());
///
/// let params = ShapeParams::new().with("input_size", 15).with("conv_size", 4);
/// let dispatch = registry.resolve("conv1d", &params, &CompileOptions::default())?;
/// ```
pub struct OperatorRegistry {
    /// Map from operator name to implementation.
    operators: HashMap<String, Box<dyn Operator>>,
}

impl OperatorRegistry {
    /// Create a new empty operator registry.
    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Register an operator, replacing any operator with the same name.
    ///
    /// Returns `self` for method chaining.
    pub fn register<O>(&mut self, name: &str, operator: O) -> &mut Self
    where
        O: Operator + 'static,
    {
        self.register_boxed(name, Box::new(operator))
    }

    /// Register an already boxed operator.
    pub fn register_boxed(&mut self, name: &str, operator: Box<dyn Operator>) -> &mut Self {
        if self.operators.insert(name.to_string(), operator).is_some() {
            tracing::debug!(name, "replaced registered operator");
        }
        self
    }

    /// Look up an operator by name.
    ///
    /// Returns `None` if no operator is registered with the given name.
    pub fn get(&self, name: &str) -> Option<&dyn Operator> {
        self.operators.get(name).map(|op| op.as_ref())
    }

    /// Check if an operator is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Get the number of registered operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Iterate over all registered operator names.
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(|s| s.as_str())
    }

    /// Resolve `name` specialized to `params`, compiling it ahead of time.
    ///
    /// Fails with `Error::KernelResolution` when the name is unknown, the
    /// parameters do not select a specialization the operator provides, or
    /// compilation fails. Nothing compiled here outlives the returned
    /// dispatch.
    #[tracing::instrument(skip(self, options), fields(target = %options.target))]
    pub fn resolve(
        &self,
        name: &str,
        params: &ShapeParams,
        options: &CompileOptions,
    ) -> Result<Box<dyn OpDispatch>> {
        let operator = self.get(name).ok_or_else(|| {
            Error::KernelResolution(format!("No operator registered with name '{name}'"))
        })?;

        operator.validate_params(params)?;

        let mut shader_cache = HashMap::new();
        let mut ctx = CompileCtx::new(name, params, options, &mut shader_cache);
        let dispatch = operator.create_dispatch(&mut ctx)?;

        if dispatch.shape_params() != params {
            return Err(Error::KernelResolution(format!(
                "Operator '{name}' compiled for {} but {params} was requested",
                dispatch.shape_params()
            )));
        }

        tracing::debug!(%params, "resolved operator");
        Ok(dispatch)
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.operator_names().collect();
        names.sort_unstable();
        f.debug_struct("OperatorRegistry")
            .field("operators", &names)
            .finish()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
