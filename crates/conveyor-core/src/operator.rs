//! Operator trait for shape-specialized kernels.

use crate::types::ShapeParams;
use crate::{Error, Result};

/// Trait for implementing named, shape-specialized kernels.
///
/// An operator is resolved by name and specialized to a set of shape
/// parameters. Specialization happens ahead of time in `create_dispatch`,
/// which compiles whatever the target needs and returns a dispatch object
/// bound to exactly those parameters.
///
/// # Example
///
/// ```ignore
/// struct ScaleOperator;
///
/// impl Operator for ScaleOperator {
///     fn name(&self) -> &str {
///         "scale"
///     }
///
///     fn shape_params(&self) -> Vec<&str> {
///         vec!["input_size"]
///     }
///
///     fn create_dispatch(&self, ctx: &mut CompileCtx) -> Result<Box<dyn OpDispatch>> {
///         let module = ctx.compile_shader("scale", SHADER_SOURCE, &ctx.shader_defines())?;
///         Ok(Box::new(ScaleDispatch { module, params: ctx.params().clone() }))
///     }
/// }
/// ```
pub trait Operator: Send + Sync {
    /// Get the operator name (e.g., "conv1d").
    fn name(&self) -> &str;

    /// Names of the shape parameters this operator must be specialized with.
    fn shape_params(&self) -> Vec<&str>;

    /// Check that `params` selects a specialization this operator provides.
    ///
    /// The default accepts exactly the names listed by `shape_params()`.
    /// Operators with range limits should call this first and add their own
    /// checks.
    fn validate_params(&self, params: &ShapeParams) -> Result<()> {
        check_param_names(self.name(), &self.shape_params(), params)
    }

    /// Compile a dispatch object for the parameters held by `ctx`.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Compile context with the shape parameters, execution target
    ///   and shader compilation.
    ///
    /// # Returns
    ///
    /// A boxed dispatch object bound to the parameters in `ctx`.
    fn create_dispatch(
        &self,
        ctx: &mut crate::compile_ctx::CompileCtx,
    ) -> Result<Box<dyn crate::dispatch::OpDispatch>>;
}

/// Check that `params` holds exactly the parameter names in `expected`.
pub fn check_param_names(operator: &str, expected: &[&str], params: &ShapeParams) -> Result<()> {
    if let Some(missing) = expected.iter().find(|name| params.get(name).is_none()) {
        return Err(Error::KernelResolution(format!(
            "Operator '{operator}' requires shape parameter '{missing}', got {params}"
        )));
    }

    if let Some(extra) = params.names().find(|name| !expected.contains(name)) {
        return Err(Error::KernelResolution(format!(
            "Operator '{operator}' has no shape parameter '{extra}' (expected {expected:?})"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock operator for testing
    struct MockOp;

    impl Operator for MockOp {
        fn name(&self) -> &str {
            "Mock"
        }

        fn shape_params(&self) -> Vec<&str> {
            vec!["input_size", "conv_size"]
        }

        fn create_dispatch(
            &self,
            _ctx: &mut crate::compile_ctx::CompileCtx,
        ) -> Result<Box<dyn crate::dispatch::OpDispatch>> {
            Err(Error::KernelResolution("not implemented".to_string()))
        }
    }

    #[test]
    fn test_operator_trait_object() {
        let op: Box<dyn Operator> = Box::new(MockOp);
        assert_eq!(op.name(), "Mock");
    }

    #[test]
    fn test_default_validate_params() {
        let op = MockOp;

        let exact = ShapeParams::new().with("input_size", 5).with("conv_size", 3);
        assert!(op.validate_params(&exact).is_ok());

        let missing = ShapeParams::new().with("input_size", 5);
        let err = op.validate_params(&missing).unwrap_err();
        assert!(matches!(err, Error::KernelResolution(_)));
        assert!(err.to_string().contains("conv_size"));

        let extra = exact.clone().with("stride", 2);
        let err = op.validate_params(&extra).unwrap_err();
        assert!(err.to_string().contains("stride"));
    }
}
