//! Optimizer trait

use crate::error::{Error, Result};
use crate::model::Parameter;

/// Trait for optimization algorithms
///
/// Parameters are borrowed from the model on every call, in the model's
/// declaration order; per-parameter state is kept by position.
pub trait Optimizer: Send {
    /// Update every parameter that carries a gradient
    ///
    /// # Errors
    /// Returns `Step` when a gradient does not match its parameter.
    fn step(&mut self, params: &mut [&mut Parameter]) -> Result<()>;

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [&mut Parameter]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);

    /// Forget accumulated state (momentum, moments, step count)
    fn reset(&mut self);

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Gradient of `param`, checked against the parameter's shape
pub(crate) fn checked_grad(param: &Parameter) -> Result<Option<&ndarray::ArrayD<f32>>> {
    match param.grad() {
        Some(grad) if grad.shape() != param.value().shape() => Err(Error::Step(format!(
            "gradient of '{}' has shape {:?}, parameter has {:?}",
            param.name(),
            grad.shape(),
            param.value().shape()
        ))),
        other => Ok(other),
    }
}
