//! Loss function trait

use crate::error::Result;
use crate::Tensor;
use ndarray::ArrayD;

/// Scalar loss with its gradient w.r.t. the predictions
#[derive(Debug, Clone, PartialEq)]
pub struct Loss {
    pub value: f32,
    /// Same shape as the predictions
    pub grad: ArrayD<f32>,
}

/// Trait for loss functions
pub trait LossFn: Send + Sync {
    /// Compute loss given predictions and targets
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when targets do not line up with predictions.
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Loss>;

    /// Name of the loss function
    fn name(&self) -> &str;
}
