//! Core Metric trait definition

use crate::error::Result;
use crate::Tensor;

/// Trait for evaluation metrics
pub trait Metric: Send + Sync {
    /// Compute the metric given predictions and targets
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when targets do not line up with predictions.
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> Result<f32>;

    /// Name of the metric
    fn name(&self) -> &str;

    /// Whether higher values are better (true) or lower (false)
    fn higher_is_better(&self) -> bool {
        true
    }
}
