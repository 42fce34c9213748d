//! Mean Squared Error loss

use super::{Loss, LossFn};
use crate::error::{Error, Result};
use crate::Tensor;

/// Mean Squared Error Loss
///
/// L = mean((predictions - targets)^2)
///
/// Targets may have any shape with the same number of elements as the
/// predictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss;

impl LossFn for MSELoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Loss> {
        if predictions.numel() != targets.numel() {
            return Err(Error::ShapeMismatch {
                field: "targets".into(),
                expected: predictions.shape().to_vec(),
                actual: targets.shape().to_vec(),
            });
        }
        let targets = targets
            .data()
            .clone()
            .into_shape_with_order(predictions.shape())
            .map_err(|e| Error::Validation(format!("cannot reshape targets: {e}")))?;

        let diff = predictions.data() - &targets;
        let value = (&diff * &diff).mean().unwrap_or(0.0);

        // d(MSE)/d(pred) = 2 * (pred - target) / n
        let n = predictions.numel().max(1) as f32;
        let grad = diff * (2.0 / n);
        Ok(Loss { value, grad })
    }

    fn name(&self) -> &str {
        "MSE"
    }
}
