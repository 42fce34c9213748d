//! Cross Entropy Loss for classification

use super::{Loss, LossFn};
use crate::error::{Error, Result};
use crate::Tensor;
use ndarray::{Array1, ArrayView1, Axis, Ix2};

/// Target value excluded from the loss
pub const IGNORE_INDEX: i64 = -100;

/// Cross Entropy Loss over logits
///
/// Predictions are `[N, C]` logits (a 1-D tensor is one row), targets hold
/// `N` class ids in any shape. Rows whose target is negative, such as
/// [`IGNORE_INDEX`], do not contribute.
///
/// L = mean over kept rows of -log(softmax(logits)[target])
///
/// # Example
///
/// ```
/// use afinar::train::{CrossEntropyLoss, LossFn};
/// use afinar::Tensor;
///
/// let logits = Tensor::from_vec(vec![2.0, 1.0, 0.5], &[1, 3]).unwrap();
/// let targets = Tensor::from_vec(vec![0.0], &[1]).unwrap();
///
/// let loss = CrossEntropyLoss.forward(&logits, &targets).unwrap();
/// assert!(loss.value > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Compute softmax: exp(x_i) / sum(exp(x_j))
    pub(crate) fn softmax(x: ArrayView1<'_, f32>) -> Array1<f32> {
        let max = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_x: Array1<f32> = x.mapv(|v| (v - max).exp());
        let sum: f32 = exp_x.sum();
        exp_x / sum
    }
}

impl LossFn for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Loss> {
        let logits = match predictions.data().ndim() {
            1 => predictions.data().clone().insert_axis(Axis(0)),
            _ => predictions.data().clone(),
        };
        let logits = logits.into_dimensionality::<Ix2>().map_err(|_| Error::ShapeMismatch {
            field: "logits".into(),
            expected: vec![predictions.len(), 0],
            actual: predictions.shape().to_vec(),
        })?;
        let (rows, classes) = logits.dim();
        if targets.numel() != rows {
            return Err(Error::ShapeMismatch {
                field: "targets".into(),
                expected: vec![rows],
                actual: targets.shape().to_vec(),
            });
        }

        let mut grad = logits.clone();
        let mut total = 0.0;
        let mut kept = 0usize;
        for (i, &target) in targets.data().iter().enumerate() {
            let target = target.round() as i64;
            if target < 0 {
                grad.row_mut(i).fill(0.0);
                continue;
            }
            let class = usize::try_from(target).unwrap_or(usize::MAX);
            if class >= classes {
                return Err(Error::Validation(format!("target class {target} out of range for {classes} logits")));
            }
            let probs = Self::softmax(logits.row(i));
            total += -(probs[class] + 1e-10).max(f32::MIN_POSITIVE).ln();
            let mut row = grad.row_mut(i);
            row.assign(&probs);
            row[class] -= 1.0;
            kept += 1;
        }

        if kept > 0 {
            grad /= kept as f32;
        }
        let grad = grad
            .into_shape_with_order(predictions.shape())
            .map_err(|e| Error::Validation(format!("cannot reshape gradient: {e}")))?;
        let value = if kept == 0 { 0.0 } else { total / kept as f32 };
        Ok(Loss { value, grad })
    }

    fn name(&self) -> &str {
        "CrossEntropy"
    }
}
