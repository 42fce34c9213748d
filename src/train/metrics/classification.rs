//! Classification accuracy

use super::Metric;
use crate::error::{Error, Result};
use crate::Tensor;

/// Accuracy metric for classification
///
/// For `[N, C]` logits: fraction of rows where `argmax(row) == target`.
/// For 1-D scores: a score at or above `threshold` predicts class 1.
/// Targets hold `N` class ids in any shape; negative ids are skipped.
///
/// # Example
///
/// ```
/// use afinar::train::{Accuracy, Metric};
/// use afinar::Tensor;
///
/// let logits = Tensor::from_vec(vec![0.9, 0.1, 0.2, 0.8], &[2, 2]).unwrap();
/// let target = Tensor::from_vec(vec![0.0, 1.0], &[2]).unwrap();
///
/// assert_eq!(Accuracy::default().compute(&logits, &target).unwrap(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Accuracy {
    /// Threshold for binary classification
    pub(crate) threshold: f32,
}

impl Accuracy {
    /// Create new accuracy metric with given threshold for binary classification
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for Accuracy {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Metric for Accuracy {
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> Result<f32> {
        let predicted: Vec<usize> = if predictions.data().ndim() <= 1 {
            predictions.data().iter().map(|&p| usize::from(p >= self.threshold)).collect()
        } else {
            predictions.argmax_rows()
        };
        if predicted.len() != targets.numel() {
            return Err(Error::ShapeMismatch {
                field: "targets".into(),
                expected: vec![predicted.len()],
                actual: targets.shape().to_vec(),
            });
        }

        let (correct, total) = predicted
            .iter()
            .zip(targets.data().iter())
            .filter(|&(_, &t)| t >= 0.0)
            .fold((0usize, 0usize), |(c, n), (&p, &t)| (c + usize::from(p == t.round() as usize), n + 1));

        Ok(if total == 0 { 0.0 } else { correct as f32 / total as f32 })
    }

    fn name(&self) -> &str {
        "Accuracy"
    }
}
