//! Training result types

/// Result of a fit
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    /// Epochs completed
    pub final_epoch: usize,
    /// Mean training loss of the last completed epoch
    pub final_loss: f32,
    /// Best epoch loss (validation when available, else training)
    pub best_loss: f32,
    /// Validation loss of the last completed epoch
    pub valid_loss: Option<f32>,
    /// Whether a callback stopped the fit
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}

/// Outcome of one training epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// Mean loss over the batches that reported one
    pub loss: f32,
    /// Batches processed
    pub steps: usize,
    /// Whether a step callback asked to stop
    pub stopped: bool,
}

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    /// Example-weighted mean loss, `None` when no batch reported a loss
    pub loss: Option<f32>,
    /// Example-weighted metric values, as `(name, value)` pairs
    pub metrics: Vec<(String, f32)>,
    /// Batches evaluated
    pub num_batches: usize,
}

impl ValidationResult {
    /// Look up a metric by name
    pub fn metric(&self, name: &str) -> Option<f32> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_result_clone() {
        let result = TrainResult {
            final_epoch: 5,
            final_loss: 0.1,
            best_loss: 0.05,
            valid_loss: Some(0.07),
            stopped_early: false,
            elapsed_secs: 10.0,
        };
        let cloned = result.clone();
        assert_eq!(result, cloned);
    }

    #[test]
    fn test_validation_metric_lookup() {
        let result = ValidationResult {
            loss: Some(0.3),
            metrics: vec![("Accuracy".into(), 0.75)],
            num_batches: 2,
        };
        assert_eq!(result.metric("Accuracy"), Some(0.75));
        assert_eq!(result.metric("F1"), None);
    }
}
