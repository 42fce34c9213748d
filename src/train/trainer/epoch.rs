//! Epoch-level training and validation operations

use super::core::Learner;
use super::result::{EpochSummary, ValidationResult};
use crate::data::Batch;
use crate::error::Result;
use crate::optim::LRScheduler;
use crate::train::callback::CallbackAction;
use crate::Tensor;

impl Learner {
    /// Train for one pass over the training loader
    ///
    /// The scheduler sets the learning rate before every step and advances
    /// after it. Step callbacks may stop the epoch early.
    ///
    /// # Errors
    /// Propagates collation and [`Learner::one_batch`] errors.
    pub fn train_epoch(&mut self, scheduler: &mut dyn LRScheduler) -> Result<EpochSummary> {
        self.set_training(true);
        let batches: Vec<Batch> = self.dls.train().iter().collect::<Result<_>>()?;
        let steps_per_epoch = batches.len();

        let mut total_loss = 0.0;
        let mut num_losses = 0;
        let mut last_loss = 0.0;
        let mut steps = 0;
        let mut stopped = false;

        for (step, batch) in batches.iter().enumerate() {
            scheduler.apply(self.optimizer.as_mut());

            let ctx = self.build_context(step, steps_per_epoch, last_loss, None);
            if self.callbacks.on_step_begin(&ctx) == CallbackAction::Stop {
                stopped = true;
                break;
            }

            let out = self.one_batch(batch)?;
            let lr = self.lr();
            scheduler.step();
            steps += 1;

            if let Some(loss) = out.loss {
                total_loss += loss;
                num_losses += 1;
                last_loss = loss;
                self.recorder.record_step(lr, loss);
            }

            let ctx = self.build_context(step, steps_per_epoch, last_loss, None);
            if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                stopped = true;
                break;
            }
        }

        let loss = if num_losses > 0 { total_loss / num_losses as f32 } else { 0.0 };
        Ok(EpochSummary { loss, steps, stopped })
    }

    /// Evaluate on the validation loader without updating parameters
    ///
    /// Loss and metrics are averaged over examples, so a short final batch
    /// counts for what it holds. Fires `on_validation` when a loss was computed.
    ///
    /// # Errors
    /// Propagates collation, forward and metric errors.
    pub fn validate(&mut self) -> Result<ValidationResult> {
        let was_training = self.training;
        self.set_training(false);
        let batches: Vec<Batch> = self.dls.valid().iter().collect::<Result<_>>()?;

        let mut loss_sum = 0.0;
        let mut loss_weight = 0usize;
        let mut metric_sums = vec![0.0f32; self.metrics.len()];
        let mut metric_weight = 0usize;

        for batch in &batches {
            let out = self.one_batch(batch)?;
            let n = batch.len();
            if let Some(loss) = out.loss {
                loss_sum += loss * n as f32;
                loss_weight += n;
            }
            if let (Some(logits), false) = (&out.logits, out.targets.is_empty()) {
                let targets = metric_targets(&out.targets)?;
                for (sum, metric) in metric_sums.iter_mut().zip(&self.metrics) {
                    *sum += metric.compute(logits, &targets)? * n as f32;
                }
                metric_weight += n;
            }
        }
        self.set_training(was_training);

        let loss = (loss_weight > 0).then(|| loss_sum / loss_weight as f32);
        let metrics = if metric_weight > 0 {
            self.metrics
                .iter()
                .zip(metric_sums)
                .map(|(m, sum)| (m.name().to_string(), sum / metric_weight as f32))
                .collect()
        } else {
            Vec::new()
        };

        if let Some(val_loss) = loss {
            let ctx = self.build_context(0, 0, val_loss, Some(val_loss));
            self.callbacks.on_validation(&ctx);
        }
        Ok(ValidationResult { loss, metrics, num_batches: batches.len() })
    }
}

/// A single label key is compared directly; several stay stacked
fn metric_targets(targets: &Tensor) -> Result<Tensor> {
    if targets.len() == 1 {
        targets.row(0)
    } else {
        Ok(targets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::{FlatCosLR, OneCycleLR};
    use crate::train::callback::{CallbackContext, TrainerCallback};
    use crate::train::test_support::{learner, toy_dls_with};
    use crate::train::Accuracy;
    use crate::model::LinearClassifier;
    use crate::optim::SGD;

    #[test]
    fn test_train_epoch_records_every_step() {
        let mut learner = learner();
        let mut sched = FlatCosLR::new(0.1, 4);
        let summary = learner.train_epoch(&mut sched).unwrap();

        assert_eq!(summary.steps, 4);
        assert!(!summary.stopped);
        assert!(summary.loss > 0.0);
        assert_eq!(learner.recorder().steps(), 4);
        assert_eq!(learner.recorder().lrs()[0], 0.1);
        assert_eq!(learner.global_step(), 4);
    }

    #[test]
    fn test_scheduler_drives_learning_rate() {
        let mut learner = learner();
        let mut sched = OneCycleLR::new(0.1, 4);
        learner.train_epoch(&mut sched).unwrap();
        let lrs = learner.recorder().lrs();
        // warm-up starts at lr_max / 25
        assert!((lrs[0] - 0.004).abs() < 1e-6);
        assert!(lrs[1] > lrs[0]);
    }

    #[test]
    fn test_step_end_stop_ends_epoch() {
        struct StopAfterFirst;
        impl TrainerCallback for StopAfterFirst {
            fn on_step_end(&mut self, _: &CallbackContext) -> CallbackAction {
                CallbackAction::Stop
            }
        }

        let mut learner = learner();
        learner.add_callback(StopAfterFirst);
        let summary = learner.train_epoch(&mut FlatCosLR::new(0.1, 4)).unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.steps, 1);
    }

    #[test]
    fn test_validate_does_not_update_params() {
        let mut learner = learner().with_metric(Accuracy::default());
        let before: Vec<f32> =
            learner.model().parameters().iter().flat_map(|p| p.value().iter().copied()).collect();

        let result = learner.validate().unwrap();

        let after: Vec<f32> =
            learner.model().parameters().iter().flat_map(|p| p.value().iter().copied()).collect();
        assert_eq!(before, after);
        assert_eq!(result.num_batches, 2);
        assert!(result.loss.unwrap() > 0.0);
        let acc = result.metric("Accuracy").unwrap();
        assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn test_validate_weights_short_batches() {
        // 5 rows in batches of 4: weights 4 and 1
        let dls = toy_dls_with(4, 5, true);
        let mut learner = Learner::new(dls, Box::new(LinearClassifier::new(2, 2, 0)), Box::new(SGD::new(0.1, 0.0)));
        let result = learner.validate().unwrap();

        let mut batch_losses = Vec::new();
        for batch in learner.dls().valid().iter().collect::<Result<Vec<_>>>().unwrap() {
            batch_losses.push((learner.one_batch(&batch).unwrap().loss.unwrap(), batch.len()));
        }
        let expected = (batch_losses[0].0 * 4.0 + batch_losses[1].0) / 5.0;
        assert!((result.loss.unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_validate_without_labels_has_no_loss() {
        let dls = toy_dls_with(4, 4, false);
        let mut learner = Learner::new(dls, Box::new(LinearClassifier::new(2, 2, 0)), Box::new(SGD::new(0.1, 0.0)))
            .with_metric(Accuracy::default());
        let result = learner.validate().unwrap();
        assert_eq!(result.loss, None);
        assert!(result.metrics.is_empty());
        assert_eq!(result.num_batches, 1);
    }
}
