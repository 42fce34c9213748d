//! Core Learner struct and basic methods

use crate::data::AdaptiveDataLoaders;
use crate::model::PretrainedModel;
use crate::optim::Optimizer;
use crate::train::callback::{CallbackContext, CallbackManager, TrainerCallback};
use crate::train::{LossFn, Metric, Recorder};
use std::time::Instant;

/// Learning rate used when a fit is given none
pub const DEFAULT_LR: f32 = 1e-3;

/// Binds loaders, a model, an optimizer and callbacks into a fitting loop
///
/// Each batch goes through `split → move to device → forward → loss →
/// backward → step` (see [`Learner::one_batch`]).
///
/// # Example
///
/// ```no_run
/// use afinar::data::AdaptiveDataLoaders;
/// use afinar::model::LinearClassifier;
/// use afinar::optim::AdamW;
/// use afinar::train::{EarlyStopping, Learner, Accuracy};
///
/// # fn run(dls: AdaptiveDataLoaders) -> afinar::Result<()> {
/// let mut learner = Learner::new(
///     dls,
///     Box::new(LinearClassifier::new(16, 2, 0)),
///     Box::new(AdamW::default_params(1e-3)),
/// )
/// .with_metric(Accuracy::default());
/// learner.add_callback(EarlyStopping::new(2, 0.001).monitor_validation());
///
/// let result = learner.fit_one_cycle(3, Some(1e-2))?;
/// println!("best loss: {:.4}", result.best_loss);
/// # Ok(())
/// # }
/// ```
pub struct Learner {
    pub(crate) dls: AdaptiveDataLoaders,

    pub(crate) model: Box<dyn PretrainedModel>,

    pub(crate) optimizer: Box<dyn Optimizer>,

    /// Applied when the model reports no loss of its own
    pub(crate) loss_fn: Option<Box<dyn LossFn>>,

    pub(crate) metrics: Vec<Box<dyn Metric>>,

    pub(crate) callbacks: CallbackManager,

    pub(crate) recorder: Recorder,

    /// Batch fields stacked into the targets
    pub(crate) label_keys: Vec<String>,

    /// Whether the current pass updates parameters
    pub(crate) training: bool,

    pub(crate) epoch: usize,
    pub(crate) max_epochs: usize,
    pub(crate) global_step: usize,

    /// Best epoch loss of the current fit
    pub(crate) best_loss: Option<f32>,

    pub(crate) start_time: Option<Instant>,
}

impl Learner {
    /// Create a learner; label keys are taken from the loaders
    pub fn new(dls: AdaptiveDataLoaders, model: Box<dyn PretrainedModel>, optimizer: Box<dyn Optimizer>) -> Self {
        let label_keys = dls.label_keys().to_vec();
        Self {
            dls,
            model,
            optimizer,
            loss_fn: None,
            metrics: Vec::new(),
            callbacks: CallbackManager::new(),
            recorder: Recorder::new(),
            label_keys,
            training: false,
            epoch: 0,
            max_epochs: 0,
            global_step: 0,
            best_loss: None,
            start_time: None,
        }
    }

    /// Loss applied to the logits when the model reports none
    pub fn with_loss_fn(mut self, loss_fn: Box<dyn LossFn>) -> Self {
        self.loss_fn = Some(loss_fn);
        self
    }

    /// Add a validation metric
    pub fn with_metric<M: Metric + 'static>(mut self, metric: M) -> Self {
        self.metrics.push(Box::new(metric));
        self
    }

    /// Override the label keys taken from the loaders
    pub fn with_label_keys(mut self, label_keys: Vec<String>) -> Self {
        self.label_keys = label_keys;
        self
    }

    /// Add a callback to the learner
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    pub fn dls(&self) -> &AdaptiveDataLoaders {
        &self.dls
    }

    pub fn dls_mut(&mut self) -> &mut AdaptiveDataLoaders {
        &mut self.dls
    }

    pub fn model(&self) -> &dyn PretrainedModel {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn PretrainedModel {
        self.model.as_mut()
    }

    /// Replace the model, returning the previous one
    pub fn set_model(&mut self, model: Box<dyn PretrainedModel>) -> Box<dyn PretrainedModel> {
        std::mem::replace(&mut self.model, model)
    }

    pub fn loss_fn(&self) -> Option<&dyn LossFn> {
        self.loss_fn.as_deref()
    }

    pub fn metrics(&self) -> &[Box<dyn Metric>] {
        &self.metrics
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Get current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Set learning rate
    pub fn set_lr(&mut self, lr: f32) {
        self.optimizer.set_lr(lr);
    }

    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackManager {
        &mut self.callbacks
    }

    /// Optimizer steps taken over the learner's lifetime
    pub fn global_step(&self) -> usize {
        self.global_step
    }

    /// Switch the learner and model between training and evaluation
    pub(crate) fn set_training(&mut self, training: bool) {
        self.training = training;
        self.model.set_training(training);
    }

    /// Build callback context from current state
    pub(crate) fn build_context(&self, step: usize, steps_per_epoch: usize, loss: f32, val_loss: Option<f32>) -> CallbackContext {
        CallbackContext {
            epoch: self.epoch,
            max_epochs: self.max_epochs,
            step,
            steps_per_epoch,
            global_step: self.global_step,
            loss,
            lr: self.lr(),
            best_loss: self.best_loss,
            val_loss,
            training: self.training,
            elapsed_secs: self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64()),
        }
    }
}

impl std::fmt::Debug for Learner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Learner")
            .field("model", &self.model.name())
            .field("optimizer", &self.optimizer.name())
            .field("loss_fn", &self.loss_fn.as_ref().map(|l| l.name().to_string()))
            .field("label_keys", &self.label_keys)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::test_support::{learner, toy_dls};
    use crate::train::{Accuracy, CrossEntropyLoss, ProgressCallback};

    #[test]
    fn test_learner_creation() {
        let learner = learner();
        assert_eq!(learner.lr(), 0.1);
        assert_eq!(learner.label_keys(), &["labels".to_string()]);
        assert!(learner.loss_fn().is_none());
        assert!(learner.metrics().is_empty());
        assert_eq!(learner.model().name(), "LinearClassifier");
    }

    #[test]
    fn test_builders() {
        let mut learner = learner()
            .with_loss_fn(Box::new(CrossEntropyLoss))
            .with_metric(Accuracy::default())
            .with_label_keys(vec!["target".into()]);
        learner.add_callback(ProgressCallback::new(5));
        learner.set_lr(0.01);

        assert_eq!(learner.loss_fn().unwrap().name(), "CrossEntropy");
        assert_eq!(learner.metrics()[0].name(), "Accuracy");
        assert_eq!(learner.label_keys(), &["target".to_string()]);
        assert_eq!(learner.callbacks().len(), 1);
        assert_eq!(learner.lr(), 0.01);
        assert!(format!("{learner:?}").contains("LinearClassifier"));
    }

    #[test]
    fn test_set_model_swaps() {
        let mut learner = learner();
        let old = learner.set_model(Box::new(crate::model::LinearClassifier::new(2, 2, 42)));
        assert_eq!(old.name(), "LinearClassifier");
        assert_eq!(learner.dls().label_keys(), toy_dls().label_keys());
    }
}
