//! Early stopping callback to halt fitting when the monitored loss plateaus

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Quantity watched by [`EarlyStopping`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Monitor {
    /// Epoch-average training loss
    #[default]
    TrainLoss,
    /// Validation loss, falling back to the training loss when absent
    ValidLoss,
}

/// Stops fitting after `patience` epochs without an improvement of at least
/// `min_delta` in the monitored loss
///
/// State is reset at the start of every fit, so the same callback can be
/// reused across `tune` calls.
///
/// # Example
///
/// ```rust
/// use afinar::train::callback::EarlyStopping;
///
/// // Stop if validation loss does not improve by 0.001 for 3 epochs
/// let early_stop = EarlyStopping::new(3, 0.001).monitor_validation();
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    monitor: Monitor,
    best_loss: f32,
    pub(crate) epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            monitor: Monitor::TrainLoss,
            best_loss: f32::INFINITY,
            epochs_without_improvement: 0,
        }
    }

    /// Watch the validation loss instead of the training loss
    pub fn monitor_validation(mut self) -> Self {
        self.monitor = Monitor::ValidLoss;
        self
    }

    pub fn monitor(&self) -> Monitor {
        self.monitor
    }

    /// Best monitored loss so far, if any epoch finished
    pub fn best(&self) -> Option<f32> {
        self.best_loss.is_finite().then_some(self.best_loss)
    }

    /// Reset internal state
    pub fn reset(&mut self) {
        self.best_loss = f32::INFINITY;
        self.epochs_without_improvement = 0;
    }

    fn monitored(&self, ctx: &CallbackContext) -> f32 {
        match self.monitor {
            Monitor::TrainLoss => ctx.loss,
            Monitor::ValidLoss => ctx.val_loss.unwrap_or(ctx.loss),
        }
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        self.reset();
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        let loss = self.monitored(ctx);
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
            return CallbackAction::Continue;
        }

        self.epochs_without_improvement += 1;
        if self.epochs_without_improvement >= self.patience {
            tracing::warn!(
                "Early stopping: no improvement for {} epochs (best loss: {:.4})",
                self.patience,
                self.best_loss
            );
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn name(&self) -> &'static str {
        "EarlyStopping"
    }
}
