//! Progress callback that logs fitting progress through `tracing`

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Logs epoch summaries, every `log_interval`-th step and cancelled steps
#[derive(Clone, Debug)]
pub struct ProgressCallback {
    log_interval: usize,
    cancelled_steps: usize,
}

impl ProgressCallback {
    /// Log every `log_interval` steps (0 disables step lines)
    pub fn new(log_interval: usize) -> Self {
        Self { log_interval, cancelled_steps: 0 }
    }

    /// Optimizer steps skipped by a callback since fitting began
    pub fn cancelled_steps(&self) -> usize {
        self.cancelled_steps
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TrainerCallback for ProgressCallback {
    fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.cancelled_steps = 0;
        tracing::info!(epochs = ctx.max_epochs, lr = ctx.lr, "Fitting started");
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        let val_str = ctx.val_loss.map(|v| format!(", valid_loss: {v:.4}")).unwrap_or_default();
        tracing::info!(
            "Epoch {}/{}: train_loss: {:.4}{} ({:.1}s)",
            ctx.epoch + 1,
            ctx.max_epochs,
            ctx.loss,
            val_str,
            ctx.elapsed_secs
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if self.log_interval > 0 && (ctx.step + 1) % self.log_interval == 0 {
            tracing::info!("Step {}/{}: loss: {:.4} lr: {:.2e}", ctx.step + 1, ctx.steps_per_epoch, ctx.loss, ctx.lr);
        }
        CallbackAction::Continue
    }

    fn after_cancel_step(&mut self, ctx: &CallbackContext) {
        self.cancelled_steps += 1;
        tracing::debug!(step = ctx.global_step, "Optimizer step cancelled");
    }

    fn on_train_end(&mut self, ctx: &CallbackContext) {
        tracing::info!(elapsed_secs = ctx.elapsed_secs, best_loss = ?ctx.best_loss, "Fitting finished");
    }

    fn name(&self) -> &'static str {
        "ProgressCallback"
    }
}
