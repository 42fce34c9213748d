//! Callback manager for dispatching events to multiple callbacks

use super::traits::{CallbackAction, CallbackContext, TrainerCallback};

/// Manages multiple callbacks and dispatches events
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    /// Create new callback manager
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a callback
    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Add an already boxed callback
    pub fn add_boxed(&mut self, callback: Box<dyn TrainerCallback>) {
        self.callbacks.push(callback);
    }

    /// Get number of callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Drop every callback registered after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.callbacks.truncate(len);
    }

    /// Names of the registered callbacks, in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    /// Fire train begin event
    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_train_begin(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire train end event
    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    /// Fire epoch begin event
    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            match cb.on_epoch_begin(ctx) {
                CallbackAction::Stop => return CallbackAction::Stop,
                CallbackAction::SkipEpoch => return CallbackAction::SkipEpoch,
                CallbackAction::Continue | CallbackAction::CancelStep => {}
            }
        }
        CallbackAction::Continue
    }

    /// Fire epoch end event
    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_epoch_end(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire step begin event
    pub fn on_step_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_step_begin(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire step end event
    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_step_end(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }

    /// Fire after-prediction event
    pub fn after_pred(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.after_pred(ctx);
        }
    }

    /// Fire after-loss event
    pub fn after_loss(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.after_loss(ctx);
        }
    }

    /// Fire before-backward event
    pub fn before_backward(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.before_backward(ctx);
        }
    }

    /// Fire before-step event
    ///
    /// Returns `CancelStep` as soon as one callback cancels the step.
    pub fn before_step(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.before_step(ctx) == CallbackAction::CancelStep {
                return CallbackAction::CancelStep;
            }
        }
        CallbackAction::Continue
    }

    /// Fire cancelled-step event
    pub fn after_cancel_step(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.after_cancel_step(ctx);
        }
    }

    /// Fire after-step event
    pub fn after_step(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.after_step(ctx);
        }
    }

    /// Fire validation event
    pub fn on_validation(&mut self, ctx: &CallbackContext) -> CallbackAction {
        for cb in &mut self.callbacks {
            if cb.on_validation(ctx) == CallbackAction::Stop {
                return CallbackAction::Stop;
            }
        }
        CallbackAction::Continue
    }
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackManager").field("callbacks", &self.names()).finish()
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}
