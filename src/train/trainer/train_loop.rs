//! Multi-epoch training loops

use super::core::{Learner, DEFAULT_LR};
use super::lr_find::LrFindConfig;
use super::result::TrainResult;
use crate::optim::{FlatCosLR, LRScheduler, OneCycleLR, SgdrLR};
use crate::train::callback::CallbackAction;
use crate::train::Strategy;
use crate::error::Result;
use std::time::Instant;

/// Knobs forwarded to the fitting routine a [`Strategy`] selects
#[derive(Debug, Clone, PartialEq)]
pub struct TuneOptions {
    /// Warm-up fraction for one-cycle, flat fraction for cosine annealing
    pub pct_start: Option<f32>,
    /// Epochs in the first warm-restart cycle
    pub cycle_len: usize,
    /// Growth factor of each warm-restart cycle
    pub cycle_mult: usize,
    /// Search used when no learning rate is given
    pub lr_find: LrFindConfig,
}

impl Default for TuneOptions {
    fn default() -> Self {
        Self { pct_start: None, cycle_len: 1, cycle_mult: 2, lr_find: LrFindConfig::default() }
    }
}

impl Learner {
    /// Train for `max_epochs` epochs under `scheduler`, validating after each
    ///
    /// Validation runs whenever the validation loader yields batches; its loss
    /// is handed to `on_epoch_end` so callbacks such as early stopping can
    /// monitor it.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use afinar::train::{Learner, EarlyStopping};
    /// # use afinar::optim::FlatCosLR;
    /// # fn run(mut learner: Learner) -> afinar::Result<()> {
    /// learner.add_callback(EarlyStopping::new(5, 0.001));
    /// let steps = 10 * learner.dls().train().len();
    /// let result = learner.fit_with_schedule(10, &mut FlatCosLR::new(1e-3, steps))?;
    /// println!("Trained {} epochs, final loss: {:.4}", result.final_epoch, result.final_loss);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Propagates the first batch, forward, backward or optimizer error.
    pub fn fit_with_schedule(&mut self, max_epochs: usize, scheduler: &mut dyn LRScheduler) -> Result<TrainResult> {
        let start = Instant::now();
        self.start_time = Some(start);
        self.best_loss = None;
        self.max_epochs = max_epochs;
        self.epoch = 0;
        self.recorder.reset_smoothing();

        let result = self.run_epochs(max_epochs, scheduler);
        self.set_training(false);
        let (final_epoch, final_loss, valid_loss, stopped_early) = result?;

        let ctx = self.build_context(0, 0, final_loss, valid_loss);
        self.callbacks.on_train_end(&ctx);

        Ok(TrainResult {
            final_epoch,
            final_loss,
            best_loss: self.best_loss.unwrap_or(final_loss),
            valid_loss,
            stopped_early,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    fn run_epochs(
        &mut self,
        max_epochs: usize,
        scheduler: &mut dyn LRScheduler,
    ) -> Result<(usize, f32, Option<f32>, bool)> {
        let mut final_loss = 0.0;
        let mut valid_loss = None;
        let mut completed = 0;

        let ctx = self.build_context(0, 0, 0.0, None);
        if self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop {
            return Ok((0, 0.0, None, true));
        }

        for epoch in 0..max_epochs {
            self.epoch = epoch;
            let ctx = self.build_context(0, 0, final_loss, valid_loss);
            match self.callbacks.on_epoch_begin(&ctx) {
                CallbackAction::Stop => return Ok((completed, final_loss, valid_loss, true)),
                CallbackAction::SkipEpoch => continue,
                CallbackAction::Continue | CallbackAction::CancelStep => {}
            }

            let summary = self.train_epoch(scheduler)?;
            if summary.stopped {
                return Ok((completed, final_loss, valid_loss, true));
            }
            final_loss = summary.loss;

            let validation = if self.dls.valid().is_empty() { None } else { Some(self.validate()?) };
            valid_loss = validation.as_ref().and_then(|v| v.loss);
            let monitored = valid_loss.unwrap_or(final_loss);
            if self.best_loss.map_or(true, |best| monitored < best) {
                self.best_loss = Some(monitored);
            }
            self.recorder.record_epoch(
                final_loss,
                valid_loss,
                validation.map(|v| v.metrics).unwrap_or_default(),
            );
            completed = epoch + 1;

            let ctx = self.build_context(summary.steps, summary.steps, final_loss, valid_loss);
            if self.callbacks.on_epoch_end(&ctx) == CallbackAction::Stop {
                return Ok((completed, final_loss, valid_loss, true));
            }
        }
        Ok((completed, final_loss, valid_loss, false))
    }

    /// Fit with the one-cycle policy peaking at `lr` (default [`DEFAULT_LR`])
    ///
    /// # Errors
    /// See [`Learner::fit_with_schedule`].
    pub fn fit_one_cycle(&mut self, epochs: usize, lr: Option<f32>) -> Result<TrainResult> {
        self.fit_one_cycle_with(epochs, lr, None)
    }

    fn fit_one_cycle_with(&mut self, epochs: usize, lr: Option<f32>, pct_start: Option<f32>) -> Result<TrainResult> {
        let total = epochs * self.dls.train().len();
        let mut sched = OneCycleLR::new(lr.unwrap_or(DEFAULT_LR), total);
        if let Some(pct) = pct_start {
            sched = sched.with_pct_start(pct);
        }
        self.fit_with_schedule(epochs, &mut sched)
    }

    /// Fit at a flat `lr`, annealing with a cosine over the final quarter
    ///
    /// # Errors
    /// See [`Learner::fit_with_schedule`].
    pub fn fit_flat_cos(&mut self, epochs: usize, lr: Option<f32>) -> Result<TrainResult> {
        self.fit_flat_cos_with(epochs, lr, None)
    }

    fn fit_flat_cos_with(&mut self, epochs: usize, lr: Option<f32>, pct_start: Option<f32>) -> Result<TrainResult> {
        let total = epochs * self.dls.train().len();
        let mut sched = FlatCosLR::new(lr.unwrap_or(DEFAULT_LR), total);
        if let Some(pct) = pct_start {
            sched = sched.with_pct_start(pct);
        }
        self.fit_with_schedule(epochs, &mut sched)
    }

    /// Fit `n_cycles` cosine cycles with warm restarts
    ///
    /// The first cycle lasts `cycle_len` epochs and each following one
    /// `cycle_mult` times longer.
    ///
    /// # Errors
    /// See [`Learner::fit_with_schedule`].
    pub fn fit_sgdr(
        &mut self,
        n_cycles: usize,
        cycle_len: usize,
        cycle_mult: usize,
        lr: Option<f32>,
    ) -> Result<TrainResult> {
        let mut sched = SgdrLR::new(lr.unwrap_or(DEFAULT_LR), self.dls.train().len(), n_cycles)
            .with_cycles(cycle_len, cycle_mult);
        let epochs = sched.total_epochs();
        self.fit_with_schedule(epochs, &mut sched)
    }

    /// Dispatch to the fitting routine `strategy` names
    ///
    /// For [`Strategy::Sgdr`] `epochs` is the number of cycles.
    ///
    /// # Errors
    /// See [`Learner::fit_with_schedule`].
    pub fn fit_strategy(
        &mut self,
        strategy: Strategy,
        epochs: usize,
        lr: Option<f32>,
        options: &TuneOptions,
    ) -> Result<TrainResult> {
        match strategy {
            Strategy::OneCycle => self.fit_one_cycle_with(epochs, lr, options.pct_start),
            Strategy::CosineAnnealing => self.fit_flat_cos_with(epochs, lr, options.pct_start),
            Strategy::Sgdr => self.fit_sgdr(epochs, options.cycle_len, options.cycle_mult, lr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::callback::{CallbackContext, EarlyStopping, TrainerCallback};
    use crate::error::Error;
    use crate::train::test_support::{failing_learner, learner};
    use crate::train::Accuracy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_one_cycle_reduces_loss() {
        let mut learner = learner().with_metric(Accuracy::default());
        let result = learner.fit_one_cycle(8, Some(0.5)).unwrap();

        assert_eq!(result.final_epoch, 8);
        assert!(!result.stopped_early);
        let losses = learner.recorder().train_losses();
        assert!(losses.last().unwrap() < &losses[0]);
        assert!(result.valid_loss.is_some());
        assert_eq!(learner.recorder().metrics()[7][0].0, "Accuracy");
        assert_eq!(learner.recorder().steps(), 32);
    }

    #[test]
    fn test_flat_cos_keeps_lr_flat_then_anneals() {
        let mut learner = learner();
        learner.fit_flat_cos(2, Some(0.1)).unwrap();
        let lrs = learner.recorder().lrs();
        assert_eq!(lrs.len(), 8);
        assert!(lrs[..6].iter().all(|&lr| (lr - 0.1).abs() < 1e-7));
        assert!(lrs[7] < 0.1);
    }

    #[test]
    fn test_sgdr_runs_all_cycle_epochs() {
        let mut learner = learner();
        let result = learner.fit_sgdr(2, 1, 2, Some(0.1)).unwrap();
        // 1 + 2 epochs
        assert_eq!(result.final_epoch, 3);
        let lrs = learner.recorder().lrs();
        // restart after the first epoch of 4 steps
        assert!((lrs[4] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_fit_strategy_dispatch() {
        let mut learner = learner();
        let opts = TuneOptions { pct_start: Some(0.5), ..Default::default() };
        let result = learner.fit_strategy(Strategy::CosineAnnealing, 1, Some(0.1), &opts).unwrap();
        assert_eq!(result.final_epoch, 1);
        assert!((learner.recorder().lrs()[1] - 0.1).abs() < 1e-7);
        assert!(learner.recorder().lrs()[3] < 0.1);
    }

    #[test]
    fn test_early_stopping_stops_fit() {
        let mut learner = learner();
        learner.add_callback(EarlyStopping::new(1, 10.0).monitor_validation());
        let result = learner.fit_one_cycle(10, Some(0.1)).unwrap();
        assert!(result.stopped_early);
        assert_eq!(result.final_epoch, 2);
    }

    #[test]
    fn test_stop_at_train_begin() {
        struct StopAtBegin;
        impl TrainerCallback for StopAtBegin {
            fn on_train_begin(&mut self, _: &CallbackContext) -> CallbackAction {
                CallbackAction::Stop
            }
        }

        let mut learner = learner();
        learner.add_callback(StopAtBegin);
        let result = learner.fit_one_cycle(3, None).unwrap();
        assert!(result.stopped_early);
        assert_eq!(result.final_epoch, 0);
        assert_eq!(learner.recorder().steps(), 0);
    }

    #[test]
    fn test_skip_epoch() {
        struct SkipFirst;
        impl TrainerCallback for SkipFirst {
            fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
                if ctx.epoch == 0 {
                    CallbackAction::SkipEpoch
                } else {
                    CallbackAction::Continue
                }
            }
        }

        let mut learner = learner();
        learner.add_callback(SkipFirst);
        learner.fit_one_cycle(2, Some(0.1)).unwrap();
        assert_eq!(learner.recorder().epochs(), 1);
        assert_eq!(learner.recorder().steps(), 4);
    }

    #[test]
    fn test_train_end_fires_once() {
        struct CountEnd(Arc<AtomicUsize>);
        impl TrainerCallback for CountEnd {
            fn on_train_end(&mut self, _: &CallbackContext) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let count = Arc::new(AtomicUsize::new(0));
        let mut learner = learner();
        learner.add_callback(CountEnd(count.clone()));
        learner.fit_one_cycle(2, None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_optimizer_failure_stops_fit() {
        struct CountEvents {
            epochs: Arc<AtomicUsize>,
            ends: Arc<AtomicUsize>,
        }
        impl TrainerCallback for CountEvents {
            fn on_epoch_begin(&mut self, _: &CallbackContext) -> CallbackAction {
                self.epochs.fetch_add(1, Ordering::SeqCst);
                CallbackAction::Continue
            }
            fn on_train_end(&mut self, _: &CallbackContext) {
                self.ends.fetch_add(1, Ordering::SeqCst);
            }
        }

        let epochs = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let mut learner = failing_learner();
        learner.add_callback(CountEvents { epochs: epochs.clone(), ends: ends.clone() });

        let err = learner.fit_one_cycle(3, Some(0.1)).unwrap_err();
        assert!(matches!(err, Error::Step(_)));
        assert_eq!(epochs.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 0);
        assert_eq!(learner.recorder().steps(), 0);
        assert_eq!(learner.recorder().epochs(), 0);
        assert_eq!(learner.global_step(), 0);
    }
}
