//! Learning-rate search
//!
//! Sweeps the learning rate exponentially over a fixed number of training
//! batches while recording the smoothed loss, then suggests a value from the
//! resulting curve. The model weights and optimizer state are restored
//! afterwards so the search leaves no trace on the learner.

use super::core::Learner;
use crate::data::Batch;
use crate::error::{Error, Result};
use crate::optim::{ExponentialLR, LRScheduler};
use crate::train::Recorder;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// How a learning rate is picked from the search curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionMethod {
    /// Middle of the longest stretch over which the loss keeps falling
    #[default]
    Valley,
    /// A tenth of the learning rate at the lowest loss
    Minimum,
    /// Steepest descent of the loss against log learning rate
    Steep,
}

impl SuggestionMethod {
    /// Suggest a learning rate from a recorded sweep
    ///
    /// The first `num_it / 10` and the last five points are ignored as noise,
    /// unless that leaves too few points.
    ///
    /// # Errors
    /// Returns `Validation` when the curve is empty or its lengths differ.
    pub fn suggest(self, lrs: &[f32], losses: &[f32], num_it: usize) -> Result<f32> {
        if lrs.is_empty() || lrs.len() != losses.len() {
            return Err(Error::Validation(format!(
                "cannot suggest a learning rate from {} rates and {} losses",
                lrs.len(),
                losses.len()
            )));
        }
        let skip_start = num_it / 10;
        let (lrs, losses) = if lrs.len() > skip_start + 5 + 1 {
            let end = lrs.len() - 5;
            (&lrs[skip_start..end], &losses[skip_start..end])
        } else {
            (lrs, losses)
        };

        let lr = match self {
            Self::Minimum => lrs[argmin(losses)] / 10.0,
            Self::Steep => steepest(lrs, losses),
            Self::Valley => lrs[valley(losses)],
        };
        Ok(lr)
    }
}

/// Sweep parameters for [`Learner::lr_find`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrFindConfig {
    pub start_lr: f32,
    pub end_lr: f32,
    /// Training batches in the sweep (the train loader is cycled as needed)
    pub num_it: usize,
    /// Stop once the smoothed loss exceeds four times its best value
    pub stop_div: bool,
    pub suggestion: SuggestionMethod,
}

impl Default for LrFindConfig {
    fn default() -> Self {
        Self { start_lr: 1e-7, end_lr: 10.0, num_it: 100, stop_div: true, suggestion: SuggestionMethod::Valley }
    }
}

impl LrFindConfig {
    fn validate(&self) -> Result<()> {
        if !(self.start_lr > 0.0 && self.end_lr > self.start_lr) {
            return Err(Error::config(
                "lr_find",
                format!("needs 0 < start_lr < end_lr, got {} and {}", self.start_lr, self.end_lr),
            ));
        }
        if self.num_it == 0 {
            return Err(Error::config("lr_find.num_it", "must be at least 1"));
        }
        Ok(())
    }
}

/// Recorded sweep and the suggested learning rate
#[derive(Debug, Clone, PartialEq)]
pub struct LrFindResult {
    pub lrs: Vec<f32>,
    /// Smoothed losses, one per entry of `lrs`
    pub losses: Vec<f32>,
    pub suggestion: f32,
    pub method: SuggestionMethod,
}

impl Learner {
    /// Search for a learning rate
    ///
    /// # Errors
    /// Returns `Config` for an invalid sweep, `Validation` when the training
    /// loader is empty, `Model` when training batches yield no loss, and any
    /// error the training steps raise. Weights and optimizer state are
    /// restored in every case.
    pub fn lr_find(&mut self, config: &LrFindConfig) -> Result<LrFindResult> {
        config.validate()?;
        let snapshot: Vec<ArrayD<f32>> = self.model.parameters().iter().map(|p| p.value().clone()).collect();
        let base_lr = self.lr();
        let was_training = self.training;
        let global_step = self.global_step;

        let sweep = self.lr_sweep(config);

        for (param, value) in self.model.parameters_mut().into_iter().zip(snapshot) {
            *param.value_mut() = value;
            param.zero_grad();
        }
        self.optimizer.reset();
        self.optimizer.set_lr(base_lr);
        self.set_training(was_training);
        self.global_step = global_step;

        let (lrs, losses) = sweep?;
        let suggestion = config.suggestion.suggest(&lrs, &losses, config.num_it)?;
        tracing::info!(
            "Learning-rate search over {} steps suggests {:.2e} ({:?})",
            lrs.len(),
            suggestion,
            config.suggestion
        );
        Ok(LrFindResult { lrs, losses, suggestion, method: config.suggestion })
    }

    fn lr_sweep(&mut self, config: &LrFindConfig) -> Result<(Vec<f32>, Vec<f32>)> {
        if self.dls.train().is_empty() {
            return Err(Error::Validation("learning-rate search needs a non-empty training loader".into()));
        }
        self.optimizer.reset();
        self.set_training(true);
        let mut sched = ExponentialLR::new(config.start_lr, config.end_lr, config.num_it);
        let mut rec = Recorder::new();
        let mut best = f32::INFINITY;

        'sweep: loop {
            let batches: Vec<Batch> = self.dls.train().iter().collect::<Result<_>>()?;
            for batch in &batches {
                sched.apply(self.optimizer.as_mut());
                let lr = self.lr();
                let loss = self.one_batch(batch)?.loss.ok_or_else(|| {
                    Error::Model("learning-rate search needs training batches that yield a loss".into())
                })?;
                sched.step();

                let smoothed = rec.record_step(lr, loss);
                best = best.min(smoothed);
                if rec.steps() >= config.num_it {
                    break 'sweep;
                }
                if config.stop_div && (!smoothed.is_finite() || smoothed > 4.0 * best) {
                    tracing::debug!("Learning-rate search diverged at lr {:.2e}", lr);
                    break 'sweep;
                }
            }
        }
        Ok((rec.lrs().to_vec(), rec.smooth_losses().to_vec()))
    }
}

fn argmin(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::INFINITY), |(bi, bv), (i, &v)| if v < bv { (i, v) } else { (bi, bv) })
        .0
}

fn steepest(lrs: &[f32], losses: &[f32]) -> f32 {
    if lrs.len() < 2 {
        return lrs[0];
    }
    let slopes: Vec<f32> = lrs
        .windows(2)
        .zip(losses.windows(2))
        .map(|(lr, loss)| (loss[1] - loss[0]) / (lr[1].ln() - lr[0].ln()))
        .collect();
    lrs[argmin(&slopes)]
}

/// Index a third and a half into the longest decreasing subsequence
fn valley(losses: &[f32]) -> usize {
    let n = losses.len();
    let mut run = vec![1usize; n];
    let mut max_end = 0;
    for i in 1..n {
        for j in 0..i {
            if losses[i] < losses[j] && run[i] < run[j] + 1 {
                run[i] = run[j] + 1;
            }
        }
        if run[i] > run[max_end] {
            max_end = i;
        }
    }
    let max_start = max_end + 1 - run[max_end];
    let section = (max_end - max_start) / 3;
    (max_start + section + section / 2).min(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::test_support::learner;

    fn weights(learner: &Learner) -> Vec<f32> {
        learner.model().parameters().iter().flat_map(|p| p.value().iter().copied()).collect()
    }

    #[test]
    fn test_lr_find_restores_state() {
        let mut learner = learner();
        let before = weights(&learner);

        let result = learner.lr_find(&LrFindConfig { num_it: 20, ..Default::default() }).unwrap();

        assert_eq!(weights(&learner), before);
        assert_eq!(learner.lr(), 0.1);
        assert_eq!(learner.global_step(), 0);
        assert_eq!(learner.recorder().steps(), 0);
        assert!(!result.lrs.is_empty() && result.lrs.len() <= 20);
        assert_eq!(result.lrs.len(), result.losses.len());
        assert!(result.suggestion > 0.0);
        assert!(result.lrs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_lr_find_cycles_the_loader() {
        // 4 batches per pass, 10 iterations without divergence stop
        let mut learner = learner();
        let config = LrFindConfig { num_it: 10, end_lr: 1e-3, stop_div: false, ..Default::default() };
        let result = learner.lr_find(&config).unwrap();
        assert_eq!(result.lrs.len(), 10);
        assert!((result.lrs[0] - 1e-7).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        let mut learner = learner();
        let config = LrFindConfig { start_lr: 1.0, end_lr: 0.1, ..Default::default() };
        assert!(matches!(learner.lr_find(&config), Err(Error::Config { .. })));
        let config = LrFindConfig { num_it: 0, ..Default::default() };
        assert!(matches!(learner.lr_find(&config), Err(Error::Config { .. })));
    }

    #[test]
    fn test_minimum_suggestion() {
        let lrs = [1e-4, 1e-3, 1e-2, 1e-1];
        let losses = [1.0, 0.5, 0.2, 0.9];
        let lr = SuggestionMethod::Minimum.suggest(&lrs, &losses, 0).unwrap();
        assert!((lr - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn test_steep_suggestion() {
        let lrs = [1e-4, 1e-3, 1e-2, 1e-1];
        let losses = [1.0, 0.9, 0.3, 0.2];
        let lr = SuggestionMethod::Steep.suggest(&lrs, &losses, 0).unwrap();
        assert!((lr - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn test_valley_picks_inside_longest_descent() {
        // longest descent 1.2 > 1.1 > ... > 0.5 spans indices 1..=8
        let losses = [1.0, 1.2, 1.1, 1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 2.0];
        assert_eq!(valley(&losses), 4);
    }

    #[test]
    fn test_valley_on_monotone_curve() {
        let losses: Vec<f32> = (0..10).map(|i| 10.0 - i as f32).collect();
        // run covers 0..=9: section 3, index 3 + 1
        assert_eq!(valley(&losses), 4);
    }

    #[test]
    fn test_suggest_rejects_empty() {
        assert!(SuggestionMethod::Valley.suggest(&[], &[], 100).is_err());
    }

    #[test]
    fn test_suggestion_method_serde() {
        let m: SuggestionMethod = serde_yaml::from_str("steep").unwrap();
        assert_eq!(m, SuggestionMethod::Steep);
    }
}
