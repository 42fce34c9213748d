//! Learning rate schedulers
//!
//! Provides learning rate scheduling strategies for training:
//! - `OneCycleLR` - Cosine warm-up to a peak, then cosine annealing
//! - `FlatCosLR` - Flat learning rate, then cosine annealing to zero
//! - `SgdrLR` - Cosine annealing with warm restarts of growing length
//! - `ExponentialLR` - Exponential sweep used by the learning-rate finder

mod exponential;
mod flat_cos;
mod one_cycle;
mod sgdr;

#[cfg(test)]
mod tests;

pub use exponential::ExponentialLR;
pub use flat_cos::FlatCosLR;
pub use one_cycle::OneCycleLR;
pub use sgdr::SgdrLR;

use super::Optimizer;
use std::f32::consts::PI;

/// Learning rate scheduler trait
///
/// Schedules are stepped once per optimizer step.
pub trait LRScheduler: Send {
    /// Get the current learning rate
    fn get_lr(&self) -> f32;

    /// Advance by one optimizer step
    fn step(&mut self);

    /// Apply the current learning rate to an optimizer
    fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
    }
}

/// Cosine interpolation from `start` (pos = 0) to `end` (pos = 1)
pub fn sched_cos(start: f32, end: f32, pos: f32) -> f32 {
    let pos = pos.clamp(0.0, 1.0);
    start + (1.0 + (PI * (1.0 - pos)).cos()) * (end - start) / 2.0
}

/// Fraction of a `total`-step schedule completed after `step` steps
pub(crate) fn progress(step: usize, total: usize) -> f32 {
    if total == 0 {
        1.0
    } else {
        (step as f32 / total as f32).min(1.0)
    }
}
