//! Cosine annealing with warm restarts

use super::{sched_cos, LRScheduler};

/// SGDR schedule
///
/// Cycle `i` lasts `cycle_len * cycle_mult^i` epochs and anneals from `lr_max`
/// to zero; the learning rate jumps back to `lr_max` at every restart.
#[derive(Debug, Clone)]
pub struct SgdrLR {
    lr_max: f32,
    steps_per_epoch: usize,
    n_cycles: usize,
    cycle_len: usize,
    cycle_mult: usize,
    current_step: usize,
}

impl SgdrLR {
    /// Create an SGDR schedule with `cycle_len = 1` and `cycle_mult = 2`
    pub fn new(lr_max: f32, steps_per_epoch: usize, n_cycles: usize) -> Self {
        Self { lr_max, steps_per_epoch, n_cycles, cycle_len: 1, cycle_mult: 2, current_step: 0 }
    }

    /// Epochs in the first cycle and growth factor per cycle
    pub fn with_cycles(mut self, cycle_len: usize, cycle_mult: usize) -> Self {
        self.cycle_len = cycle_len.max(1);
        self.cycle_mult = cycle_mult.max(1);
        self
    }

    /// Epochs covered by all cycles
    pub fn total_epochs(&self) -> usize {
        Self::epochs_for(self.n_cycles, self.cycle_len, self.cycle_mult)
    }

    /// Epochs covered by `n_cycles` cycles
    pub fn epochs_for(n_cycles: usize, cycle_len: usize, cycle_mult: usize) -> usize {
        (0..n_cycles).map(|i| cycle_len * cycle_mult.pow(i as u32)).sum()
    }

    /// Steps in each cycle
    fn cycle_steps(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_cycles).map(|i| self.cycle_len * self.cycle_mult.pow(i as u32) * self.steps_per_epoch)
    }
}

impl LRScheduler for SgdrLR {
    fn get_lr(&self) -> f32 {
        let mut start = 0;
        for len in self.cycle_steps() {
            if self.current_step < start + len {
                let pos = (self.current_step - start) as f32 / len as f32;
                return sched_cos(self.lr_max, 0.0, pos);
            }
            start += len;
        }
        0.0
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
