//! Flat then cosine annealing

use super::{progress, sched_cos, LRScheduler};

/// Constant `lr` for `pct_start` of the steps, then cosine annealing to zero
#[derive(Debug, Clone)]
pub struct FlatCosLR {
    lr: f32,
    total_steps: usize,
    pct_start: f32,
    current_step: usize,
}

impl FlatCosLR {
    /// Create a flat-cos schedule with `pct_start = 0.75`
    pub fn new(lr: f32, total_steps: usize) -> Self {
        Self { lr, total_steps, pct_start: 0.75, current_step: 0 }
    }

    /// Fraction of steps kept flat
    pub fn with_pct_start(mut self, pct_start: f32) -> Self {
        self.pct_start = pct_start.clamp(0.0, 1.0);
        self
    }
}

impl LRScheduler for FlatCosLR {
    fn get_lr(&self) -> f32 {
        let pos = progress(self.current_step, self.total_steps);
        if pos < self.pct_start || self.pct_start >= 1.0 {
            self.lr
        } else {
            sched_cos(self.lr, 0.0, (pos - self.pct_start) / (1.0 - self.pct_start))
        }
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
