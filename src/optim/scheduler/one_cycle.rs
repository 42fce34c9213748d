//! One-cycle learning rate policy

use super::{progress, sched_cos, LRScheduler};

/// One-cycle schedule
///
/// - Phase 1 (`pct_start` of the steps): cosine from `lr_max / div` up to `lr_max`
/// - Phase 2: cosine from `lr_max` down to `lr_max / div_final`
#[derive(Debug, Clone)]
pub struct OneCycleLR {
    lr_max: f32,
    total_steps: usize,
    pct_start: f32,
    div: f32,
    div_final: f32,
    current_step: usize,
}

impl OneCycleLR {
    /// Create a one-cycle schedule with `pct_start = 0.25`, `div = 25`, `div_final = 1e5`
    pub fn new(lr_max: f32, total_steps: usize) -> Self {
        Self { lr_max, total_steps, pct_start: 0.25, div: 25.0, div_final: 1e5, current_step: 0 }
    }

    /// Fraction of steps spent warming up
    pub fn with_pct_start(mut self, pct_start: f32) -> Self {
        self.pct_start = pct_start.clamp(0.0, 1.0);
        self
    }

    /// Divisors for the starting and final learning rate
    pub fn with_divs(mut self, div: f32, div_final: f32) -> Self {
        self.div = div;
        self.div_final = div_final;
        self
    }

    pub fn lr_max(&self) -> f32 {
        self.lr_max
    }
}

impl LRScheduler for OneCycleLR {
    fn get_lr(&self) -> f32 {
        let pos = progress(self.current_step, self.total_steps);
        if pos < self.pct_start {
            sched_cos(self.lr_max / self.div, self.lr_max, pos / self.pct_start)
        } else if self.pct_start >= 1.0 {
            self.lr_max
        } else {
            sched_cos(self.lr_max, self.lr_max / self.div_final, (pos - self.pct_start) / (1.0 - self.pct_start))
        }
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
