//! Exponential learning rate sweep

use super::{progress, LRScheduler};

/// `lr = start * (end / start)^(step / num_steps)`
#[derive(Debug, Clone)]
pub struct ExponentialLR {
    start_lr: f32,
    end_lr: f32,
    num_steps: usize,
    current_step: usize,
}

impl ExponentialLR {
    pub fn new(start_lr: f32, end_lr: f32, num_steps: usize) -> Self {
        Self { start_lr, end_lr, num_steps, current_step: 0 }
    }
}

impl LRScheduler for ExponentialLR {
    fn get_lr(&self) -> f32 {
        let pos = progress(self.current_step, self.num_steps);
        self.start_lr * (self.end_lr / self.start_lr).powf(pos)
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}
