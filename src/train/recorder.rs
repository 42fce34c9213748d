//! Per-step and per-epoch training history

/// Default smoothing factor for the running loss
pub const DEFAULT_SMOOTHING: f32 = 0.98;

/// History of a learner's fits
///
/// Every optimizer step records the learning rate, the raw loss and an
/// exponentially smoothed, bias-corrected loss. Every epoch records the mean
/// training loss and, when a validation pass ran, its loss and metrics.
#[derive(Debug, Clone)]
pub struct Recorder {
    beta: f32,
    running: f32,
    count: i32,
    lrs: Vec<f32>,
    losses: Vec<f32>,
    smooth_losses: Vec<f32>,
    train_losses: Vec<f32>,
    valid_losses: Vec<Option<f32>>,
    metrics: Vec<Vec<(String, f32)>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_SMOOTHING)
    }

    /// Use `beta` for the running loss average
    pub fn with_smoothing(beta: f32) -> Self {
        Self {
            beta,
            running: 0.0,
            count: 0,
            lrs: Vec::new(),
            losses: Vec::new(),
            smooth_losses: Vec::new(),
            train_losses: Vec::new(),
            valid_losses: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Record one training step, returning the smoothed loss
    pub fn record_step(&mut self, lr: f32, loss: f32) -> f32 {
        self.count += 1;
        self.running = self.beta * self.running + (1.0 - self.beta) * loss;
        let smoothed = self.running / (1.0 - self.beta.powi(self.count));
        self.lrs.push(lr);
        self.losses.push(loss);
        self.smooth_losses.push(smoothed);
        smoothed
    }

    /// Record the end of an epoch
    pub fn record_epoch(&mut self, train_loss: f32, valid_loss: Option<f32>, metrics: Vec<(String, f32)>) {
        self.train_losses.push(train_loss);
        self.valid_losses.push(valid_loss);
        self.metrics.push(metrics);
    }

    /// Restart the running average (at the start of every fit)
    pub fn reset_smoothing(&mut self) {
        self.running = 0.0;
        self.count = 0;
    }

    /// Forget all history
    pub fn clear(&mut self) {
        *self = Self::with_smoothing(self.beta);
    }

    pub fn lrs(&self) -> &[f32] {
        &self.lrs
    }

    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    pub fn smooth_losses(&self) -> &[f32] {
        &self.smooth_losses
    }

    pub fn train_losses(&self) -> &[f32] {
        &self.train_losses
    }

    pub fn valid_losses(&self) -> &[Option<f32>] {
        &self.valid_losses
    }

    /// Validation metrics per epoch, as `(name, value)` pairs
    pub fn metrics(&self) -> &[Vec<(String, f32)>] {
        &self.metrics
    }

    /// Number of recorded steps
    pub fn steps(&self) -> usize {
        self.losses.len()
    }

    /// Number of recorded epochs
    pub fn epochs(&self) -> usize {
        self.train_losses.len()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
