//! Stochastic Gradient Descent optimizer

use super::optimizer::checked_grad;
use super::Optimizer;
use crate::error::Result;
use crate::model::Parameter;
use ndarray::ArrayD;

/// SGD optimizer with optional momentum and L2 weight decay
#[derive(Debug, Clone)]
pub struct SGD {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocities: Vec<Option<ArrayD<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self { lr, momentum, weight_decay: 0.0, velocities: Vec::new() }
    }

    /// Add `weight_decay * param` to every gradient
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, count: usize) {
        if self.velocities.len() != count {
            self.velocities = vec![None; count];
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Parameter]) -> Result<()> {
        self.ensure_velocities(params.len());

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = checked_grad(param)?.cloned() else { continue };
            let grad = if self.weight_decay > 0.0 { grad + &(param.value() * self.weight_decay) } else { grad };

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                let velocity = match &self.velocities[i] {
                    Some(v) => v * self.momentum - &grad * self.lr,
                    None => &grad * (-self.lr),
                };
                *param.value_mut() += &velocity;
                self.velocities[i] = Some(velocity);
            } else {
                *param.value_mut() -= &(&grad * self.lr);
            }
        }
        Ok(())
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn name(&self) -> &'static str {
        "SGD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn param(values: &[f32], grad: &[f32]) -> Parameter {
        let mut p = Parameter::new("w", arr1(values).into_dyn());
        p.set_grad(arr1(grad).into_dyn());
        p
    }

    #[test]
    fn test_sgd_plain_step() {
        let mut opt = SGD::new(0.1, 0.0);
        let mut p = param(&[1.0, 2.0], &[1.0, -1.0]);
        opt.step(&mut [&mut p]).unwrap();
        assert_abs_diff_eq!(p.value()[[0]], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(p.value()[[1]], 2.1, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_momentum_accumulates() {
        let mut opt = SGD::new(0.1, 0.9);
        let mut p = param(&[0.0], &[1.0]);
        opt.step(&mut [&mut p]).unwrap();
        assert_abs_diff_eq!(p.value()[[0]], -0.1, epsilon = 1e-6);
        opt.step(&mut [&mut p]).unwrap();
        // v = 0.9 * -0.1 - 0.1 = -0.19
        assert_abs_diff_eq!(p.value()[[0]], -0.29, epsilon = 1e-6);

        opt.reset();
        opt.step(&mut [&mut p]).unwrap();
        assert_abs_diff_eq!(p.value()[[0]], -0.39, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_weight_decay() {
        let mut opt = SGD::new(0.1, 0.0).with_weight_decay(0.5);
        let mut p = param(&[2.0], &[0.0]);
        opt.step(&mut [&mut p]).unwrap();
        assert_abs_diff_eq!(p.value()[[0]], 1.9, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_skips_params_without_grad() {
        let mut opt = SGD::new(0.1, 0.0);
        let mut p = Parameter::new("w", arr1(&[1.0]).into_dyn());
        opt.step(&mut [&mut p]).unwrap();
        assert_eq!(p.value()[[0]], 1.0);
    }
}
