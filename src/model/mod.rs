//! Pretrained model seam
//!
//! The tuner drives any [`PretrainedModel`]: it runs `forward` on a collated
//! [`Batch`], hands the gradient of the working loss back through `backward`,
//! and lets the optimizer update the exposed [`Parameter`]s. Weights are
//! persisted with [`io::save_pretrained`] / [`io::load_pretrained`].

pub mod io;
mod linear;

pub use io::{load_pretrained, read_weights, save_pretrained, CONFIG_FILE, WEIGHTS_FILE};
pub use linear::LinearClassifier;

use crate::data::Batch;
use crate::error::Result;
use crate::tensor::{Device, Tensor};
use ndarray::ArrayD;

/// Named trainable array with an optional accumulated gradient
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: ArrayD<f32>,
    grad: Option<ArrayD<f32>>,
}

impl Parameter {
    /// Create a parameter without a gradient
    pub fn new(name: impl Into<String>, value: ArrayD<f32>) -> Self {
        Self { name: name.into(), value, grad: None }
    }

    /// Name used in weight files
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ArrayD<f32> {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.value
    }

    /// Accumulated gradient, if any
    pub fn grad(&self) -> Option<&ArrayD<f32>> {
        self.grad.as_ref()
    }

    /// Replace the gradient
    pub fn set_grad(&mut self, grad: ArrayD<f32>) {
        self.grad = Some(grad);
    }

    /// Add to the gradient, starting from zero if none is set
    pub fn accumulate_grad(&mut self, grad: &ArrayD<f32>) {
        match self.grad.as_mut() {
            Some(existing) => *existing += grad,
            None => self.grad = Some(grad.clone()),
        }
    }

    /// Drop the gradient
    pub fn zero_grad(&mut self) {
        self.grad = None;
    }

    /// Number of scalar weights
    pub fn numel(&self) -> usize {
        self.value.len()
    }
}

/// Result of a forward pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    /// Loss computed by the model itself (when labels were in the batch)
    pub loss: Option<f32>,
    /// Raw predictions
    pub logits: Option<Tensor>,
}

impl ModelOutput {
    /// Output carrying only logits
    pub fn logits(logits: Tensor) -> Self {
        Self { loss: None, logits: Some(logits) }
    }
}

/// Gradient handed to [`PretrainedModel::backward`]
#[derive(Debug, Clone, PartialEq)]
pub enum LossGrad {
    /// Backpropagate the loss the model reported from its last forward pass
    Internal,
    /// Backpropagate an external loss whose gradient w.r.t. the logits is given
    Logits(ArrayD<f32>),
}

/// A model the tuner can fit, persist and reload
pub trait PretrainedModel: Send {
    /// Architecture name written into `config.json`
    fn name(&self) -> &str;

    /// Architecture configuration written into `config.json`
    fn config(&self) -> serde_json::Value;

    /// Run the model on a batch, caching what `backward` needs
    fn forward(&mut self, batch: &Batch) -> Result<ModelOutput>;

    /// Accumulate parameter gradients for the last forward pass
    fn backward(&mut self, grad: LossGrad) -> Result<()>;

    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Device the weights live on
    fn device(&self) -> Device;

    /// Move the weights to `device`
    fn to_device(&mut self, device: Device);

    /// Switch between training and evaluation behaviour
    fn set_training(&mut self, _training: bool) {}

    /// Total number of scalar weights
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
