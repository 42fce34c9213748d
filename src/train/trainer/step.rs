//! Single-batch operations

use super::core::Learner;
use crate::data::Batch;
use crate::error::{Error, Result};
use crate::model::LossGrad;
use crate::train::callback::CallbackAction;
use crate::Tensor;

/// What one batch produced
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    /// Working loss (model-reported, else from the loss function)
    pub loss: Option<f32>,
    /// Model predictions
    pub logits: Option<Tensor>,
    /// Stacked label tensors, empty when the batch carried none
    pub targets: Tensor,
    /// Whether the optimizer updated the parameters
    pub stepped: bool,
}

impl Learner {
    /// Split a batch into model inputs and targets
    ///
    /// The inputs are the whole batch; labels stay in it so models can compute
    /// their own loss. The targets stack every present label key along a new
    /// leading axis, or are empty when no label key is present.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when present label tensors differ in shape.
    pub fn split_batch(&self, batch: &Batch) -> Result<(Batch, Tensor)> {
        let labels: Vec<&Tensor> = self.label_keys.iter().filter_map(|k| batch.get(k)).collect();
        let targets = if labels.is_empty() { Tensor::empty() } else { Tensor::stack(&labels)? };
        Ok((batch.clone(), targets))
    }

    /// Run one batch through the model, and update the parameters when training
    ///
    /// Order of events: `after_pred`, `after_loss`, then (training with
    /// targets only) `before_backward`, backward pass, `before_step`,
    /// optimizer step or `after_cancel_step`, `after_step`, gradient reset.
    ///
    /// # Errors
    /// Forward and backward failures propagate unchanged; optimizer failures
    /// surface as `Step`. A training batch with targets but no way to compute
    /// a loss is a `Model` error.
    pub fn one_batch(&mut self, batch: &Batch) -> Result<BatchOutput> {
        let (xb, yb) = self.split_batch(batch)?;
        let device = self.dls.device();
        let xb = xb.to_device(device);
        let yb = yb.to_device(device);

        let out = self.model.forward(&xb)?;
        let ctx = self.build_context(0, 0, 0.0, None);
        self.callbacks.after_pred(&ctx);

        let (loss, grad) = match (out.loss, &out.logits, &self.loss_fn) {
            (Some(loss), _, _) => (Some(loss), Some(LossGrad::Internal)),
            (None, Some(logits), Some(loss_fn)) if !yb.is_empty() => {
                let target = if yb.len() == 1 { yb.row(0)? } else { yb.clone() };
                let loss = loss_fn.forward(logits, &target)?;
                (Some(loss.value), Some(LossGrad::Logits(loss.grad)))
            }
            _ => (None, None),
        };

        let ctx = self.build_context(0, 0, loss.unwrap_or(f32::NAN), None);
        self.callbacks.after_loss(&ctx);

        let mut output = BatchOutput { loss, logits: out.logits, targets: yb, stepped: false };
        if !self.training || output.targets.is_empty() {
            return Ok(output);
        }

        let grad = grad.ok_or_else(|| {
            Error::Model(format!(
                "{} reported no loss and no loss function applies to its output",
                self.model.name()
            ))
        })?;

        self.callbacks.before_backward(&ctx);
        self.model.backward(grad)?;

        if self.callbacks.before_step(&ctx) == CallbackAction::CancelStep {
            self.callbacks.after_cancel_step(&ctx);
        } else {
            let mut params = self.model.parameters_mut();
            self.optimizer.step(&mut params).map_err(|e| match e {
                Error::Step(_) => e,
                other => Error::Step(other.to_string()),
            })?;
            output.stepped = true;
        }
        self.callbacks.after_step(&ctx);

        let mut params = self.model.parameters_mut();
        self.optimizer.zero_grad(&mut params);
        self.global_step += 1;
        Ok(output)
    }
}
