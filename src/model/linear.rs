//! Linear classification head over dense input features

use super::{LossGrad, ModelOutput, Parameter, PretrainedModel};
use crate::data::Batch;
use crate::error::{Error, Result};
use crate::tensor::{Device, Tensor};
use crate::train::{CrossEntropyLoss, LossFn};
use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_INPUT_KEY: &str = "input_ids";
const LABELS_KEY: &str = "labels";

/// `logits = x · W + b` with a built-in cross-entropy loss
///
/// When the batch carries `labels` (one class id per row, `-100` ignored) the
/// forward pass also reports the loss, and `backward(LossGrad::Internal)`
/// backpropagates it.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    in_features: usize,
    num_labels: usize,
    input_key: String,
    weight: Parameter,
    bias: Parameter,
    device: Device,
    training: bool,
    cached_inputs: Option<Array2<f32>>,
    cached_loss_grad: Option<ArrayD<f32>>,
}

impl LinearClassifier {
    /// Create a classifier with uniform `±1/√in_features` initial weights
    pub fn new(in_features: usize, num_labels: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((in_features, num_labels), |_| rng.gen_range(-bound..=bound));
        Self {
            in_features,
            num_labels,
            input_key: DEFAULT_INPUT_KEY.to_string(),
            weight: Parameter::new("classifier.weight", weight.into_dyn()),
            bias: Parameter::new("classifier.bias", Array1::<f32>::zeros(num_labels).into_dyn()),
            device: Device::Cpu,
            training: true,
            cached_inputs: None,
            cached_loss_grad: None,
        }
    }

    /// Read features from `key` instead of `input_ids`
    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    fn inputs(&self, batch: &Batch) -> Result<Array2<f32>> {
        let tensor = batch
            .get(&self.input_key)
            .ok_or_else(|| Error::Model(format!("batch has no '{}' field", self.input_key)))?;
        let x = tensor
            .data()
            .clone()
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::ShapeMismatch {
                field: self.input_key.clone(),
                expected: vec![tensor.len(), self.in_features],
                actual: tensor.shape().to_vec(),
            })?;
        if x.ncols() != self.in_features {
            return Err(Error::ShapeMismatch {
                field: self.input_key.clone(),
                expected: vec![x.nrows(), self.in_features],
                actual: x.shape().to_vec(),
            });
        }
        Ok(x)
    }

    fn weight_matrix(&self) -> Result<Array2<f32>> {
        self.weight
            .value()
            .clone()
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::Model(format!("classifier.weight is not a matrix: {e}")))
    }

    fn bias_vector(&self) -> Result<Array1<f32>> {
        self.bias
            .value()
            .clone()
            .into_dimensionality::<Ix1>()
            .map_err(|e| Error::Model(format!("classifier.bias is not a vector: {e}")))
    }
}

impl PretrainedModel for LinearClassifier {
    fn name(&self) -> &str {
        "LinearClassifier"
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "in_features": self.in_features,
            "num_labels": self.num_labels,
            "input_key": self.input_key,
        })
    }

    fn forward(&mut self, batch: &Batch) -> Result<ModelOutput> {
        let x = self.inputs(batch)?;
        let logits = x.dot(&self.weight_matrix()?) + &self.bias_vector()?;
        let logits = Tensor::new(logits.into_dyn()).to_device(self.device);

        self.cached_loss_grad = None;
        let loss = match batch.get(LABELS_KEY) {
            Some(labels) => {
                let loss = CrossEntropyLoss.forward(&logits, labels)?;
                self.cached_loss_grad = Some(loss.grad);
                Some(loss.value)
            }
            None => None,
        };
        self.cached_inputs = Some(x);

        Ok(ModelOutput { loss, logits: Some(logits) })
    }

    fn backward(&mut self, grad: LossGrad) -> Result<()> {
        let x = self
            .cached_inputs
            .as_ref()
            .ok_or_else(|| Error::Model("backward called before forward".into()))?;
        let grad = match grad {
            LossGrad::Internal => self
                .cached_loss_grad
                .take()
                .ok_or_else(|| Error::Model("no model loss to backpropagate; the batch had no labels".into()))?,
            LossGrad::Logits(g) => g,
        };
        let g = grad.into_dimensionality::<Ix2>().map_err(|_| {
            Error::Model(format!("logit gradient must be [{}, {}]", x.nrows(), self.num_labels))
        })?;
        if g.dim() != (x.nrows(), self.num_labels) {
            return Err(Error::ShapeMismatch {
                field: "logits grad".into(),
                expected: vec![x.nrows(), self.num_labels],
                actual: g.shape().to_vec(),
            });
        }

        let d_weight = x.t().dot(&g);
        let d_bias = g.sum_axis(Axis(0));
        self.weight.accumulate_grad(&d_weight.into_dyn());
        self.bias.accumulate_grad(&d_bias.into_dyn());
        Ok(())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn device(&self) -> Device {
        self.device
    }

    fn to_device(&mut self, device: Device) {
        self.device = device;
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn batch(features: &[f32], rows: usize, labels: Option<&[f32]>) -> Batch {
        let mut batch = Batch::new();
        let cols = features.len() / rows;
        batch.insert("input_ids", Tensor::from_vec(features.to_vec(), &[rows, cols]).unwrap());
        if let Some(labels) = labels {
            batch.insert("labels", Tensor::from_vec(labels.to_vec(), &[labels.len()]).unwrap());
        }
        batch
    }

    #[test]
    fn test_forward_shapes_and_no_loss_without_labels() {
        let mut model = LinearClassifier::new(3, 2, 0);
        let out = model.forward(&batch(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 2, None)).unwrap();
        assert!(out.loss.is_none());
        assert_eq!(out.logits.unwrap().shape(), &[2, 2]);
    }

    #[test]
    fn test_forward_reports_loss_with_labels() {
        let mut model = LinearClassifier::new(2, 2, 0);
        let out = model.forward(&batch(&[1.0, 0.0, 0.0, 1.0], 2, Some(&[0.0, 1.0]))).unwrap();
        assert!(out.loss.unwrap() > 0.0);
    }

    #[test]
    fn test_backward_internal_sets_grads() {
        let mut model = LinearClassifier::new(2, 2, 0);
        model.forward(&batch(&[1.0, 2.0, 3.0, 4.0], 2, Some(&[0.0, 1.0]))).unwrap();
        model.backward(LossGrad::Internal).unwrap();
        for p in model.parameters() {
            assert_eq!(p.grad().unwrap().shape(), p.value().shape());
        }
    }

    #[test]
    fn test_backward_external_matches_outer_product() {
        let mut model = LinearClassifier::new(2, 2, 0);
        model.forward(&batch(&[1.0, 2.0], 1, None)).unwrap();
        let g = ndarray::arr2(&[[0.5, -0.5]]).into_dyn();
        model.backward(LossGrad::Logits(g)).unwrap();

        let dw = model.parameters()[0].grad().unwrap().clone();
        assert_abs_diff_eq!(dw[[0, 0]], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(dw[[1, 1]], -1.0, epsilon = 1e-6);
        let db = model.parameters()[1].grad().unwrap().clone();
        assert_abs_diff_eq!(db[[0]], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_backward_internal_without_labels_errors() {
        let mut model = LinearClassifier::new(2, 2, 0);
        model.forward(&batch(&[1.0, 2.0], 1, None)).unwrap();
        assert!(matches!(model.backward(LossGrad::Internal), Err(Error::Model(_))));
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let mut model = LinearClassifier::new(3, 2, 0);
        let err = model.forward(&batch(&[1.0, 2.0], 1, None)).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_custom_input_key() {
        let mut model = LinearClassifier::new(1, 2, 0).with_input_key("features");
        let mut b = Batch::new();
        b.insert("features", Tensor::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap());
        assert!(model.forward(&b).is_ok());
        assert!(model.forward(&batch(&[1.0], 1, None)).is_err());
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let a = LinearClassifier::new(4, 3, 5);
        let b = LinearClassifier::new(4, 3, 5);
        assert_eq!(a.parameters()[0].value(), b.parameters()[0].value());
        assert_eq!(a.num_parameters(), 15);
    }
}
