//! Dense `f32` tensors tagged with the device they are meant to live on.
//!
//! Batches produced by the loaders and logits returned by models are
//! [`Tensor`]s. Storage is an `ndarray::ArrayD<f32>`; the [`Device`] tag is
//! carried so that models running elsewhere know where a batch should go.

use crate::error::{Error, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compute device a tensor or model is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// CPU execution
    #[default]
    Cpu,
    /// CUDA GPU with device ID
    Cuda { device_id: usize },
}

impl Device {
    /// Check if this device is CUDA
    #[must_use]
    pub const fn is_cuda(&self) -> bool {
        matches!(self, Self::Cuda { .. })
    }

    /// Get device ID for CUDA devices
    #[must_use]
    pub const fn device_id(&self) -> Option<usize> {
        match self {
            Self::Cuda { device_id } => Some(*device_id),
            Self::Cpu => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda { device_id } => write!(f, "CUDA:{device_id}"),
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda { device_id: 0 }),
            other => other
                .strip_prefix("cuda:")
                .and_then(|id| id.parse().ok())
                .map(|device_id| Self::Cuda { device_id })
                .ok_or_else(|| Error::config("device", format!("Unknown device: {s}. Use: cpu, cuda, cuda:N"))),
        }
    }
}

/// N-dimensional `f32` tensor
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
    device: Device,
}

impl Tensor {
    /// Wrap an existing array on the CPU
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data, device: Device::Cpu }
    }

    /// Build a tensor from flat values and a shape
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `values.len()` is not the product of `shape`.
    pub fn from_vec(values: Vec<f32>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::ShapeMismatch {
                field: "tensor".into(),
                expected: shape.to_vec(),
                actual: vec![values.len()],
            });
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| Error::Validation(format!("invalid tensor shape {shape:?}: {e}")))?;
        Ok(Self::new(data))
    }

    /// Zero-dimensional tensor holding one value
    pub fn scalar(value: f32) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Tensor with a zero-length leading axis
    pub fn empty() -> Self {
        Self::new(ArrayD::zeros(IxDyn(&[0])))
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Length of the leading axis (0 for scalars)
    pub fn len(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }

    /// Check whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total number of elements
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Underlying array
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consume into the underlying array
    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    /// Device tag
    pub fn device(&self) -> Device {
        self.device
    }

    /// Copy of this tensor tagged for `device`
    #[must_use]
    pub fn to_device(&self, device: Device) -> Self {
        Self { data: self.data.clone(), device }
    }

    /// Row `index` along the leading axis
    ///
    /// # Errors
    /// Returns `Validation` for scalars or an out-of-range index.
    pub fn row(&self, index: usize) -> Result<Self> {
        if self.data.ndim() == 0 || index >= self.len() {
            return Err(Error::Validation(format!(
                "row {index} out of range for tensor of shape {:?}",
                self.shape()
            )));
        }
        Ok(Self { data: self.data.index_axis(Axis(0), index).to_owned(), device: self.device })
    }

    /// Stack equally shaped tensors along a new leading axis
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the inputs disagree in shape and
    /// `Validation` when `tensors` is empty.
    pub fn stack(tensors: &[&Tensor]) -> Result<Self> {
        let first = tensors
            .first()
            .ok_or_else(|| Error::Validation("cannot stack zero tensors".into()))?;
        for t in tensors.iter().skip(1) {
            if t.shape() != first.shape() {
                return Err(Error::ShapeMismatch {
                    field: "stack".into(),
                    expected: first.shape().to_vec(),
                    actual: t.shape().to_vec(),
                });
            }
        }
        let views: Vec<_> = tensors.iter().map(|t| t.data.view()).collect();
        let data = ndarray::stack(Axis(0), &views)
            .map_err(|e| Error::Validation(format!("stack failed: {e}")))?;
        Ok(Self { data, device: first.device })
    }

    /// Values as token ids, dropping negative entries such as the `-100` ignore index
    pub fn to_ids(&self) -> Vec<u32> {
        self.data.iter().filter(|v| **v >= 0.0).map(|v| v.round() as u32).collect()
    }

    /// Index of the largest value in each row of a 2-D tensor
    ///
    /// A 1-D tensor is treated as a single row.
    pub fn argmax_rows(&self) -> Vec<usize> {
        let argmax = |row: ndarray::ArrayViewD<'_, f32>| {
            row.iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0
        };
        match self.data.ndim() {
            0 => vec![0],
            1 => vec![argmax(self.data.view())],
            _ => self.data.outer_iter().map(argmax).collect(),
        }
    }

    /// Render values in a compact bracketed form, integers without a fraction
    pub fn format_values(&self) -> String {
        fn fmt_value(v: f32) -> String {
            if v.fract() == 0.0 && v.abs() < 1e9 {
                format!("{}", v as i64)
            } else {
                format!("{v:.4}")
            }
        }
        fn render(view: ndarray::ArrayViewD<'_, f32>) -> String {
            if view.ndim() == 0 {
                return view.iter().next().map(|v| fmt_value(*v)).unwrap_or_default();
            }
            let parts: Vec<String> = view.outer_iter().map(render).collect();
            format!("[{}]", parts.join(", "))
        }
        render(self.data.view())
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(data: ArrayD<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda { device_id: 0 });
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda { device_id: 3 });
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Cpu.to_string(), "CPU");
        assert_eq!(Device::Cuda { device_id: 1 }.to_string(), "CUDA:1");
        assert_eq!(Device::Cuda { device_id: 1 }.device_id(), Some(1));
        assert!(!Device::Cpu.is_cuda());
    }

    #[test]
    fn test_from_vec_shape_check() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.numel(), 4);
        assert!(Tensor::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]).is_err());
    }

    #[test]
    fn test_scalar_and_empty() {
        let s = Tensor::scalar(2.5);
        assert_eq!(s.len(), 0);
        assert_eq!(s.numel(), 1);
        assert!(!s.is_empty());
        assert!(Tensor::empty().is_empty());
    }

    #[test]
    fn test_row() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
        let r = t.row(1).unwrap();
        assert_eq!(r.shape(), &[2]);
        assert_eq!(r.data().as_slice().unwrap(), &[3.0, 4.0]);
        assert!(t.row(3).is_err());
        assert!(Tensor::scalar(1.0).row(0).is_err());
    }

    #[test]
    fn test_stack() {
        let a = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let b = Tensor::from_vec(vec![3.0, 4.0], &[2]).unwrap();
        let s = Tensor::stack(&[&a, &b]).unwrap();
        assert_eq!(s.shape(), &[2, 2]);

        let c = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        assert!(matches!(Tensor::stack(&[&a, &c]), Err(Error::ShapeMismatch { .. })));
        assert!(Tensor::stack(&[]).is_err());
    }

    #[test]
    fn test_to_ids_skips_ignore_index() {
        let t = Tensor::from_vec(vec![5.0, -100.0, 7.0], &[3]).unwrap();
        assert_eq!(t.to_ids(), vec![5, 7]);
    }

    #[test]
    fn test_argmax_rows() {
        let t = Tensor::from_vec(vec![0.1, 0.9, 0.8, 0.2], &[2, 2]).unwrap();
        assert_eq!(t.argmax_rows(), vec![1, 0]);
        let v = Tensor::from_vec(vec![0.1, 0.3, 0.2], &[3]).unwrap();
        assert_eq!(v.argmax_rows(), vec![1]);
    }

    #[test]
    fn test_format_values() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(t.format_values(), "[[1, 2], [3, 4]]");
        assert_eq!(Tensor::scalar(0.5).format_values(), "0.5000");
    }

    #[test]
    fn test_to_device_keeps_values() {
        let t = Tensor::from_vec(vec![1.0], &[1]).unwrap();
        let moved = t.to_device(Device::Cuda { device_id: 0 });
        assert_eq!(moved.device(), Device::Cuda { device_id: 0 });
        assert_eq!(moved.data(), t.data());
    }
}
