//! SafeTensors weight files and `config.json`
//!
//! A saved model directory holds:
//! - `model.safetensors` with one F32 tensor per parameter, keyed by name
//! - `config.json` with the architecture name and configuration

use super::PretrainedModel;
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Weight file name inside a model directory
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Configuration file name inside a model directory
pub const CONFIG_FILE: &str = "config.json";

/// Write weights and configuration of `model` into `dir`
///
/// The directory is created if needed. Returns `dir`.
///
/// # Errors
/// Returns `Io` if the directory or files cannot be written and
/// `Serialization` if encoding fails.
pub fn save_pretrained(model: &dyn PretrainedModel, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::io(format!("Failed to create {}", dir.display()), e))?;

    let tensor_data: Vec<(String, Vec<u8>, Vec<usize>)> = model
        .parameters()
        .into_iter()
        .map(|p| {
            let values: Vec<f32> = p.value().iter().copied().collect();
            let bytes: Vec<u8> = bytemuck::cast_slice(&values).to_vec();
            (p.name().to_string(), bytes, p.value().shape().to_vec())
        })
        .collect();

    let views = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map(|view| (name.as_str(), view))
                .map_err(|e| Error::Serialization(format!("Invalid tensor '{name}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), "pt".to_string());

    let bytes = safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;
    let weights_path = dir.join(WEIGHTS_FILE);
    fs::write(&weights_path, bytes)
        .map_err(|e| Error::io(format!("Failed to write {}", weights_path.display()), e))?;

    let config = serde_json::json!({
        "architectures": [model.name()],
        "num_parameters": model.num_parameters(),
        "config": model.config(),
    });
    let config_path = dir.join(CONFIG_FILE);
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)
        .map_err(|e| Error::io(format!("Failed to write {}", config_path.display()), e))?;

    tracing::debug!(path = %dir.display(), tensors = tensor_data.len(), "Saved model weights");
    Ok(dir.to_path_buf())
}

/// Read every F32 tensor of `dir/model.safetensors` by name
///
/// # Errors
/// Returns `Io` if the file cannot be read and `Serialization` for a
/// malformed file or a non-F32 tensor.
pub fn read_weights(dir: impl AsRef<Path>) -> Result<BTreeMap<String, ArrayD<f32>>> {
    let path = dir.as_ref().join(WEIGHTS_FILE);
    let data = fs::read(&path).map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;
    let tensors = SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("Failed to deserialize {}: {e}", path.display())))?;

    let mut weights = BTreeMap::new();
    for name in tensors.names() {
        let view = tensors
            .tensor(name)
            .map_err(|e| Error::Serialization(format!("Failed to read tensor '{name}': {e}")))?;
        if view.dtype() != Dtype::F32 {
            return Err(Error::Serialization(format!(
                "Tensor '{name}' has dtype {:?}, expected F32",
                view.dtype()
            )));
        }
        let values: Vec<f32> = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(view.shape()), values)
            .map_err(|e| Error::Serialization(format!("Tensor '{name}' has inconsistent shape: {e}")))?;
        weights.insert(name.to_string(), array);
    }
    Ok(weights)
}

/// Restore the weights of `model` from `dir`
///
/// Every model parameter must be present with a matching shape; extra tensors
/// in the file are ignored.
///
/// # Errors
/// Returns `Model` for a missing tensor, `ShapeMismatch` for a tensor of the
/// wrong shape, and the errors of [`read_weights`].
pub fn load_pretrained(model: &mut dyn PretrainedModel, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    let mut weights = read_weights(dir)?;

    for param in model.parameters_mut() {
        let loaded = weights.remove(param.name()).ok_or_else(|| {
            Error::Model(format!("Tensor '{}' missing from {}", param.name(), dir.join(WEIGHTS_FILE).display()))
        })?;
        if loaded.shape() != param.value().shape() {
            return Err(Error::ShapeMismatch {
                field: param.name().to_string(),
                expected: param.value().shape().to_vec(),
                actual: loaded.shape().to_vec(),
            });
        }
        *param.value_mut() = loaded;
        param.zero_grad();
    }

    if !weights.is_empty() {
        tracing::debug!(unused = ?weights.keys().collect::<Vec<_>>(), "Ignoring tensors without a matching parameter");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearClassifier;
    use tempfile::TempDir;

    #[test]
    fn test_save_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let model = LinearClassifier::new(3, 2, 0);
        let out = save_pretrained(&model, dir.path()).unwrap();

        assert_eq!(out, dir.path());
        assert!(dir.path().join(WEIGHTS_FILE).exists());

        let config: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(config["architectures"][0], "LinearClassifier");
        assert_eq!(config["num_parameters"], 8);
        assert_eq!(config["config"]["num_labels"], 2);
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir = TempDir::new().unwrap();
        let source = LinearClassifier::new(4, 3, 11);
        save_pretrained(&source, dir.path()).unwrap();

        let mut target = LinearClassifier::new(4, 3, 99);
        assert_ne!(source.parameters()[0].value(), target.parameters()[0].value());

        load_pretrained(&mut target, dir.path()).unwrap();
        for (a, b) in source.parameters().iter().zip(target.parameters()) {
            assert_eq!(a.value(), b.value());
        }
    }

    #[test]
    fn test_load_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        save_pretrained(&LinearClassifier::new(4, 3, 0), dir.path()).unwrap();

        let mut wrong = LinearClassifier::new(5, 3, 0);
        let err = load_pretrained(&mut wrong, dir.path()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_load_missing_directory() {
        let mut model = LinearClassifier::new(2, 2, 0);
        let err = load_pretrained(&mut model, "/no/such/model").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_read_weights_names() {
        let dir = TempDir::new().unwrap();
        save_pretrained(&LinearClassifier::new(2, 2, 0), dir.path()).unwrap();
        let weights = read_weights(dir.path()).unwrap();
        assert_eq!(weights.keys().collect::<Vec<_>>(), vec!["classifier.bias", "classifier.weight"]);
        assert_eq!(weights["classifier.weight"].shape(), &[2, 2]);
    }

    #[test]
    fn test_read_weights_garbage_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(WEIGHTS_FILE), b"not a safetensors file").unwrap();
        assert!(matches!(read_weights(dir.path()), Err(Error::Serialization(_))));
    }
}
