//! Batches of named tensors and the collation functions that build them.

use super::dataset::Example;
use crate::error::{Error, Result};
use crate::tensor::{Device, Tensor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field name to tensor, as handed to a model's forward pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    fields: BTreeMap<String, Tensor>,
}

impl Batch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Tensor stored under `key`
    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.fields.get(key)
    }

    /// Check whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Store `tensor` under `key`, returning any previous value
    pub fn insert(&mut self, key: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.fields.insert(key.into(), tensor)
    }

    /// Remove `key`
    pub fn remove(&mut self, key: &str) -> Option<Tensor> {
        self.fields.remove(key)
    }

    /// Field names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over fields
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Number of examples (leading dimension of the first field)
    pub fn len(&self) -> usize {
        self.fields.values().next().map(Tensor::len).unwrap_or(0)
    }

    /// Check whether the batch holds no examples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the batch with every tensor tagged for `device`
    #[must_use]
    pub fn to_device(&self, device: Device) -> Self {
        Self { fields: self.fields.iter().map(|(k, v)| (k.clone(), v.to_device(device))).collect() }
    }
}

impl FromIterator<(String, Tensor)> for Batch {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Turns a slice of examples into a [`Batch`]
pub type CollateFn = Arc<dyn Fn(&[Example]) -> Result<Batch> + Send + Sync>;

/// The default collation function as a [`CollateFn`]
pub fn default_collate_fn() -> CollateFn {
    Arc::new(default_data_collator)
}

/// Stack the numeric fields of `examples` into tensors
///
/// Field names come from the first example. String, null and object fields
/// are skipped. `label` and `label_ids` are stored as `labels`. Booleans
/// become 0/1; nested arrays become extra dimensions and must agree in shape
/// across examples.
///
/// # Errors
/// Returns `Validation` for an empty slice or a non-numeric array element,
/// `MissingColumn` when a later example lacks a field, and `ShapeMismatch`
/// for ragged values.
pub fn default_data_collator(examples: &[Example]) -> Result<Batch> {
    let first = examples
        .first()
        .ok_or_else(|| Error::Validation("cannot collate an empty list of examples".into()))?;

    let mut batch = Batch::new();
    for (key, value) in first {
        if matches!(value, Value::String(_) | Value::Null | Value::Object(_)) {
            continue;
        }
        let name = match key.as_str() {
            "label" | "label_ids" => "labels",
            other => other,
        };

        let mut data = Vec::new();
        let mut shape: Option<Vec<usize>> = None;
        for example in examples {
            let v = example.get(key).ok_or_else(|| Error::MissingColumn { column: format!("'{key}'") })?;
            let s = flatten(key, v, &mut data)?;
            match &shape {
                None => shape = Some(s),
                Some(expected) if *expected != s => {
                    return Err(Error::ShapeMismatch { field: key.clone(), expected: expected.clone(), actual: s })
                }
                Some(_) => {}
            }
        }

        let mut full_shape = vec![examples.len()];
        full_shape.extend(shape.unwrap_or_default());
        batch.insert(name, Tensor::from_vec(data, &full_shape)?);
    }
    Ok(batch)
}

/// Append the numbers in `value` to `out`, returning the value's shape
fn flatten(field: &str, value: &Value, out: &mut Vec<f32>) -> Result<Vec<usize>> {
    match value {
        Value::Number(n) => {
            out.push(n.as_f64().unwrap_or(f64::NAN) as f32);
            Ok(Vec::new())
        }
        Value::Bool(b) => {
            out.push(if *b { 1.0 } else { 0.0 });
            Ok(Vec::new())
        }
        Value::Array(items) => {
            let mut inner: Option<Vec<usize>> = None;
            for item in items {
                let s = flatten(field, item, out)?;
                match &inner {
                    None => inner = Some(s),
                    Some(expected) if *expected != s => {
                        return Err(Error::ShapeMismatch {
                            field: field.to_string(),
                            expected: expected.clone(),
                            actual: s,
                        })
                    }
                    Some(_) => {}
                }
            }
            let mut shape = vec![items.len()];
            shape.extend(inner.unwrap_or_default());
            Ok(shape)
        }
        other => Err(Error::Validation(format!("field '{field}' holds a non-numeric value: {other}"))),
    }
}
