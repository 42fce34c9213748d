//! Train/validation loader pair that knows how to decode its batches.

use super::categorize::Categorize;
use super::loader::DataLoader;
use crate::error::{Error, Result};
use crate::tensor::{Device, Tensor};
use crate::tokenizer::PretrainedTokenizer;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How `labels`/`label` fields are rendered by [`AdaptiveDataLoaders::show_batch`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LabelDecoding {
    /// Class ids mapped back through a vocabulary
    Classification(Categorize<String>),
    /// Token ids decoded through the tokenizer
    #[default]
    Generation,
}

/// Paired loaders with the tokenizer and label keys needed to inspect them
pub struct AdaptiveDataLoaders {
    train: DataLoader,
    valid: DataLoader,
    tokenizer: Option<Arc<dyn PretrainedTokenizer>>,
    label_keys: Vec<String>,
    decoding: LabelDecoding,
    path: PathBuf,
    device: Device,
}

impl AdaptiveDataLoaders {
    /// Bundle `train` and `valid` with label key `labels` and no tokenizer
    pub fn new(train: DataLoader, valid: DataLoader) -> Self {
        Self {
            train,
            valid,
            tokenizer: None,
            label_keys: vec!["labels".to_string()],
            decoding: LabelDecoding::Generation,
            path: PathBuf::from("."),
            device: Device::Cpu,
        }
    }

    /// Attach a tokenizer
    pub fn with_tokenizer(mut self, tokenizer: Option<Arc<dyn PretrainedTokenizer>>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Set the label keys
    pub fn with_label_keys(mut self, label_keys: Vec<String>) -> Self {
        self.label_keys = label_keys;
        self
    }

    /// Set how labels are decoded
    pub fn with_decoding(mut self, decoding: LabelDecoding) -> Self {
        self.decoding = decoding;
        self
    }

    /// Set the working path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the device batches are sent to
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Training loader
    pub fn train(&self) -> &DataLoader {
        &self.train
    }

    /// Validation loader
    pub fn valid(&self) -> &DataLoader {
        &self.valid
    }

    /// Loader by index: 0 is train, 1 is validation
    ///
    /// # Errors
    /// Returns `Validation` for any other index.
    pub fn get(&self, ds_idx: usize) -> Result<&DataLoader> {
        match ds_idx {
            0 => Ok(&self.train),
            1 => Ok(&self.valid),
            other => Err(Error::Validation(format!("loader index {other} out of range, use 0 (train) or 1 (valid)"))),
        }
    }

    /// Shared tokenizer
    pub fn tokenizer(&self) -> Option<&Arc<dyn PretrainedTokenizer>> {
        self.tokenizer.as_ref()
    }

    /// Label field names
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Label decoding mode
    pub fn decoding(&self) -> &LabelDecoding {
        &self.decoding
    }

    /// Working path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device batches are sent to
    pub fn device(&self) -> Device {
        self.device
    }

    /// Move subsequent batches to `device`
    pub fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    /// Tabulate the first `n` examples of one batch from loader `ds_idx`
    ///
    /// With `raw`, or without a tokenizer, every field is shown with its
    /// shape. Otherwise `input_ids` are decoded into an `Input` column and
    /// each label key gets a title-cased column.
    ///
    /// # Errors
    /// Returns `InvalidSampleCount` when `n` is 0, `Validation` for a bad
    /// loader index, and `MissingColumn` when decoding needs a field the
    /// batch lacks.
    pub fn show_batch(&self, ds_idx: usize, n: usize, raw: bool) -> Result<BatchTable> {
        let batch = self.get(ds_idx)?.one_batch()?;
        let batch_len = batch.get("input_ids").map(Tensor::len).unwrap_or_else(|| batch.len());

        let mut n = n;
        if n > batch_len {
            tracing::warn!(requested = n, batch_size = batch_len, "n is larger than one batch, showing the entire batch");
            n = batch_len;
        }
        if n < 1 {
            return Err(Error::InvalidSampleCount { n });
        }

        let tokenizer = match (&self.tokenizer, raw) {
            (Some(tok), false) => tok,
            (None, false) => {
                tracing::warn!("cannot decode without a tokenizer, showing raw values");
                return raw_table(&batch, n);
            }
            (_, true) => return raw_table(&batch, n),
        };

        let input_ids = batch.get("input_ids").ok_or_else(|| missing("input_ids"))?;
        let sequences = (0..n).map(|i| input_ids.row(i).map(|r| r.to_ids())).collect::<Result<Vec<_>>>()?;
        let inputs = tokenizer.batch_decode(&sequences, true)?;

        let mut headers = vec!["Input".to_string()];
        headers.extend(self.label_keys.iter().map(|k| title_case(k)));

        let mut rows = Vec::with_capacity(n);
        for (i, input) in inputs.into_iter().enumerate() {
            let mut row = vec![input];
            for key in &self.label_keys {
                let value = batch.get(key).ok_or_else(|| missing(key))?.row(i)?;
                let cell = if key == "labels" || key == "label" {
                    self.decode_label(tokenizer.as_ref(), &value)?
                } else {
                    value.format_values()
                };
                row.push(cell);
            }
            rows.push(row);
        }
        Ok(BatchTable { headers, rows })
    }

    fn decode_label(&self, tokenizer: &dyn PretrainedTokenizer, value: &Tensor) -> Result<String> {
        match &self.decoding {
            LabelDecoding::Generation => tokenizer.decode(&value.to_ids(), true),
            LabelDecoding::Classification(vocab) => {
                // Ids are decoded one by one; ignored (negative) ids leave no name behind.
                let names = value
                    .to_ids()
                    .into_iter()
                    .map(|id| {
                        vocab.get(id as usize).cloned().ok_or_else(|| {
                            Error::Validation(format!("class id {id} out of range for {} classes", vocab.len()))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(names.join(", "))
            }
        }
    }
}

impl fmt::Debug for AdaptiveDataLoaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveDataLoaders")
            .field("train", &self.train)
            .field("valid", &self.valid)
            .field("tokenizer", &self.tokenizer.as_ref().map(|t| t.name_or_path().to_string()))
            .field("label_keys", &self.label_keys)
            .field("decoding", &self.decoding)
            .field("path", &self.path)
            .field("device", &self.device)
            .finish()
    }
}

fn missing(key: &str) -> Error {
    Error::MissingColumn { column: format!("'{key}'") }
}

fn raw_table(batch: &crate::data::Batch, n: usize) -> Result<BatchTable> {
    let mut headers = Vec::new();
    for key in batch.keys() {
        headers.push(key.to_string());
        headers.push(format!("{key} Shape"));
    }
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(headers.len());
        for (_, tensor) in batch.iter() {
            let value = tensor.row(i)?;
            row.push(value.format_values());
            row.push(format!("{:?}", value.shape()));
        }
        rows.push(row);
    }
    Ok(BatchTable { headers, rows })
}

/// Capitalize the first letter of every alphabetic run, lowercasing the rest
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Rendered batch: one header per column, one row per example
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl BatchTable {
    /// Column headers
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Rows of cells
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of the column named `header`
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }
}

impl fmt::Display for BatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| self.rows.iter().map(|r| r[i].chars().count()).fold(h.chars().count(), usize::max))
            .collect();
        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let padded: Vec<String> = cells.iter().zip(&widths).map(|(c, w)| format!("{c:<w$}")).collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };
        line(f, &self.headers)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &self.rows {
            line(f, row)?;
        }
        Ok(())
    }
}
