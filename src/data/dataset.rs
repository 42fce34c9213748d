//! In-memory datasets of JSON records.

use super::splitter::RandomSplitter;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One example: field name to value, in insertion order
pub type Example = Map<String, Value>;

/// Default number of rows handed to a batched map function at once
pub const DEFAULT_MAP_BATCH_SIZE: usize = 1000;

/// Ordered collection of examples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Example>,
}

impl Dataset {
    /// Dataset over `rows`
    pub fn new(rows: Vec<Example>) -> Self {
        Self { rows }
    }

    /// Dataset from JSON values, each of which must be an object
    ///
    /// # Errors
    /// Returns `Validation` naming the first non-object value.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(map) => Ok(map),
                other => Err(Error::Validation(format!("row {i} is not an object: {other}"))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rows))
    }

    /// Parse JSON Lines text; blank lines are skipped
    ///
    /// # Errors
    /// Returns `Serialization` with the 1-based line number of a bad line.
    pub fn from_jsonl_str(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if let Some(row) = parse_line(line, i + 1)? {
                rows.push(row);
            }
        }
        Ok(Self::new(rows))
    }

    /// Load a JSON Lines file
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read and `Serialization` for a bad line.
    pub fn from_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
        let mut rows = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
            if let Some(row) = parse_line(&line, i + 1)? {
                rows.push(row);
            }
        }
        tracing::debug!(path = %path.display(), rows = rows.len(), "loaded dataset");
        Ok(Self::new(rows))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `index`
    pub fn get(&self, index: usize) -> Option<&Example> {
        self.rows.get(index)
    }

    /// All rows
    pub fn rows(&self) -> &[Example] {
        &self.rows
    }

    /// Iterate over rows
    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.rows.iter()
    }

    /// Field names in first-seen order across all rows
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }

    /// New dataset with the rows at `indices`, in that order
    ///
    /// # Errors
    /// Returns `Validation` for an out-of-range index.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        indices
            .iter()
            .map(|&i| {
                self.rows.get(i).cloned().ok_or_else(|| {
                    Error::Validation(format!("index {i} out of range for {} rows", self.rows.len()))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Split into `(train, valid)` datasets
    ///
    /// # Errors
    /// Same as [`RandomSplitter::split`].
    pub fn split(&self, splitter: &RandomSplitter) -> Result<(Self, Self)> {
        let (train, valid) = splitter.split_items(&self.rows)?;
        Ok((Self::new(train), Self::new(valid)))
    }

    /// Apply `f` to consecutive chunks of `batch_size` rows
    ///
    /// `f` must return one output map per input row. Each output row is the
    /// input row without `remove_columns`, extended with the fields of the
    /// matching output map.
    ///
    /// # Errors
    /// Returns `Validation` for a zero batch size, a column listed in
    /// `remove_columns` that no row has, or a chunk whose output length
    /// differs from its input; errors from `f` are propagated.
    pub fn map_batched<F>(&self, batch_size: usize, remove_columns: &[String], mut f: F) -> Result<Self>
    where
        F: FnMut(&[Example]) -> Result<Vec<Example>>,
    {
        if batch_size == 0 {
            return Err(Error::Validation("map batch size must be positive".into()));
        }
        if !self.rows.is_empty() {
            let columns = self.column_names();
            if let Some(missing) = remove_columns.iter().find(|c| !columns.contains(c)) {
                return Err(Error::Validation(format!(
                    "column '{missing}' to remove is not in the dataset (columns: {})",
                    columns.join(", ")
                )));
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for chunk in self.rows.chunks(batch_size) {
            let outputs = f(chunk)?;
            if outputs.len() != chunk.len() {
                return Err(Error::Validation(format!(
                    "map function returned {} rows for a batch of {}",
                    outputs.len(),
                    chunk.len()
                )));
            }
            for (row, output) in chunk.iter().zip(outputs) {
                let mut row = row.clone();
                for col in remove_columns {
                    row.shift_remove(col);
                }
                row.extend(output);
                rows.push(row);
            }
        }
        Ok(Self::new(rows))
    }
}

impl FromIterator<Example> for Dataset {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<Example>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(Error::Serialization(format!("line {line_no}: expected an object, got {other}"))),
        Err(e) => Err(Error::Serialization(format!("line {line_no}: {e}"))),
    }
}
