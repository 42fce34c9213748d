//! Column reader extracting and formatting fields of a row.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Column specifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColSpec {
    /// Positional access
    Index(usize),
    /// Named access
    Name(String),
}

impl From<usize> for ColSpec {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ColSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ColSpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for ColSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => write!(f, "'{n}'"),
        }
    }
}

/// A record the reader can pull fields out of
///
/// Positional and keyed access are item lookups. Attribute access is used for
/// every other named column and defaults to keyed access; records that expose
/// computed attributes override it.
pub trait Row {
    /// Field at position `index`
    fn item(&self, index: usize) -> Option<Value>;

    /// Field stored under `key`
    fn key(&self, key: &str) -> Option<Value>;

    /// Attribute `name`
    fn attr(&self, name: &str) -> Option<Value> {
        self.key(name)
    }
}

impl Row for Map<String, Value> {
    fn item(&self, index: usize) -> Option<Value> {
        self.values().nth(index).cloned()
    }

    fn key(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl Row for [Value] {
    fn item(&self, index: usize) -> Option<Value> {
        self.get(index).cloned()
    }

    fn key(&self, _key: &str) -> Option<Value> {
        None
    }
}

impl Row for Vec<Value> {
    fn item(&self, index: usize) -> Option<Value> {
        self.as_slice().item(index)
    }

    fn key(&self, key: &str) -> Option<Value> {
        self.as_slice().key(key)
    }
}

impl Row for Value {
    fn item(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(items) => items.item(index),
            Value::Object(map) => map.item(index),
            _ => None,
        }
    }

    fn key(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.key(key),
            _ => None,
        }
    }
}

/// A single value produced by [`ColReader`]
#[derive(Debug, Clone, PartialEq)]
pub enum ColValue {
    /// Field returned untouched
    Raw(Value),
    /// Field formatted with prefix and suffix
    Text(String),
    /// Field split on the label delimiter
    Labels(Vec<String>),
}

/// Output of [`ColReader::read`]
#[derive(Debug, Clone, PartialEq)]
pub enum ColOutput {
    /// Reader configured with one column
    One(ColValue),
    /// Reader configured with several columns, in column order
    Many(Vec<ColValue>),
}

/// Render a JSON value as plain text (strings without quotes)
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads `cols` from a row, applying an optional prefix, suffix or label delimiter
///
/// # Example
///
/// ```rust
/// use afinar::data::{ColOutput, ColReader, ColValue};
/// use serde_json::json;
///
/// let reader = ColReader::new(["a", "b"]).with_pref("x_");
/// let out = reader.read(&json!({"a": 1, "b": 2})).unwrap();
/// assert_eq!(
///     out,
///     ColOutput::Many(vec![ColValue::Text("x_1".into()), ColValue::Text("x_2".into())])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColReader {
    cols: Vec<ColSpec>,
    pref: String,
    suff: String,
    label_delim: Option<String>,
}

impl ColReader {
    /// Reader over `cols` with no formatting
    pub fn new<I, C>(cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColSpec>,
    {
        Self {
            cols: cols.into_iter().map(Into::into).collect(),
            pref: String::new(),
            suff: String::new(),
            label_delim: None,
        }
    }

    /// Prefix prepended to formatted values
    pub fn with_pref(mut self, pref: impl Into<String>) -> Self {
        self.pref = pref.into();
        self
    }

    /// Directory prefix; the platform path separator is appended
    pub fn with_path_pref(mut self, dir: impl AsRef<Path>) -> Self {
        self.pref = format!("{}{}", dir.as_ref().display(), std::path::MAIN_SEPARATOR);
        self
    }

    /// Suffix appended to formatted values
    pub fn with_suff(mut self, suff: impl Into<String>) -> Self {
        self.suff = suff.into();
        self
    }

    /// Split values into label lists on `delim`
    pub fn with_label_delim(mut self, delim: impl Into<String>) -> Self {
        self.label_delim = Some(delim.into());
        self
    }

    /// Configured columns
    pub fn cols(&self) -> &[ColSpec] {
        &self.cols
    }

    /// Configured prefix
    pub fn pref(&self) -> &str {
        &self.pref
    }

    fn fetch<R: Row + ?Sized>(row: &R, col: &ColSpec) -> Option<Value> {
        match col {
            ColSpec::Index(i) => row.item(*i),
            ColSpec::Name(n) if n == "name" || n == "cat" => row.key(n),
            ColSpec::Name(n) => row.attr(n),
        }
    }

    fn read_one<R: Row + ?Sized>(&self, row: &R, col: &ColSpec) -> Result<ColValue> {
        let value = Self::fetch(row, col).ok_or_else(|| Error::MissingColumn { column: col.to_string() })?;
        if self.pref.is_empty() && self.suff.is_empty() && self.label_delim.is_none() {
            return Ok(ColValue::Raw(value));
        }
        let text = value_text(&value);
        Ok(match &self.label_delim {
            None => ColValue::Text(format!("{}{}{}", self.pref, text, self.suff)),
            Some(_) if text.is_empty() => ColValue::Labels(Vec::new()),
            Some(delim) => ColValue::Labels(text.split(delim.as_str()).map(str::to_string).collect()),
        })
    }

    /// Read the configured columns from `row`
    ///
    /// # Errors
    /// Returns `MissingColumn` if any column is absent from the row.
    pub fn read<R: Row + ?Sized>(&self, row: &R) -> Result<ColOutput> {
        if let [col] = self.cols.as_slice() {
            return self.read_one(row, col).map(ColOutput::One);
        }
        self.cols.iter().map(|c| self.read_one(row, c)).collect::<Result<Vec<_>>>().map(ColOutput::Many)
    }
}
