//! YAML schema for declarative fine-tuning runs

use crate::tokenizer::{AutoTokenizerOptions, TokenizeOptions};
use crate::train::Strategy;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected 'true' or 'false', got '{other}'"))),
        },
    }
}

fn default_true() -> bool {
    true
}

fn default_label_keys() -> Vec<String> {
    vec!["labels".to_string()]
}

fn default_valid_pct() -> f64 {
    0.2
}

fn default_batch_size() -> usize {
    8
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_epochs() -> usize {
    1
}

/// Complete fine-tuning configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinetuneConfig {
    /// Dataset locations and label fields
    #[serde(default)]
    pub data: DataSpec,

    /// Tokenizer selection and tokenization options
    #[serde(default)]
    pub tokenizer: TokenizerSpec,

    /// Loader settings
    #[serde(default)]
    pub loader: LoaderSpec,

    /// Fitting schedule
    #[serde(default)]
    pub tune: TuneSpec,
}

/// Data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// Training data (JSON Lines)
    #[serde(default)]
    pub train: PathBuf,

    /// Validation data (JSON Lines); split from `train` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<PathBuf>,

    /// Validation share used when splitting `train`
    #[serde(default = "default_valid_pct")]
    pub valid_pct: f64,

    /// Seed for the split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_seed: Option<u64>,

    /// Fields holding targets
    #[serde(default = "default_label_keys")]
    pub label_keys: Vec<String>,

    /// Fields dropped when tokenizing
    #[serde(default)]
    pub remove_cols: Vec<String>,

    /// Class names for label decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

impl Default for DataSpec {
    fn default() -> Self {
        Self {
            train: PathBuf::new(),
            valid: None,
            valid_pct: default_valid_pct(),
            split_seed: None,
            label_keys: default_label_keys(),
            remove_cols: Vec::new(),
            classes: None,
        }
    }
}

/// Tokenizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerSpec {
    /// Directory or `tokenizer.json` path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tokenize the datasets when they are built
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub tokenize: bool,

    /// Options handed to the tokenizer
    #[serde(default)]
    pub options: TokenizeOptions,

    /// Options used when loading the tokenizer
    #[serde(default)]
    pub auto: AutoTokenizerOptions,
}

impl Default for TokenizerSpec {
    fn default() -> Self {
        Self {
            name: None,
            tokenize: true,
            options: TokenizeOptions::default(),
            auto: AutoTokenizerOptions::default(),
        }
    }
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSpec {
    /// Batch size for both loaders
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Shuffle the training loader
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub shuffle_train: bool,

    /// Drop a trailing partial batch
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub drop_last: bool,

    /// Shuffle seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Device name: cpu, cuda or cuda:N
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for LoaderSpec {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            shuffle_train: true,
            drop_last: false,
            seed: None,
            device: default_device(),
        }
    }
}

/// Fitting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneSpec {
    /// Number of epochs (cycles for SGDR)
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// Peak learning rate; found with a learning-rate search when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lr: Option<f32>,

    /// Fitting strategy
    #[serde(default)]
    pub strategy: Strategy,

    /// Directory the tuned model and tokenizer are saved to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for TuneSpec {
    fn default() -> Self {
        Self { epochs: default_epochs(), lr: None, strategy: Strategy::default(), output_dir: None }
    }
}
