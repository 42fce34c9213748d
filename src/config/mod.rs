//! Declarative YAML configuration for fine-tuning runs
//!
//! # Example
//!
//! ```yaml
//! data:
//!   train: data/train.jsonl
//!   valid_pct: 0.1
//!   label_keys: [labels]
//!   remove_cols: [text]
//! tokenizer:
//!   name: models/bert-base
//!   options:
//!     max_length: 128
//! loader:
//!   batch_size: 16
//! tune:
//!   epochs: 3
//!   strategy: one_cycle
//! ```

mod schema;
mod validate;

pub use schema::{DataSpec, FinetuneConfig, LoaderSpec, TokenizerSpec, TuneSpec};
pub use validate::validate_config;

use crate::data::LoaderOptions;
use crate::error::{Error, Result};
use crate::tensor::Device;
use std::fs;
use std::path::Path;

impl FinetuneConfig {
    /// Parse and validate a YAML document
    ///
    /// # Errors
    /// Returns `Serialization` for malformed YAML and `Config` for invalid values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read, otherwise as [`FinetuneConfig::from_yaml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("Failed to read config file {}", path.display()), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate value ranges
    ///
    /// # Errors
    /// Returns `Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Serialize back to YAML
    ///
    /// # Errors
    /// Returns `Serialization` if encoding fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Configured device
    ///
    /// # Errors
    /// Returns `Config` for an unknown device name.
    pub fn device(&self) -> Result<Device> {
        self.loader.device.parse()
    }

    /// Loader options described by the `loader` section
    ///
    /// # Errors
    /// Returns `Config` for an unknown device name.
    pub fn loader_options(&self) -> Result<LoaderOptions> {
        Ok(LoaderOptions {
            batch_size: self.loader.batch_size,
            shuffle_train: self.loader.shuffle_train,
            drop_last: self.loader.drop_last,
            seed: self.loader.seed,
            device: self.device()?,
            collate_fn: None,
        })
    }
}
