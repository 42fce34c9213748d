//! Configuration validation logic
//!
//! Validates fine-tuning configurations before any data is read.

use super::schema::FinetuneConfig;
use crate::error::{Error, Result};
use crate::tensor::Device;

/// Validate a fine-tuning configuration
///
/// Checks:
/// - A training data path is given
/// - Numeric values are in valid ranges
/// - The device name parses
pub fn validate_config(config: &FinetuneConfig) -> Result<()> {
    if config.data.train.as_os_str().is_empty() {
        return Err(Error::config("data.train", "a training data path is required"));
    }

    if !config.data.valid_pct.is_finite() || !(0.0..=1.0).contains(&config.data.valid_pct) {
        return Err(Error::config(
            "data.valid_pct",
            format!("must be within [0, 1], got {}", config.data.valid_pct),
        ));
    }

    if config.data.label_keys.is_empty() {
        return Err(Error::config("data.label_keys", "at least one label key is required"));
    }

    if config.loader.batch_size == 0 {
        return Err(Error::config("loader.batch_size", "must be positive"));
    }

    config.loader.device.parse::<Device>().map_err(|_| {
        Error::config("loader.device", format!("unknown device '{}', use cpu, cuda or cuda:N", config.loader.device))
    })?;

    if let Some(max_length) = config.tokenizer.options.max_length {
        if max_length == 0 {
            return Err(Error::config("tokenizer.options.max_length", "must be positive"));
        }
    }

    if config.tune.epochs == 0 {
        return Err(Error::config("tune.epochs", "must be positive"));
    }

    if let Some(lr) = config.tune.lr {
        if !lr.is_finite() || lr <= 0.0 || lr > 1.0 {
            return Err(Error::config("tune.lr", format!("must be in (0, 1], got {lr}")));
        }
    }

    Ok(())
}
