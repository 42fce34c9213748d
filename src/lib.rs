//! Dataset binding, tokenization orchestration and fine-tuning for pretrained
//! transformer models.
//!
//! This crate provides:
//! - Label encoders (`Categorize`, `MultiCategorize`) and record readers
//!   (`ColReader`, `ParentLabeller`)
//! - Seeded train/validation splitting
//! - `TaskDatasets`: train/valid splits bound to a tokenizer, turned into
//!   paired data loaders with batch inspection
//! - A callback-driven learner and the `AdaptiveTuner` facade (tune with a
//!   named strategy, learning-rate search, save/load)
//! - YAML configuration for whole runs
//!
//! Diagnostics go through `tracing`; the library never installs a subscriber.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod optim;
pub mod tensor;
pub mod tokenizer;
pub mod train;

#[cfg(test)]
pub(crate) mod log_capture;

pub use error::{Error, ErrorKind, Result};
pub use tensor::{Device, Tensor};
