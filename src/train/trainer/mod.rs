//! Learner: the fitting loop behind the tuner
//!
//! This module provides a `Learner` that orchestrates training, including:
//! - Single batches (split, forward, loss, backward, step)
//! - Epoch-level training under a learning-rate schedule
//! - Multi-epoch fits (one-cycle, flat-cos, warm restarts) with callbacks
//! - Validation with metrics
//! - Learning-rate search

mod core;
mod epoch;
mod lr_find;
mod result;
mod step;
mod train_loop;

pub use core::{Learner, DEFAULT_LR};
pub use lr_find::{LrFindConfig, LrFindResult, SuggestionMethod};
pub use result::{EpochSummary, TrainResult, ValidationResult};
pub use step::BatchOutput;
pub use train_loop::TuneOptions;
