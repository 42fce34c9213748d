//! Fine-tuning loop
//!
//! This module provides the training side of the crate:
//! - Loss functions (Cross-Entropy with ignore index, MSE)
//! - Evaluation metrics (Accuracy)
//! - Callbacks (progress logging, early stopping, step cancellation)
//! - Learner abstraction with one-cycle, flat-cos and SGDR fits
//! - Learning-rate search
//! - Training history
//! - The task-level tuner
//!
//! # Example
//!
//! ```no_run
//! use afinar::data::AdaptiveDataLoaders;
//! use afinar::model::LinearClassifier;
//! use afinar::optim::AdamW;
//! use afinar::train::{AdaptiveTuner, Learner, Strategy};
//!
//! # fn run(dls: AdaptiveDataLoaders) -> afinar::Result<()> {
//! let learner = Learner::new(dls, Box::new(LinearClassifier::new(16, 2, 0)), Box::new(AdamW::default_params(1e-3)));
//! let mut tuner = AdaptiveTuner::new(learner, None, None)?;
//! let result = tuner.tune(3, None, Strategy::OneCycle, Vec::new())?;
//! println!("final loss: {:.4}", result.final_loss);
//! # Ok(())
//! # }
//! ```

pub mod callback;
mod loss;
mod metrics;
mod recorder;
mod strategy;
mod trainer;
mod tuner;

#[cfg(test)]
pub(crate) mod test_support;

pub use callback::{
    CallbackAction, CallbackContext, CallbackManager, EarlyStopping, Monitor, ProgressCallback, TrainerCallback,
};
pub use loss::{CrossEntropyLoss, Loss, LossFn, MSELoss, IGNORE_INDEX};
pub use metrics::{Accuracy, Metric};
pub use recorder::{Recorder, DEFAULT_SMOOTHING};
pub use strategy::Strategy;
pub use trainer::{
    BatchOutput, EpochSummary, Learner, LrFindConfig, LrFindResult, SuggestionMethod, TrainResult, TuneOptions,
    ValidationResult, DEFAULT_LR,
};
pub use tuner::{AdaptiveTuner, TaskTuner, RANK_ENV};
