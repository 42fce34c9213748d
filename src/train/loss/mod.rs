//! Loss functions for training
//!
//! - [`CrossEntropyLoss`] - single-label classification over logits
//! - [`MSELoss`] - Mean Squared Error for regression
//!
//! A loss returns its value together with the gradient w.r.t. the
//! predictions, which the learner hands to the model's backward pass.

mod cross_entropy;
mod mse;
mod traits;

pub use cross_entropy::{CrossEntropyLoss, IGNORE_INDEX};
pub use mse::MSELoss;
pub use traits::{Loss, LossFn};
