//! Evaluation metrics for validation
//!
//! - [`Accuracy`]: argmax over logits, or a threshold for 1-D scores

mod classification;
mod trait_def;


pub use classification::Accuracy;
pub use trait_def::Metric;
