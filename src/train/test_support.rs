//! Shared fixtures for learner and tuner tests

use crate::data::{AdaptiveDataLoaders, DataLoader, Dataset};
use crate::error::{Error, Result};
use crate::model::{LinearClassifier, Parameter};
use crate::optim::{Optimizer, SGD};
use crate::train::Learner;
use serde_json::json;
use std::sync::Arc;

/// Two linearly separable classes in two dimensions
pub(crate) fn toy_dataset(rows: usize, with_labels: bool) -> Dataset {
    let values = (0..rows).map(|i| {
        let label = i % 2;
        let jitter = 0.1 * (i % 3) as f32;
        let x = if label == 0 { [1.0, jitter] } else { [jitter, 1.0] };
        if with_labels {
            json!({ "input_ids": x, "labels": label })
        } else {
            json!({ "input_ids": x })
        }
    });
    Dataset::from_values(values).unwrap()
}

pub(crate) fn toy_dls_with(train_rows: usize, valid_rows: usize, with_labels: bool) -> AdaptiveDataLoaders {
    let train = DataLoader::new(Arc::new(toy_dataset(train_rows, with_labels)), 4).unwrap();
    let valid = DataLoader::new(Arc::new(toy_dataset(valid_rows, with_labels)), 4).unwrap();
    AdaptiveDataLoaders::new(train, valid)
}

/// 16 training and 8 validation rows in batches of 4, unshuffled
pub(crate) fn toy_dls() -> AdaptiveDataLoaders {
    toy_dls_with(16, 8, true)
}

/// Linear classifier over [`toy_dls`] with plain SGD at lr 0.1
pub(crate) fn learner() -> Learner {
    Learner::new(toy_dls(), Box::new(LinearClassifier::new(2, 2, 0)), Box::new(SGD::new(0.1, 0.0)))
}

/// Optimizer whose every update fails with a non-step error
#[derive(Debug, Default)]
pub(crate) struct FailingOptimizer;

impl Optimizer for FailingOptimizer {
    fn step(&mut self, _params: &mut [&mut Parameter]) -> Result<()> {
        Err(Error::Validation("gradient is not finite".into()))
    }

    fn lr(&self) -> f32 {
        0.1
    }

    fn set_lr(&mut self, _lr: f32) {}

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Failing"
    }
}

/// Linear classifier over [`toy_dls`] whose optimizer step always fails
pub(crate) fn failing_learner() -> Learner {
    Learner::new(toy_dls(), Box::new(LinearClassifier::new(2, 2, 0)), Box::new(FailingOptimizer))
}
