//! Task-level fine-tuning front end
//!
//! [`AdaptiveTuner`] owns a [`Learner`] and exposes what task code needs:
//! tuning with a named [`Strategy`], learning-rate search, and persisting
//! the model together with its tokenizer.

use super::callback::TrainerCallback;
use super::trainer::{Learner, LrFindResult, TrainResult, TuneOptions};
use super::{LossFn, Metric, Strategy};
use crate::data::AdaptiveDataLoaders;
use crate::error::{Error, Result};
use crate::model::{load_pretrained, save_pretrained, PretrainedModel};
use crate::tensor::Device;
use crate::tokenizer::{AutoTokenizerOptions, LocalTokenizerResolver, PretrainedTokenizer, TokenizerResolver, TOKENIZER_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable holding the process rank in distributed runs
pub const RANK_ENV: &str = "RANK";

/// Operations specialised tuners provide on top of [`AdaptiveTuner`]
pub trait TaskTuner {
    /// Run inference on raw task inputs
    ///
    /// # Errors
    /// The default returns `NotImplemented`.
    fn predict(&self, _inputs: &[serde_json::Value]) -> Result<Vec<serde_json::Value>> {
        Err(Error::NotImplemented { operation: "predict", type_name: std::any::type_name::<Self>() })
    }

    /// Export the tuned model for deployment
    ///
    /// # Errors
    /// The default returns `NotImplemented`.
    fn export(&self, _path: &Path) -> Result<PathBuf> {
        Err(Error::NotImplemented { operation: "export", type_name: std::any::type_name::<Self>() })
    }
}

/// Fine-tunes a pretrained model on task loaders
///
/// # Example
///
/// ```no_run
/// use afinar::train::{AdaptiveTuner, Learner, Strategy};
/// # fn run(learner: Learner) -> afinar::Result<()> {
/// let mut tuner = AdaptiveTuner::new(learner, None, None)?;
/// tuner.tune(3, None, Strategy::OneCycle, Vec::new())?;
/// tuner.save("checkpoints/run-1")?;
/// # Ok(())
/// # }
/// ```
pub struct AdaptiveTuner {
    learner: Learner,
    tokenizer: Option<Arc<dyn PretrainedTokenizer>>,
    resolver: Arc<dyn TokenizerResolver>,
    rank: Option<usize>,
}

impl AdaptiveTuner {
    /// Wrap `learner`
    ///
    /// The tokenizer defaults to the loaders' tokenizer and the label keys to
    /// the loaders' label keys.
    ///
    /// # Errors
    /// Returns `MissingLabelKeys` when neither `label_keys` nor the loaders
    /// name any.
    pub fn new(
        mut learner: Learner,
        tokenizer: Option<Arc<dyn PretrainedTokenizer>>,
        label_keys: Option<Vec<String>>,
    ) -> Result<Self> {
        let label_keys = label_keys.unwrap_or_else(|| learner.dls().label_keys().to_vec());
        if label_keys.is_empty() {
            return Err(Error::MissingLabelKeys);
        }
        learner.label_keys = label_keys;
        let tokenizer = tokenizer.or_else(|| learner.dls().tokenizer().cloned());
        Ok(Self { learner, tokenizer, resolver: Arc::new(LocalTokenizerResolver::new()), rank: None })
    }

    /// Resolver used to reload tokenizers in [`AdaptiveTuner::load`]
    pub fn with_resolver(mut self, resolver: Arc<dyn TokenizerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Fix the process rank instead of reading `RANK`
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Process rank; 0 unless overridden or set through `RANK`
    pub fn rank(&self) -> usize {
        self.rank
            .or_else(|| std::env::var(RANK_ENV).ok().and_then(|v| v.trim().parse().ok()))
            .unwrap_or(0)
    }

    /// Loaders of the wrapped learner
    pub fn dls(&self) -> &AdaptiveDataLoaders {
        self.learner.dls()
    }

    /// Model being tuned
    pub fn model(&self) -> &dyn PretrainedModel {
        self.learner.model()
    }

    /// Mutable access to the model being tuned
    pub fn model_mut(&mut self) -> &mut dyn PretrainedModel {
        self.learner.model_mut()
    }

    /// Loss function applied when the model reports no loss
    pub fn loss_fn(&self) -> Option<&dyn LossFn> {
        self.learner.loss_fn()
    }

    /// Validation metrics
    pub fn metrics(&self) -> &[Box<dyn Metric>] {
        self.learner.metrics()
    }

    /// The wrapped learner
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    /// Mutable access to the wrapped learner
    pub fn learner_mut(&mut self) -> &mut Learner {
        &mut self.learner
    }

    /// Tokenizer saved and reloaded alongside the weights
    pub fn tokenizer(&self) -> Option<&Arc<dyn PretrainedTokenizer>> {
        self.tokenizer.as_ref()
    }

    /// Batch fields stacked as targets
    pub fn label_keys(&self) -> &[String] {
        self.learner.label_keys()
    }

    /// Search for a learning rate with the learner's finder
    ///
    /// # Errors
    /// See [`Learner::lr_find`].
    pub fn lr_find(&mut self, options: &TuneOptions) -> Result<LrFindResult> {
        self.learner.lr_find(&options.lr_find)
    }

    /// Fine-tune for `epochs` with `strategy`
    ///
    /// Without `lr` a learning-rate search runs first and its suggestion is
    /// used. `callbacks` are attached for this call only.
    ///
    /// # Errors
    /// Propagates search and fitting errors; the extra callbacks are removed
    /// either way.
    pub fn tune(
        &mut self,
        epochs: usize,
        lr: Option<f32>,
        strategy: Strategy,
        callbacks: Vec<Box<dyn TrainerCallback>>,
    ) -> Result<TrainResult> {
        self.tune_with(epochs, lr, strategy, callbacks, &TuneOptions::default())
    }

    /// [`AdaptiveTuner::tune`] with explicit schedule and search options
    ///
    /// # Errors
    /// See [`AdaptiveTuner::tune`].
    pub fn tune_with(
        &mut self,
        epochs: usize,
        lr: Option<f32>,
        strategy: Strategy,
        callbacks: Vec<Box<dyn TrainerCallback>>,
        options: &TuneOptions,
    ) -> Result<TrainResult> {
        let base = self.learner.callbacks().len();
        for cb in callbacks {
            self.learner.callbacks_mut().add_boxed(cb);
        }
        let result = self.run_tune(epochs, lr, strategy, options);
        self.learner.callbacks_mut().truncate(base);
        result
    }

    /// [`AdaptiveTuner::tune`] with the strategy given by name
    ///
    /// # Errors
    /// Returns `UnknownStrategy` before any training when `strategy` is not
    /// recognised.
    pub fn tune_named(
        &mut self,
        epochs: usize,
        lr: Option<f32>,
        strategy: &str,
        callbacks: Vec<Box<dyn TrainerCallback>>,
    ) -> Result<TrainResult> {
        let strategy: Strategy = strategy.parse()?;
        self.tune(epochs, lr, strategy, callbacks)
    }

    fn run_tune(&mut self, epochs: usize, lr: Option<f32>, strategy: Strategy, options: &TuneOptions) -> Result<TrainResult> {
        let lr = match lr {
            Some(lr) => lr,
            None => self.learner.lr_find(&options.lr_find)?.suggestion,
        };
        tracing::info!("Tuning {} for {} epochs with {} at lr {:.2e}", self.model().name(), epochs, strategy, lr);
        self.learner.fit_strategy(strategy, epochs, Some(lr), options)
    }

    /// Save the model and tokenizer to `dir`
    ///
    /// Returns `None` without writing anything on a non-zero rank.
    ///
    /// # Errors
    /// Propagates model and tokenizer persistence errors.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let dir = dir.as_ref();
        let rank = self.rank();
        if rank != 0 {
            tracing::info!("Skipping save on rank {}", rank);
            return Ok(None);
        }
        let saved = save_pretrained(self.model(), dir)?;
        if let Some(tokenizer) = &self.tokenizer {
            tokenizer.save_pretrained(dir)?;
        }
        Ok(Some(saved))
    }

    /// Restore model weights and the tokenizer from `dir`
    ///
    /// The model is moved to `device`, or to the loaders' device when `None`.
    /// The tokenizer is reloaded when `dir` holds one.
    ///
    /// # Errors
    /// Returns `Model` or `ShapeMismatch` when the weights do not fit the
    /// model, and `InvalidTokenizer` when a saved tokenizer cannot be read.
    pub fn load(&mut self, dir: impl AsRef<Path>, device: Option<Device>) -> Result<()> {
        let dir = dir.as_ref();
        load_pretrained(self.learner.model_mut(), dir)?;
        let device = device.unwrap_or_else(|| self.dls().device());
        self.learner.model_mut().to_device(device);

        if dir.join(TOKENIZER_FILE).is_file() {
            let name = dir.to_string_lossy();
            self.tokenizer = Some(self.resolver.resolve(&name, &AutoTokenizerOptions::default())?);
        }
        tracing::info!("Loaded {} from {} onto {}", self.model().name(), dir.display(), device);
        Ok(())
    }
}

impl TaskTuner for AdaptiveTuner {}

impl std::fmt::Debug for AdaptiveTuner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveTuner")
            .field("learner", &self.learner)
            .field("tokenizer", &self.tokenizer.as_ref().map(|t| t.name_or_path().to_string()))
            .field("rank", &self.rank)
            .finish_non_exhaustive()
    }
}
