//! Binding raw datasets to a tokenizer and producing loaders.

use super::bundle::{AdaptiveDataLoaders, LabelDecoding};
use super::categorize::Categorize;
use super::collate::{default_collate_fn, CollateFn};
use super::dataset::{Dataset, Example, DEFAULT_MAP_BATCH_SIZE};
use super::loader::DataLoader;
use super::splitter::RandomSplitter;
use crate::config::FinetuneConfig;
use crate::error::{Error, Result};
use crate::tensor::Device;
use crate::tokenizer::{
    base_tokenize_fn, AutoTokenizerOptions, LengthResolution, LocalTokenizerResolver, PretrainedTokenizer,
    TokenizeFn, TokenizeOptions, TokenizerResolver,
};
use std::fmt;
use std::sync::Arc;

/// Options for [`TaskDatasets::dataloaders`]
#[derive(Clone)]
pub struct LoaderOptions {
    /// Batch size for both loaders
    pub batch_size: usize,
    /// Shuffle the training loader
    pub shuffle_train: bool,
    /// Drop a trailing partial batch
    pub drop_last: bool,
    /// Shuffle seed
    pub seed: Option<u64>,
    /// Device batches are sent to
    pub device: Device,
    /// Custom collation; the default collator when `None`
    pub collate_fn: Option<CollateFn>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { batch_size: 8, shuffle_train: true, drop_last: false, seed: None, device: Device::Cpu, collate_fn: None }
    }
}

impl fmt::Debug for LoaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderOptions")
            .field("batch_size", &self.batch_size)
            .field("shuffle_train", &self.shuffle_train)
            .field("drop_last", &self.drop_last)
            .field("seed", &self.seed)
            .field("device", &self.device)
            .field("collate_fn", &self.collate_fn.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Train and validation datasets for one task, with the tokenizer that prepares them
///
/// Build with [`TaskDatasets::builder`]. Tokenization options are settled
/// against the tokenizer's limit once, when the datasets are built.
///
/// # Example
///
/// ```rust,ignore
/// use afinar::data::{Dataset, LoaderOptions, TaskDatasets};
///
/// let dsets = TaskDatasets::builder(Dataset::from_jsonl("train.jsonl")?, Dataset::from_jsonl("valid.jsonl")?)
///     .tokenizer_name("models/bert-base")
///     .remove_cols(["text"])
///     .build()?;
/// let dls = dsets.dataloaders(LoaderOptions::default())?;
/// println!("{}", dls.show_batch(0, 4, false)?);
/// ```
pub struct TaskDatasets {
    train: Arc<Dataset>,
    valid: Arc<Dataset>,
    tokenizer: Option<Arc<dyn PretrainedTokenizer>>,
    resolver: Arc<dyn TokenizerResolver>,
    tokenize_fn: TokenizeFn,
    tokenize_options: TokenizeOptions,
    length_resolution: Option<LengthResolution>,
    remove_cols: Vec<String>,
    label_keys: Vec<String>,
    categorize: Option<Categorize<String>>,
    tokenized: bool,
}

impl TaskDatasets {
    /// Start building from raw train and validation datasets
    pub fn builder(train: Dataset, valid: Dataset) -> TaskDatasetsBuilder {
        TaskDatasetsBuilder::new(train, valid)
    }

    /// Build from a validated [`FinetuneConfig`]
    ///
    /// Loads `data.train` and `data.valid` as JSON Lines. Without a
    /// validation file the training file is split with `data.valid_pct`.
    ///
    /// # Errors
    /// Propagates loading, splitting, tokenizer and tokenization errors.
    pub fn from_config(config: &FinetuneConfig) -> Result<Self> {
        config.validate()?;
        let data = &config.data;
        let (train, valid) = match &data.valid {
            Some(valid) => (Dataset::from_jsonl(&data.train)?, Dataset::from_jsonl(valid)?),
            None => {
                let mut splitter = RandomSplitter::new(data.valid_pct);
                if let Some(seed) = data.split_seed {
                    splitter = splitter.with_seed(seed);
                }
                Dataset::from_jsonl(&data.train)?.split(&splitter)?
            }
        };

        let mut builder = Self::builder(train, valid)
            .tokenize(config.tokenizer.tokenize)
            .tokenize_options(config.tokenizer.options.clone())
            .auto_options(config.tokenizer.auto.clone())
            .remove_cols(data.remove_cols.clone())
            .label_keys(data.label_keys.clone());
        if let Some(name) = &config.tokenizer.name {
            builder = builder.tokenizer_name(name.clone());
        }
        let mut dsets = builder.build()?;
        if let Some(classes) = &data.classes {
            dsets.set_classes(classes.clone());
        }
        Ok(dsets)
    }

    /// Training row `idx`
    pub fn get(&self, idx: usize) -> Option<&Example> {
        self.train.get(idx)
    }

    /// Training dataset
    pub fn train(&self) -> &Dataset {
        &self.train
    }

    /// Validation dataset
    pub fn valid(&self) -> &Dataset {
        &self.valid
    }

    /// Current tokenizer
    pub fn tokenizer(&self) -> Option<&Arc<dyn PretrainedTokenizer>> {
        self.tokenizer.as_ref()
    }

    /// Tokenization options after length resolution
    pub fn tokenize_options(&self) -> &TokenizeOptions {
        &self.tokenize_options
    }

    /// Outcome of settling `max_length`, if a tokenizer was present at build time
    pub fn length_resolution(&self) -> Option<LengthResolution> {
        self.length_resolution
    }

    /// Label field names
    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Columns removed by tokenization
    pub fn remove_cols(&self) -> &[String] {
        &self.remove_cols
    }

    /// Class vocabulary, if set
    pub fn categorize(&self) -> Option<&Categorize<String>> {
        self.categorize.as_ref()
    }

    /// Whether tokenization has been applied
    pub fn is_tokenized(&self) -> bool {
        self.tokenized
    }

    /// Tokenize both datasets in batches
    ///
    /// `remove_cols` are dropped and the tokenizer's output fields added to
    /// every row. Row counts are preserved.
    ///
    /// # Errors
    /// Returns `MissingTokenizer` if no tokenizer is set, otherwise errors
    /// from the tokenize function.
    pub fn tokenize(&mut self) -> Result<()> {
        let tokenizer = self.tokenizer.clone().ok_or(Error::MissingTokenizer)?;
        let f = &self.tokenize_fn;
        let opts = &self.tokenize_options;
        let train = self.train.map_batched(DEFAULT_MAP_BATCH_SIZE, &self.remove_cols, |rows| {
            f(rows, tokenizer.as_ref(), opts)
        })?;
        let valid = self.valid.map_batched(DEFAULT_MAP_BATCH_SIZE, &self.remove_cols, |rows| {
            f(rows, tokenizer.as_ref(), opts)
        })?;
        self.train = Arc::new(train);
        self.valid = Arc::new(valid);
        self.tokenized = true;
        tracing::debug!(train = self.train.len(), valid = self.valid.len(), "tokenized datasets");
        Ok(())
    }

    /// Load and set the tokenizer named `name`
    ///
    /// An existing tokenizer is kept unless `override_existing` is set.
    /// Returns whether the tokenizer was replaced.
    ///
    /// # Errors
    /// Returns `InvalidTokenizer` if `name` cannot be resolved.
    pub fn set_tokenizer(&mut self, name: &str, override_existing: bool, options: &AutoTokenizerOptions) -> Result<bool> {
        if !self.accept_new_tokenizer(name, override_existing) {
            return Ok(false);
        }
        self.tokenizer = Some(self.resolver.resolve(name, options)?);
        Ok(true)
    }

    /// Set an already loaded tokenizer, with the same override rule as
    /// [`TaskDatasets::set_tokenizer`]
    pub fn set_tokenizer_instance(&mut self, tokenizer: Arc<dyn PretrainedTokenizer>, override_existing: bool) -> bool {
        if !self.accept_new_tokenizer(tokenizer.name_or_path(), override_existing) {
            return false;
        }
        self.tokenizer = Some(tokenizer);
        true
    }

    fn accept_new_tokenizer(&self, name: &str, override_existing: bool) -> bool {
        match &self.tokenizer {
            Some(existing) if !override_existing => {
                tracing::warn!(
                    "You are trying to override an existing tokenizer: {}. Pass override_existing=true to use a new tokenizer",
                    existing.name_or_path()
                );
                false
            }
            Some(_) => {
                tracing::info!("Setting new tokenizer to {name}");
                true
            }
            None => true,
        }
    }

    /// Replace the class vocabulary with the sorted `classes`
    pub fn set_classes(&mut self, classes: Vec<String>) {
        self.categorize = Some(Categorize::new(classes, true));
    }

    /// Build train and validation loaders
    ///
    /// The validation loader never shuffles. Labels are decoded through the
    /// class vocabulary when one is set, otherwise through the tokenizer.
    ///
    /// # Errors
    /// Returns `Config` for a zero batch size.
    pub fn dataloaders(&self, options: LoaderOptions) -> Result<AdaptiveDataLoaders> {
        let collate = options.collate_fn.unwrap_or_else(default_collate_fn);
        let train = DataLoader::new(self.train.clone(), options.batch_size)?
            .with_shuffle(options.shuffle_train)
            .with_drop_last(options.drop_last)
            .with_seed(options.seed)
            .with_collate(collate.clone());
        let valid = DataLoader::new(self.valid.clone(), options.batch_size)?
            .with_drop_last(options.drop_last)
            .with_collate(collate);
        let decoding = self.categorize.clone().map_or(LabelDecoding::Generation, LabelDecoding::Classification);
        Ok(AdaptiveDataLoaders::new(train, valid)
            .with_tokenizer(self.tokenizer.clone())
            .with_label_keys(self.label_keys.clone())
            .with_decoding(decoding)
            .with_device(options.device))
    }
}

impl fmt::Debug for TaskDatasets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDatasets")
            .field("train", &self.train.len())
            .field("valid", &self.valid.len())
            .field("tokenizer", &self.tokenizer.as_ref().map(|t| t.name_or_path().to_string()))
            .field("tokenize_options", &self.tokenize_options)
            .field("label_keys", &self.label_keys)
            .field("tokenized", &self.tokenized)
            .finish()
    }
}

/// Builder for [`TaskDatasets`]
pub struct TaskDatasetsBuilder {
    train: Dataset,
    valid: Dataset,
    tokenizer_name: Option<String>,
    tokenizer: Option<Arc<dyn PretrainedTokenizer>>,
    resolver: Option<Arc<dyn TokenizerResolver>>,
    tokenize: bool,
    tokenize_fn: Option<TokenizeFn>,
    tokenize_options: TokenizeOptions,
    auto_options: AutoTokenizerOptions,
    remove_cols: Vec<String>,
    label_keys: Vec<String>,
}

impl TaskDatasetsBuilder {
    fn new(train: Dataset, valid: Dataset) -> Self {
        Self {
            train,
            valid,
            tokenizer_name: None,
            tokenizer: None,
            resolver: None,
            tokenize: true,
            tokenize_fn: None,
            tokenize_options: TokenizeOptions::default(),
            auto_options: AutoTokenizerOptions::default(),
            remove_cols: Vec::new(),
            label_keys: vec!["labels".to_string()],
        }
    }

    /// Tokenizer identifier, resolved when building
    pub fn tokenizer_name(mut self, name: impl Into<String>) -> Self {
        self.tokenizer_name = Some(name.into());
        self
    }

    /// Already loaded tokenizer; takes precedence over `tokenizer_name`
    pub fn tokenizer(mut self, tokenizer: Arc<dyn PretrainedTokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Resolver for tokenizer identifiers
    pub fn resolver(mut self, resolver: Arc<dyn TokenizerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Tokenize while building (default `true`)
    pub fn tokenize(mut self, tokenize: bool) -> Self {
        self.tokenize = tokenize;
        self
    }

    /// Replace the tokenize function
    pub fn tokenize_fn(mut self, f: TokenizeFn) -> Self {
        self.tokenize_fn = Some(f);
        self
    }

    /// Options handed to the tokenizer
    pub fn tokenize_options(mut self, options: TokenizeOptions) -> Self {
        self.tokenize_options = options;
        self
    }

    /// Options used when resolving `tokenizer_name`
    pub fn auto_options(mut self, options: AutoTokenizerOptions) -> Self {
        self.auto_options = options;
        self
    }

    /// Columns dropped by tokenization
    pub fn remove_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Fields holding targets (default `["labels"]`)
    pub fn label_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve the tokenizer, settle options and optionally tokenize
    ///
    /// # Errors
    /// Returns `InvalidTokenizer` if `tokenizer_name` cannot be resolved and
    /// tokenization errors when tokenizing.
    pub fn build(self) -> Result<TaskDatasets> {
        let resolver: Arc<dyn TokenizerResolver> =
            self.resolver.unwrap_or_else(|| Arc::new(LocalTokenizerResolver::new()));
        let tokenizer = match (self.tokenizer, &self.tokenizer_name) {
            (Some(tok), _) => Some(tok),
            (None, Some(name)) => Some(resolver.resolve(name, &self.auto_options)?),
            (None, None) => None,
        };

        let mut tokenize_options = self.tokenize_options;
        let length_resolution = tokenizer.as_ref().map(|tok| {
            let resolution = tokenize_options.resolve_against(tok.model_max_length());
            match resolution {
                LengthResolution::WithinLimit { .. } => {}
                LengthResolution::ExceedsLimit { requested, limit } => {
                    tracing::warn!(requested, limit, "max_length is larger than the pretrained model supports");
                }
                LengthResolution::Derived { max_length } => {
                    tracing::info!("No value for max_length set, automatically adjusting to the size of the model and including truncation");
                    tracing::info!("Sequence length set to: {max_length}");
                }
            }
            resolution
        });

        let mut dsets = TaskDatasets {
            train: Arc::new(self.train),
            valid: Arc::new(self.valid),
            tokenizer,
            resolver,
            tokenize_fn: self.tokenize_fn.unwrap_or_else(base_tokenize_fn),
            tokenize_options,
            length_resolution,
            remove_cols: self.remove_cols,
            label_keys: self.label_keys,
            categorize: None,
            tokenized: false,
        };

        if self.tokenize {
            if dsets.tokenizer.is_some() {
                dsets.tokenize()?;
            } else {
                tracing::warn!(
                    "Tried to tokenize a dataset without a tokenizer. Set a tokenizer with set_tokenizer() and call tokenize()"
                );
            }
        }
        Ok(dsets)
    }
}
