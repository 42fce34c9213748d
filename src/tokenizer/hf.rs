//! HuggingFace `tokenizer.json` integration via the `tokenizers` crate.

use super::config::AutoTokenizerOptions;
use super::traits::{Encoding, PretrainedTokenizer, TokenId, TokenizerResolver};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer as HfInner;

/// Serialized tokenizer file name
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Companion config file name
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";
/// Sequence limit used when the config does not declare one
pub const DEFAULT_MODEL_MAX_LENGTH: usize = 512;

/// Subset of `tokenizer_config.json` this crate reads and writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenizerConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_max_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pad_token: Option<String>,
}

/// Pretrained tokenizer backed by a HuggingFace `tokenizer.json`
pub struct HfTokenizer {
    inner: HfInner,
    name_or_path: String,
    model_max_length: usize,
    pad_id: TokenId,
    pad_token: Option<String>,
}

impl HfTokenizer {
    /// Load from a `tokenizer.json` file
    ///
    /// # Errors
    /// Returns `Tokenizer` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = HfInner::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("Failed to load {}: {e}", path.display())))?;
        Ok(Self::from_inner(inner, path.display().to_string(), None))
    }

    /// Load from a directory holding `tokenizer.json` and optionally
    /// `tokenizer_config.json`
    ///
    /// # Errors
    /// Returns `Tokenizer` if `tokenizer.json` is missing or invalid and
    /// `Serialization` if the config file is malformed.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let inner = HfInner::from_file(dir.join(TOKENIZER_FILE))
            .map_err(|e| Error::Tokenizer(format!("Failed to load {}: {e}", dir.join(TOKENIZER_FILE).display())))?;
        let config_path = dir.join(TOKENIZER_CONFIG_FILE);
        let config = if config_path.is_file() {
            let text = fs::read_to_string(&config_path)
                .map_err(|e| Error::io(format!("reading {}", config_path.display()), e))?;
            Some(serde_json::from_str::<TokenizerConfigFile>(&text)?)
        } else {
            None
        };
        Ok(Self::from_inner(inner, dir.display().to_string(), config))
    }

    fn from_inner(inner: HfInner, name_or_path: String, config: Option<TokenizerConfigFile>) -> Self {
        let config = config.unwrap_or_default();
        // Some tokenizer configs store "no limit" as a huge float.
        let model_max_length = config
            .model_max_length
            .filter(|v| v.is_finite() && *v > 0.0 && *v < 1e9)
            .map_or(DEFAULT_MODEL_MAX_LENGTH, |v| v as usize);
        let pad_id = config
            .pad_token
            .as_deref()
            .and_then(|t| inner.token_to_id(t))
            .or_else(|| inner.token_to_id("<pad>"))
            .or_else(|| inner.token_to_id("[PAD]"))
            .or_else(|| inner.token_to_id("<|endoftext|>"))
            .unwrap_or(0);
        Self { inner, name_or_path, model_max_length, pad_id, pad_token: config.pad_token }
    }

    /// Override the declared maximum sequence length
    pub fn with_model_max_length(mut self, model_max_length: usize) -> Self {
        self.model_max_length = model_max_length;
        self
    }

    /// Vocabulary size including added tokens
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Id of `token`, if it is in the vocabulary
    pub fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.inner.token_to_id(token)
    }
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("name_or_path", &self.name_or_path)
            .field("model_max_length", &self.model_max_length)
            .field("pad_id", &self.pad_id)
            .finish_non_exhaustive()
    }
}

impl PretrainedTokenizer for HfTokenizer {
    fn name_or_path(&self) -> &str {
        &self.name_or_path
    }

    fn model_max_length(&self) -> usize {
        self.model_max_length
    }

    fn pad_token_id(&self) -> TokenId {
        self.pad_id
    }

    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Encoding> {
        let enc = self
            .inner
            .encode(text, add_special_tokens)
            .map_err(|e| Error::Tokenizer(format!("Tokenization failed: {e}")))?;
        Ok(Encoding {
            input_ids: enc.get_ids().to_vec(),
            attention_mask: enc.get_attention_mask().to_vec(),
            token_type_ids: Some(enc.get_type_ids().to_vec()),
        })
    }

    fn decode(&self, ids: &[TokenId], skip_special_tokens: bool) -> Result<String> {
        self.inner
            .decode(ids, skip_special_tokens)
            .map_err(|e| Error::Tokenizer(format!("Decoding failed: {e}")))
    }

    fn save_pretrained(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        self.inner
            .save(dir.join(TOKENIZER_FILE), true)
            .map_err(|e| Error::Tokenizer(format!("Failed to save tokenizer: {e}")))?;
        let config = TokenizerConfigFile {
            model_max_length: Some(self.model_max_length as f64),
            pad_token: self.pad_token.clone(),
        };
        let path = dir.join(TOKENIZER_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(&config)?)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }
}

/// Resolves identifiers that are local paths
///
/// A directory must hold `tokenizer.json`; a file is read as `tokenizer.json`
/// directly. Remote hub lookup is not performed.
#[derive(Debug, Clone, Default)]
pub struct LocalTokenizerResolver {
    root: Option<PathBuf>,
}

impl LocalTokenizerResolver {
    /// Resolver for paths as given
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative identifiers under `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn locate(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl TokenizerResolver for LocalTokenizerResolver {
    fn resolve(&self, name: &str, options: &AutoTokenizerOptions) -> Result<Arc<dyn PretrainedTokenizer>> {
        let path = self.locate(name);
        let loaded = if path.is_dir() {
            HfTokenizer::from_dir(&path)
        } else if path.is_file() {
            HfTokenizer::from_file(&path)
        } else {
            Err(Error::Tokenizer("no such file or directory".into()))
        };
        let tokenizer = loaded.map_err(|e| Error::InvalidTokenizer {
            name: name.to_string(),
            reason: match e {
                Error::Tokenizer(msg) => msg,
                other => other.to_string(),
            },
        })?;
        let tokenizer = match options.model_max_length {
            Some(n) => tokenizer.with_model_max_length(n),
            None => tokenizer,
        };
        tracing::debug!(name, model_max_length = tokenizer.model_max_length(), "resolved tokenizer");
        Ok(Arc::new(tokenizer))
    }
}

/// Name-based tokenizer loading with the default local resolver
pub struct AutoTokenizer;

impl AutoTokenizer {
    /// Load a tokenizer from a local directory or `tokenizer.json` path
    ///
    /// # Errors
    /// Returns `InvalidTokenizer` naming `name` if nothing loadable is found.
    pub fn from_pretrained(name: &str, options: &AutoTokenizerOptions) -> Result<Arc<dyn PretrainedTokenizer>> {
        LocalTokenizerResolver::new().resolve(name, options)
    }
}
