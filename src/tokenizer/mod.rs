//! Pretrained tokenizers and tokenization orchestration
//!
//! Tokenizers are reached through the [`PretrainedTokenizer`] trait so that
//! datasets, loaders and tuners can share one read-only instance. The
//! bundled implementation, [`HfTokenizer`], loads HuggingFace
//! `tokenizer.json` files with the `tokenizers` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use afinar::tokenizer::{AutoTokenizer, AutoTokenizerOptions, TokenizeOptions};
//!
//! fn example() -> afinar::Result<()> {
//!     let tokenizer = AutoTokenizer::from_pretrained("models/bert-base", &AutoTokenizerOptions::default())?;
//!     let opts = TokenizeOptions::default().with_max_length(32).with_truncation(true);
//!     let encodings = tokenizer.encode_batch(&["Hello, world!"], &opts)?;
//!     Ok(())
//! }
//! ```

mod config;
mod hf;
mod tokenize;
mod traits;

pub use config::{AutoTokenizerOptions, LengthResolution, Padding, TokenizeOptions};
pub use hf::{
    AutoTokenizer, HfTokenizer, LocalTokenizerResolver, DEFAULT_MODEL_MAX_LENGTH, TOKENIZER_CONFIG_FILE,
    TOKENIZER_FILE,
};
pub use tokenize::{base_tokenize, base_tokenize_fn, TokenizeFn};
pub use traits::{Encoding, PretrainedTokenizer, TokenId, TokenizerResolver};
