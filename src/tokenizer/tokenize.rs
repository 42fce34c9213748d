//! Batched tokenization of dataset rows.

use super::config::TokenizeOptions;
use super::traits::PretrainedTokenizer;
use crate::data::{value_text, Example};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Tokenizes a chunk of rows, returning one output map per row
pub type TokenizeFn =
    Arc<dyn Fn(&[Example], &dyn PretrainedTokenizer, &TokenizeOptions) -> Result<Vec<Example>> + Send + Sync>;

/// Encode `options.text_column` of every row
///
/// Output rows hold `input_ids`, `attention_mask` and, when the tokenizer
/// produces them, `token_type_ids`.
///
/// # Errors
/// Returns `MissingColumn` if a row lacks the text column.
pub fn base_tokenize(
    rows: &[Example],
    tokenizer: &dyn PretrainedTokenizer,
    options: &TokenizeOptions,
) -> Result<Vec<Example>> {
    let texts = rows
        .iter()
        .map(|row| {
            row.get(&options.text_column)
                .map(value_text)
                .ok_or_else(|| Error::MissingColumn { column: format!("'{}'", options.text_column) })
        })
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    Ok(tokenizer
        .encode_batch(&refs, options)?
        .into_iter()
        .map(|enc| enc.into_example())
        .collect())
}

/// [`base_tokenize`] as a [`TokenizeFn`]
pub fn base_tokenize_fn() -> TokenizeFn {
    Arc::new(base_tokenize)
}
