//! Tokenizer trait definitions.

use super::config::{AutoTokenizerOptions, Padding, TokenizeOptions};
use crate::data::Example;
use crate::error::Result;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Token ID type
pub type TokenId = u32;

/// Output of encoding one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    /// Token ids
    pub input_ids: Vec<TokenId>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u32>,
    /// Segment ids, when the tokenizer produces them
    pub token_type_ids: Option<Vec<u32>>,
}

impl Encoding {
    /// Encoding of `ids` with a full attention mask
    pub fn from_ids(ids: Vec<TokenId>) -> Self {
        let attention_mask = vec![1; ids.len()];
        Self { input_ids: ids, attention_mask, token_type_ids: None }
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Check if there are no tokens
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Cut to at most `max_len` tokens
    pub fn truncate(&mut self, max_len: usize) {
        self.input_ids.truncate(max_len);
        self.attention_mask.truncate(max_len);
        if let Some(types) = &mut self.token_type_ids {
            types.truncate(max_len);
        }
    }

    /// Right-pad to `len` tokens with `pad_id`
    pub fn pad_to(&mut self, len: usize, pad_id: TokenId) {
        if self.input_ids.len() >= len {
            return;
        }
        self.input_ids.resize(len, pad_id);
        self.attention_mask.resize(len, 0);
        if let Some(types) = &mut self.token_type_ids {
            types.resize(len, 0);
        }
    }

    /// Fields as a dataset row
    pub fn into_example(self) -> Example {
        let mut row = Example::new();
        row.insert("input_ids".into(), Value::from(self.input_ids));
        row.insert("attention_mask".into(), Value::from(self.attention_mask));
        if let Some(types) = self.token_type_ids {
            row.insert("token_type_ids".into(), Value::from(types));
        }
        row
    }
}

/// A pretrained tokenizer
///
/// Implementations supply single-text encoding and decoding; batch
/// encoding with truncation and padding is provided on top.
pub trait PretrainedTokenizer: Send + Sync {
    /// Identifier the tokenizer was loaded from
    fn name_or_path(&self) -> &str;

    /// Largest sequence length the paired model accepts
    fn model_max_length(&self) -> usize;

    /// Id used for padding
    fn pad_token_id(&self) -> TokenId;

    /// Encode one text
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Encoding>;

    /// Decode ids back to text
    fn decode(&self, ids: &[TokenId], skip_special_tokens: bool) -> Result<String>;

    /// Persist the tokenizer into `dir`
    fn save_pretrained(&self, dir: &Path) -> Result<()>;

    /// Encode many texts, applying truncation and padding from `options`
    fn encode_batch(&self, texts: &[&str], options: &TokenizeOptions) -> Result<Vec<Encoding>> {
        let max_length = options.max_length.unwrap_or_else(|| self.model_max_length());
        let mut encodings = texts
            .iter()
            .map(|t| {
                let mut enc = self.encode(t, options.add_special_tokens)?;
                if options.truncation {
                    enc.truncate(max_length);
                }
                Ok(enc)
            })
            .collect::<Result<Vec<_>>>()?;

        let target = match options.padding {
            Padding::DoNotPad => None,
            Padding::Longest => encodings.iter().map(Encoding::len).max(),
            Padding::MaxLength => Some(max_length),
        };
        if let Some(len) = target {
            let pad = self.pad_token_id();
            for enc in &mut encodings {
                enc.pad_to(len, pad);
            }
        }
        Ok(encodings)
    }

    /// Decode many id sequences
    fn batch_decode(&self, sequences: &[Vec<TokenId>], skip_special_tokens: bool) -> Result<Vec<String>> {
        sequences.iter().map(|ids| self.decode(ids, skip_special_tokens)).collect()
    }
}

/// Resolves a tokenizer identifier to a loaded tokenizer
pub trait TokenizerResolver: Send + Sync {
    /// Load the tokenizer named `name`
    fn resolve(&self, name: &str, options: &AutoTokenizerOptions) -> Result<Arc<dyn PretrainedTokenizer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One id per whitespace-separated word, by word length
    struct LenTokenizer;

    impl PretrainedTokenizer for LenTokenizer {
        fn name_or_path(&self) -> &str {
            "len"
        }
        fn model_max_length(&self) -> usize {
            4
        }
        fn pad_token_id(&self) -> TokenId {
            0
        }
        fn encode(&self, text: &str, _: bool) -> Result<Encoding> {
            Ok(Encoding::from_ids(text.split_whitespace().map(|w| w.len() as u32).collect()))
        }
        fn decode(&self, ids: &[TokenId], _: bool) -> Result<String> {
            Ok(ids.iter().map(|i| "x".repeat(*i as usize)).collect::<Vec<_>>().join(" "))
        }
        fn save_pretrained(&self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encoding_pad_and_truncate() {
        let mut enc = Encoding::from_ids(vec![5, 6, 7]);
        enc.pad_to(5, 0);
        assert_eq!(enc.input_ids, vec![5, 6, 7, 0, 0]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 0, 0]);
        enc.truncate(2);
        assert_eq!(enc.len(), 2);
        assert_eq!(enc.attention_mask, vec![1, 1]);
    }

    #[test]
    fn test_into_example() {
        let row = Encoding::from_ids(vec![1, 2]).into_example();
        assert_eq!(row["input_ids"], serde_json::json!([1, 2]));
        assert_eq!(row["attention_mask"], serde_json::json!([1, 1]));
        assert!(!row.contains_key("token_type_ids"));
    }

    #[test]
    fn test_encode_batch_pads_to_max_length() {
        let opts = TokenizeOptions::default().with_max_length(3).with_truncation(true);
        let out = LenTokenizer.encode_batch(&["a bb ccc dddd", "ee"], &opts).unwrap();
        assert_eq!(out[0].input_ids, vec![1, 2, 3]);
        assert_eq!(out[1].input_ids, vec![2, 0, 0]);
    }

    #[test]
    fn test_encode_batch_longest() {
        let opts = TokenizeOptions::default().with_padding(Padding::Longest);
        let out = LenTokenizer.encode_batch(&["a bb", "c"], &opts).unwrap();
        assert_eq!(out[1].input_ids, vec![1, 0]);
    }

    #[test]
    fn test_encode_batch_without_truncation_keeps_length() {
        let opts = TokenizeOptions::default().with_max_length(2).with_padding(Padding::DoNotPad);
        let out = LenTokenizer.encode_batch(&["a b c"], &opts).unwrap();
        assert_eq!(out[0].len(), 3);
    }

    #[test]
    fn test_batch_decode() {
        let out = LenTokenizer.batch_decode(&[vec![1, 2], vec![3]], true).unwrap();
        assert_eq!(out, vec!["x xx", "xxx"]);
    }
}
