//! Tokenization options and their resolution against a tokenizer's limits.

use serde::{Deserialize, Serialize};

/// Padding strategy applied after encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Leave sequences at their encoded length
    DoNotPad,
    /// Pad to the longest sequence in the batch
    Longest,
    /// Pad to `max_length` (or the tokenizer's limit when unset)
    #[default]
    MaxLength,
}

/// Options passed to the tokenizer for every batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizeOptions {
    /// Maximum sequence length; derived from the tokenizer when unset
    pub max_length: Option<usize>,
    /// Truncate sequences longer than `max_length`
    pub truncation: bool,
    /// Padding strategy
    pub padding: Padding,
    /// Add the tokenizer's special tokens
    pub add_special_tokens: bool,
    /// Row field holding the text to encode
    pub text_column: String,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            max_length: None,
            truncation: false,
            padding: Padding::MaxLength,
            add_special_tokens: true,
            text_column: "text".to_string(),
        }
    }
}

/// How `max_length` was settled against the tokenizer's limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthResolution {
    /// Caller's `max_length` fits the tokenizer
    WithinLimit { max_length: usize },
    /// Caller's `max_length` is larger than the tokenizer supports; kept as given
    ExceedsLimit { requested: usize, limit: usize },
    /// No `max_length` was given; set to the limit with truncation enabled
    Derived { max_length: usize },
}

impl TokenizeOptions {
    /// Set `max_length`
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Enable or disable truncation
    pub fn with_truncation(mut self, truncation: bool) -> Self {
        self.truncation = truncation;
        self
    }

    /// Set the padding strategy
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Set the text column
    pub fn with_text_column(mut self, column: impl Into<String>) -> Self {
        self.text_column = column.into();
        self
    }

    /// Settle `max_length` against `model_max_length`
    ///
    /// A missing `max_length` is derived from the limit and truncation is
    /// switched on. A larger-than-limit value is only reported, never clamped.
    pub fn resolve_against(&mut self, model_max_length: usize) -> LengthResolution {
        match self.max_length {
            Some(max_length) if max_length <= model_max_length => LengthResolution::WithinLimit { max_length },
            Some(requested) => LengthResolution::ExceedsLimit { requested, limit: model_max_length },
            None => {
                self.max_length = Some(model_max_length);
                self.truncation = true;
                LengthResolution::Derived { max_length: model_max_length }
            }
        }
    }
}

/// Options used when resolving a tokenizer by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTokenizerOptions {
    /// Override the tokenizer's declared maximum sequence length
    pub model_max_length: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = TokenizeOptions::default();
        assert_eq!(opts.max_length, None);
        assert!(!opts.truncation);
        assert_eq!(opts.padding, Padding::MaxLength);
        assert_eq!(opts.text_column, "text");
    }

    #[test]
    fn test_resolve_derives_and_truncates() {
        let mut opts = TokenizeOptions::default();
        assert_eq!(opts.resolve_against(128), LengthResolution::Derived { max_length: 128 });
        assert_eq!(opts.max_length, Some(128));
        assert!(opts.truncation);
    }

    #[test]
    fn test_resolve_within_limit_unchanged() {
        let mut opts = TokenizeOptions::default().with_max_length(64);
        assert_eq!(opts.resolve_against(128), LengthResolution::WithinLimit { max_length: 64 });
        assert!(!opts.truncation);
    }

    #[test]
    fn test_resolve_exceeding_limit_kept() {
        let mut opts = TokenizeOptions::default().with_max_length(1024);
        assert_eq!(
            opts.resolve_against(512),
            LengthResolution::ExceedsLimit { requested: 1024, limit: 512 }
        );
        assert_eq!(opts.max_length, Some(1024));
    }

    #[test]
    fn test_yaml_partial() {
        let opts: TokenizeOptions = serde_yaml::from_str("max_length: 32\npadding: longest\n").unwrap();
        assert_eq!(opts.max_length, Some(32));
        assert_eq!(opts.padding, Padding::Longest);
        assert!(opts.add_special_tokens);
    }
}
