//! Error types with actionable diagnostics.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants are
//! grouped by [`ErrorKind`] so callers can tell configuration mistakes from
//! bad input data and from failures inside collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for afinar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied an unusable setup (tokenizer, strategy, label keys).
    Configuration,
    /// Input data failed a precondition.
    Validation,
    /// Operation exists on the interface but has no implementation here.
    NotImplemented,
    /// A collaborator (tokenizer, model, optimizer, filesystem) failed.
    Runtime,
}

/// Errors that can occur while preparing data or fine-tuning a model.
#[derive(Error, Debug)]
pub enum Error {
    /// Tokenizer identifier could not be resolved.
    #[error("Could not load tokenizer '{name}': {reason}\n  → Pass a directory containing tokenizer.json or a path to a tokenizer.json file")]
    InvalidTokenizer { name: String, reason: String },

    /// An operation needs a tokenizer and none is set.
    #[error("No tokenizer set\n  → Call set_tokenizer() or pass a tokenizer when building the datasets")]
    MissingTokenizer,

    /// Fitting strategy name is not one of the known strategies.
    #[error("Unknown strategy: {name}\n  → Use: one_cycle, cosine_annealing, sgdr")]
    UnknownStrategy { name: String },

    /// No label keys were given and the loaders carry none.
    #[error("No label keys available\n  → Pass label_keys to the tuner or build the loaders with label_keys")]
    MissingLabelKeys,

    /// Configuration value is invalid.
    #[error("Invalid configuration value for '{field}': {message}")]
    Config { field: String, message: String },

    /// Requested number of samples to display is not positive.
    #[error("Number of samples to show must be at least 1, got {n}")]
    InvalidSampleCount { n: usize },

    /// Labels were not part of the vocabulary built from training data.
    #[error("Labels '{}' were not included in the training dataset", .labels.join("', '"))]
    UnknownLabels { labels: Vec<String> },

    /// A row does not contain the requested column.
    #[error("Column {column} not found in row")]
    MissingColumn { column: String },

    /// Path has fewer named ancestors than the requested level.
    #[error("Path {} has {available} named ancestors, cannot take level {level}", .path.display())]
    InsufficientDepth { path: PathBuf, level: usize, available: usize },

    /// Tensor shape does not match what the field requires.
    #[error("Shape mismatch for '{field}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch { field: String, expected: Vec<usize>, actual: Vec<usize> },

    /// Input failed a precondition.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Interface operation without an implementation for this type.
    #[error("{operation} is not implemented for {type_name}\n  → Use a task-specific tuner that provides it")]
    NotImplemented { operation: &'static str, type_name: &'static str },

    /// Tokenizer failed to encode, decode or persist.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model forward, backward or parameter access failed.
    #[error("Model error: {0}")]
    Model(String),

    /// Optimizer step failed.
    #[error("Optimizer step failed: {0}")]
    Step(String),

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create a configuration value error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTokenizer { .. }
            | Self::MissingTokenizer
            | Self::UnknownStrategy { .. }
            | Self::MissingLabelKeys
            | Self::Config { .. } => ErrorKind::Configuration,
            Self::InvalidSampleCount { .. }
            | Self::UnknownLabels { .. }
            | Self::MissingColumn { .. }
            | Self::InsufficientDepth { .. }
            | Self::ShapeMismatch { .. }
            | Self::Validation(_) => ErrorKind::Validation,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::Tokenizer(_)
            | Self::Model(_)
            | Self::Step(_)
            | Self::Io { .. }
            | Self::Serialization(_) => ErrorKind::Runtime,
        }
    }

    /// Check if this error is caused by caller input rather than a collaborator.
    pub fn is_user_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_labels_message_lists_every_label() {
        let err = Error::UnknownLabels { labels: vec!["a".into(), "b".into()] };
        assert_eq!(err.to_string(), "Labels 'a', 'b' were not included in the training dataset");
    }

    #[test]
    fn test_unknown_labels_single() {
        let err = Error::UnknownLabels { labels: vec!["bird".into()] };
        assert_eq!(err.to_string(), "Labels 'bird' were not included in the training dataset");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::MissingTokenizer.kind(), ErrorKind::Configuration);
        assert_eq!(Error::UnknownStrategy { name: "x".into() }.kind(), ErrorKind::Configuration);
        assert_eq!(Error::InvalidSampleCount { n: 0 }.kind(), ErrorKind::Validation);
        assert_eq!(
            Error::NotImplemented { operation: "predict", type_name: "AdaptiveTuner" }.kind(),
            ErrorKind::NotImplemented
        );
        assert_eq!(Error::Step("nan".into()).kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_is_user_error() {
        assert!(Error::MissingLabelKeys.is_user_error());
        assert!(Error::Validation("bad".into()).is_user_error());
        assert!(!Error::Model("boom".into()).is_user_error());
    }

    #[test]
    fn test_io_constructor_keeps_source() {
        use std::error::Error as _;
        let err = Error::io("reading data.jsonl", std::io::Error::other("denied"));
        assert!(err.to_string().contains("reading data.jsonl"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_insufficient_depth_message() {
        let err = Error::InsufficientDepth { path: PathBuf::from("a.txt"), level: 2, available: 0 };
        let msg = err.to_string();
        assert!(msg.contains("a.txt"));
        assert!(msg.contains("level 2"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
