//! Datasets, label helpers and loaders
//!
//! - [`Categorize`] / [`MultiCategorize`] map labels to dense ids
//! - [`ColReader`] and [`ParentLabeller`] pull labels out of rows and paths
//! - [`RandomSplitter`] partitions items into train and validation sets
//! - [`TaskDatasets`] binds raw datasets to a tokenizer and builds
//!   [`AdaptiveDataLoaders`]

mod bundle;
mod categorize;
mod col_reader;
mod collate;
mod dataset;
mod labeller;
mod loader;
mod splitter;
mod task;

pub use bundle::{AdaptiveDataLoaders, BatchTable, LabelDecoding};
pub use categorize::{Categorize, MultiCategorize};
pub use col_reader::{value_text, ColOutput, ColReader, ColSpec, ColValue, Row};
pub use collate::{default_collate_fn, default_data_collator, Batch, CollateFn};
pub use dataset::{Dataset, Example, DEFAULT_MAP_BATCH_SIZE};
pub use labeller::ParentLabeller;
pub use loader::{BatchIter, DataLoader};
pub use splitter::{RandomSplitter, DEFAULT_VALID_PCT};
pub use task::{LoaderOptions, TaskDatasets, TaskDatasetsBuilder};
