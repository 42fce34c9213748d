//! Batch iteration over a dataset.

use super::collate::{default_collate_fn, Batch, CollateFn};
use super::dataset::{Dataset, Example};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Yields collated batches from a shared dataset
///
/// A shuffling loader draws a fresh order each time [`DataLoader::iter`] is
/// called. With a seed, the sequence of orders is reproducible.
pub struct DataLoader {
    dataset: Arc<Dataset>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    collate: CollateFn,
    seed: Option<u64>,
    epoch: AtomicU64,
}

impl DataLoader {
    /// Loader over `dataset` with the default collator
    ///
    /// # Errors
    /// Returns `Config` if `batch_size` is zero.
    pub fn new(dataset: Arc<Dataset>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config("batch_size", "must be positive"));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            collate: default_collate_fn(),
            seed: None,
            epoch: AtomicU64::new(0),
        })
    }

    /// Enable or disable shuffling
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Drop a trailing partial batch
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Use a custom collation function
    pub fn with_collate(mut self, collate: CollateFn) -> Self {
        self.collate = collate;
        self
    }

    /// Seed the shuffle order
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Dataset being iterated
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether this loader shuffles
    pub fn shuffles(&self) -> bool {
        self.shuffle
    }

    /// Number of batches per pass
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Check whether a pass yields no batches
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn order(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(epoch)),
                None => StdRng::from_entropy(),
            };
            idx.shuffle(&mut rng);
        }
        idx
    }

    /// One pass over the dataset
    pub fn iter(&self) -> BatchIter<'_> {
        BatchIter { loader: self, order: self.order(), pos: 0 }
    }

    /// First batch of a fresh pass
    ///
    /// # Errors
    /// Returns `Validation` if the loader yields no batches, or the collation error.
    pub fn one_batch(&self) -> Result<Batch> {
        self.iter().next().unwrap_or_else(|| Err(Error::Validation("loader yields no batches".into())))
    }
}

impl fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("rows", &self.dataset.len())
            .field("batch_size", &self.batch_size)
            .field("shuffle", &self.shuffle)
            .field("drop_last", &self.drop_last)
            .field("seed", &self.seed)
            .finish()
    }
}

/// Iterator over the batches of one pass
pub struct BatchIter<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    pos: usize,
}

impl Iterator for BatchIter<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.order.len().saturating_sub(self.pos);
        let bs = self.loader.batch_size;
        if remaining == 0 || (self.loader.drop_last && remaining < bs) {
            return None;
        }
        let end = (self.pos + bs).min(self.order.len());
        let rows: Vec<Example> = self.order[self.pos..end]
            .iter()
            .filter_map(|&i| self.loader.dataset.get(i).cloned())
            .collect();
        self.pos = end;
        Some((self.loader.collate)(&rows))
    }
}

impl<'a> IntoIterator for &'a DataLoader {
    type Item = Result<Batch>;
    type IntoIter = BatchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
