//! Random train/validation splitting.

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Default share of items sent to the validation set
pub const DEFAULT_VALID_PCT: f64 = 0.2;

/// Splits item indices randomly into train and validation sets
///
/// The validation set holds `round(n * valid_pct)` indices. With a seed the
/// split is reproducible; without one it is drawn from OS entropy.
///
/// # Example
///
/// ```rust
/// use afinar::data::RandomSplitter;
///
/// let (train, valid) = RandomSplitter::new(0.25).with_seed(42).split(8).unwrap();
/// assert_eq!(train.len(), 6);
/// assert_eq!(valid.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomSplitter {
    valid_pct: f64,
    seed: Option<u64>,
}

impl RandomSplitter {
    /// Splitter sending `valid_pct` of the items to validation
    pub fn new(valid_pct: f64) -> Self {
        Self { valid_pct, seed: None }
    }

    /// Fix the shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configured validation share
    pub fn valid_pct(&self) -> f64 {
        self.valid_pct
    }

    /// Configured seed
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Number of validation items for `n` items
    pub fn valid_len(&self, n: usize) -> usize {
        ((n as f64) * self.valid_pct).round() as usize
    }

    /// Split `0..n` into `(train, valid)` index lists
    ///
    /// # Errors
    /// Returns `Validation` if `valid_pct` is not a finite value in `[0, 1]`.
    pub fn split(&self, n: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        if !self.valid_pct.is_finite() || !(0.0..=1.0).contains(&self.valid_pct) {
            return Err(Error::Validation(format!(
                "valid_pct must be within [0, 1], got {}",
                self.valid_pct
            )));
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(&mut rng);
        let cut = self.valid_len(n).min(n);
        let train = idx.split_off(cut);
        Ok((train, idx))
    }

    /// Split a slice of items into `(train, valid)` clones
    ///
    /// # Errors
    /// Same as [`RandomSplitter::split`].
    pub fn split_items<T: Clone>(&self, items: &[T]) -> Result<(Vec<T>, Vec<T>)> {
        let (train, valid) = self.split(items.len())?;
        let pick = |ids: Vec<usize>| ids.into_iter().map(|i| items[i].clone()).collect();
        Ok((pick(train), pick(valid)))
    }
}

impl Default for RandomSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_VALID_PCT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_split_sizes() {
        let (train, valid) = RandomSplitter::default().split(10).unwrap();
        assert_eq!(valid.len(), 2);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_rounds_valid_size() {
        // 0.25 * 10 = 2.5 rounds away from zero
        assert_eq!(RandomSplitter::new(0.25).valid_len(10), 3);
        assert_eq!(RandomSplitter::new(0.3).valid_len(7), 2);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let s = RandomSplitter::new(0.3).with_seed(7);
        assert_eq!(s.split(50).unwrap(), s.split(50).unwrap());
    }

    #[test]
    fn test_extremes() {
        let (train, valid) = RandomSplitter::new(0.0).split(5).unwrap();
        assert_eq!((train.len(), valid.len()), (5, 0));
        let (train, valid) = RandomSplitter::new(1.0).split(5).unwrap();
        assert_eq!((train.len(), valid.len()), (0, 5));
        let (train, valid) = RandomSplitter::new(0.5).split(0).unwrap();
        assert!(train.is_empty() && valid.is_empty());
    }

    #[test]
    fn test_invalid_pct() {
        assert!(RandomSplitter::new(1.5).split(3).is_err());
        assert!(RandomSplitter::new(-0.1).split(3).is_err());
        assert!(RandomSplitter::new(f64::NAN).split(3).is_err());
    }

    #[test]
    fn test_split_items() {
        let items: Vec<char> = "abcdefghij".chars().collect();
        let (train, valid) = RandomSplitter::new(0.2).with_seed(1).split_items(&items).unwrap();
        assert_eq!(valid.len(), 2);
        let all: HashSet<char> = train.iter().chain(valid.iter()).copied().collect();
        assert_eq!(all.len(), 10);
    }

    proptest! {
        #[test]
        fn prop_split_is_partition(n in 0usize..300, pct in 0.0f64..=1.0, seed in any::<u64>()) {
            let splitter = RandomSplitter::new(pct).with_seed(seed);
            let (train, valid) = splitter.split(n).unwrap();
            prop_assert_eq!(valid.len(), ((n as f64) * pct).round() as usize);
            prop_assert_eq!(train.len() + valid.len(), n);

            let train_set: HashSet<_> = train.iter().copied().collect();
            let valid_set: HashSet<_> = valid.iter().copied().collect();
            prop_assert!(train_set.is_disjoint(&valid_set));
            let union: HashSet<_> = train_set.union(&valid_set).copied().collect();
            prop_assert_eq!(union, (0..n).collect::<HashSet<_>>());
        }
    }
}
