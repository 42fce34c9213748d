//! Label vocabularies mapping labels to dense integer ids.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

/// Ordered vocabulary of unique labels with a reverse index
///
/// Ids are dense: the label at `classes()[i]` has id `i`.
///
/// # Example
///
/// ```rust
/// use afinar::data::Categorize;
///
/// let vocab = Categorize::new(["cat", "dog", "cat"], true);
/// assert_eq!(vocab.classes(), &["cat", "dog"]);
/// assert_eq!(vocab.map_objs(&["dog", "cat"]).unwrap(), vec![1, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorize<T: Eq + Hash> {
    classes: Vec<T>,
    o2i: HashMap<T, usize>,
}

impl<T> Categorize<T>
where
    T: Clone + Eq + Hash + Ord + Display,
{
    /// Build a vocabulary from `names`, keeping first-seen order unless `sort`
    pub fn new<I>(names: I, sort: bool) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut seen = HashSet::new();
        let mut classes: Vec<T> = names.into_iter().filter(|n| seen.insert(n.clone())).collect();
        if sort {
            classes.sort();
        }
        Self::from_classes(classes)
    }

    /// Build a vocabulary, dropping missing entries
    pub fn from_optional<I>(names: I, sort: bool) -> Self
    where
        I: IntoIterator<Item = Option<T>>,
    {
        Self::new(names.into_iter().flatten(), sort)
    }

    fn from_classes(classes: Vec<T>) -> Self {
        let o2i = classes.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
        Self { classes, o2i }
    }

    /// Replace the vocabulary with `classes`, in the given order
    ///
    /// Duplicates after the first occurrence are dropped.
    pub fn set_classes(&mut self, classes: Vec<T>) {
        *self = Self::new(classes, false);
    }

    /// Labels in id order
    pub fn classes(&self) -> &[T] {
        &self.classes
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check whether `label` is in the vocabulary
    pub fn contains(&self, label: &T) -> bool {
        self.o2i.contains_key(label)
    }

    /// Id of a single label
    ///
    /// # Errors
    /// Returns `UnknownLabels` if `label` is not in the vocabulary.
    pub fn encode(&self, label: &T) -> Result<usize> {
        self.o2i
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownLabels { labels: vec![label.to_string()] })
    }

    /// Ids for every label in `objs`
    ///
    /// # Errors
    /// Returns `UnknownLabels` naming the first label outside the vocabulary.
    pub fn map_objs(&self, objs: &[T]) -> Result<Vec<usize>> {
        objs.iter().map(|o| self.encode(o)).collect()
    }

    /// Labels for every id in `ids`
    ///
    /// # Panics
    /// Panics if any id is not below `len()`.
    pub fn map_ids(&self, ids: &[usize]) -> Vec<T> {
        ids.iter().map(|&i| self.decode(i)).collect()
    }

    /// Label with id `id`
    ///
    /// # Panics
    /// Panics if `id` is not below `len()`; use [`Categorize::get`] for a checked lookup.
    pub fn decode(&self, id: usize) -> T {
        self.classes[id].clone()
    }

    /// Checked label lookup
    pub fn get(&self, id: usize) -> Option<&T> {
        self.classes.get(id)
    }
}

/// Vocabulary for multi-label targets
///
/// Classes keep first-seen order. Encoding a label set reports every label
/// that is not in the vocabulary at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiCategorize<T: Eq + Hash> {
    inner: Categorize<T>,
}

impl<T> MultiCategorize<T>
where
    T: Clone + Eq + Hash + Ord + Display,
{
    /// Build a vocabulary from `names` in first-seen order
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self { inner: Categorize::new(names, false) }
    }

    /// Build a vocabulary from per-item label lists
    pub fn from_label_sets<I, S>(sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
    {
        Self::new(sets.into_iter().flatten())
    }

    /// Labels in id order
    pub fn classes(&self) -> &[T] {
        self.inner.classes()
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Ids for a label set
    ///
    /// # Errors
    /// Returns `UnknownLabels` listing every label not in the vocabulary,
    /// in input order.
    pub fn encode(&self, labels: &[T]) -> Result<Vec<usize>> {
        let missing: Vec<String> =
            labels.iter().filter(|l| !self.inner.contains(l)).map(ToString::to_string).collect();
        if !missing.is_empty() {
            return Err(Error::UnknownLabels { labels: missing });
        }
        self.inner.map_objs(labels)
    }

    /// Labels for a set of ids
    ///
    /// # Panics
    /// Panics if any id is not below `len()`.
    pub fn decode(&self, ids: &[usize]) -> Vec<T> {
        self.inner.map_ids(ids)
    }

    /// Underlying single-label vocabulary
    pub fn as_categorize(&self) -> &Categorize<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_categorize_sorted_unique() {
        let vocab = Categorize::new(["cat", "dog", "cat"], true);
        assert_eq!(vocab.classes(), &["cat", "dog"]);
        assert_eq!(vocab.map_objs(&["dog", "cat"]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_categorize_unsorted_keeps_first_seen() {
        let vocab = Categorize::new(["zebra", "ant", "zebra", "bee"], false);
        assert_eq!(vocab.classes(), &["zebra", "ant", "bee"]);
        assert_eq!(vocab.encode(&"bee").unwrap(), 2);
    }

    #[test]
    fn test_categorize_drops_missing() {
        let vocab = Categorize::from_optional([Some(3), None, Some(1), Some(3)], true);
        assert_eq!(vocab.classes(), &[1, 3]);
    }

    #[test]
    fn test_categorize_unknown_label() {
        let vocab = Categorize::new(["a".to_string()], true);
        let err = vocab.encode(&"b".to_string()).unwrap_err();
        assert!(matches!(err, Error::UnknownLabels { ref labels } if labels == &["b"]));
    }

    #[test]
    fn test_categorize_decode_and_get() {
        let vocab = Categorize::new(["x", "y"], true);
        assert_eq!(vocab.decode(1), "y");
        assert_eq!(vocab.map_ids(&[1, 0, 1]), vec!["y", "x", "y"]);
        assert_eq!(vocab.get(5), None);
    }

    #[test]
    #[should_panic]
    fn test_categorize_decode_out_of_range_panics() {
        let vocab = Categorize::new(["x"], true);
        let _ = vocab.decode(1);
    }

    #[test]
    fn test_categorize_set_classes() {
        let mut vocab = Categorize::new(["a", "b"], true);
        vocab.set_classes(vec!["c", "a", "c"]);
        assert_eq!(vocab.classes(), &["c", "a"]);
        assert_eq!(vocab.encode(&"a").unwrap(), 1);
        assert!(!vocab.contains(&"b"));
    }

    #[test]
    fn test_multicategorize_first_seen_order() {
        let vocab = MultiCategorize::from_label_sets([vec!["b", "a"], vec!["c", "a"]]);
        assert_eq!(vocab.classes(), &["b", "a", "c"]);
        assert_eq!(vocab.encode(&["a", "c"]).unwrap(), vec![1, 2]);
        assert_eq!(vocab.decode(&[2, 0]), vec!["c", "b"]);
    }

    #[test]
    fn test_multicategorize_reports_all_missing() {
        let vocab = MultiCategorize::new(["x".to_string()]);
        let err = vocab.encode(&["a".to_string(), "x".to_string(), "b".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Labels 'a', 'b' were not included in the training dataset");
    }

    #[test]
    fn test_multicategorize_empty_set() {
        let vocab = MultiCategorize::new(["x"]);
        assert!(vocab.encode(&[]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_map_objs(labels in prop::collection::vec("[a-e]{1,3}", 1..40), sort in any::<bool>()) {
            let vocab = Categorize::new(labels.clone(), sort);
            let ids = vocab.map_objs(&labels).unwrap();
            prop_assert_eq!(vocab.map_ids(&ids), labels);
        }

        #[test]
        fn prop_ids_are_dense(labels in prop::collection::vec(0u8..20, 0..60)) {
            let vocab = Categorize::new(labels.clone(), true);
            let unique: HashSet<_> = labels.iter().collect();
            prop_assert_eq!(vocab.len(), unique.len());
            for (i, class) in vocab.classes().iter().enumerate() {
                prop_assert_eq!(vocab.encode(class).unwrap(), i);
            }
        }
    }
}
