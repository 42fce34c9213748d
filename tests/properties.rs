//! Property tests over the public data API

use afinar::data::{Categorize, ColOutput, ColReader, ColValue, Dataset, MultiCategorize, ParentLabeller, RandomSplitter};
use afinar::Error;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;

fn labels() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]{1,3}", 1..40)
}

proptest! {
    /// Decoding the encoded labels gives the labels back
    #[test]
    fn categorize_round_trip(labels in labels()) {
        let vocab = Categorize::new(labels.clone(), true);
        let ids = vocab.map_objs(&labels).unwrap();
        prop_assert_eq!(vocab.map_ids(&ids), labels.clone());

        let unique: HashSet<&String> = labels.iter().collect();
        prop_assert_eq!(vocab.len(), unique.len());
        prop_assert!(ids.iter().all(|&i| i < vocab.len()));
    }

    /// Multi-label encoding keeps each label set
    #[test]
    fn multi_categorize_round_trip(sets in prop::collection::vec(labels(), 1..10)) {
        let vocab = MultiCategorize::from_label_sets(sets.clone());
        for set in &sets {
            let ids = vocab.encode(set).unwrap();
            let decoded: HashSet<String> = vocab.decode(&ids).into_iter().collect();
            let expected: HashSet<String> = set.iter().cloned().collect();
            prop_assert_eq!(decoded, expected);
        }
    }

    /// Splits partition the items with round(p * n) validation entries
    #[test]
    fn splitter_partitions_dataset(n in 0usize..60, pct in 0.0f64..=1.0, seed in any::<u64>()) {
        let rows = (0..n).map(|i| json!({ "id": i }));
        let dataset = Dataset::from_values(rows).unwrap();
        let splitter = RandomSplitter::new(pct).with_seed(seed);

        let (train, valid) = dataset.split(&splitter).unwrap();
        prop_assert_eq!(valid.len(), ((n as f64) * pct).round() as usize);
        prop_assert_eq!(train.len() + valid.len(), n);

        let ids: HashSet<u64> = train.iter().chain(valid.iter()).map(|r| r["id"].as_u64().unwrap()).collect();
        prop_assert_eq!(ids.len(), n);

        let (again, _) = dataset.split(&splitter).unwrap();
        prop_assert_eq!(again.rows(), train.rows());
    }

    /// The labeller returns the ancestor at the requested depth, or fails
    #[test]
    fn labeller_depth(dirs in prop::collection::vec("[a-z]{1,6}", 1..6), level in 1usize..8) {
        let mut path: PathBuf = dirs.iter().collect();
        path.push("item.txt");

        let result = ParentLabeller::new(level).label(&path);
        if level <= dirs.len() {
            prop_assert_eq!(result.unwrap(), dirs[dirs.len() - level].clone());
        } else {
            let is_depth_error = matches!(result, Err(Error::InsufficientDepth { .. }));
            prop_assert!(is_depth_error);
        }
    }

    /// Prefix and suffix wrap every read value
    #[test]
    fn col_reader_affixes(a in 0i64..1000, b in 0i64..1000) {
        let reader = ColReader::new(["a", "b"]).with_pref("x_").with_suff(".txt");
        let row = json!({ "a": a, "b": b });
        let out = reader.read(&row).unwrap();
        let expected = ColOutput::Many(vec![
            ColValue::Text(format!("x_{a}.txt")),
            ColValue::Text(format!("x_{b}.txt")),
        ]);
        prop_assert_eq!(out, expected);
    }
}
