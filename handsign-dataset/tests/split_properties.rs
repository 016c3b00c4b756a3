//! Property tests for the stratified split

use std::collections::{BTreeMap, BTreeSet};

use handsign_core::GestureLabel;
use handsign_dataset::{SplitRatios, StratifiedSplitter};
use proptest::prelude::*;

fn labels_strategy() -> impl Strategy<Value = Vec<GestureLabel>> {
    sized_labels_strategy(1..60)
}

/// Up to 7 classes, each with a size drawn from `sizes`
fn sized_labels_strategy(sizes: std::ops::Range<usize>) -> impl Strategy<Value = Vec<GestureLabel>> {
    prop::collection::btree_map(0usize..26, sizes, 1..8).prop_map(|classes| {
        classes
            .into_iter()
            .flat_map(|(idx, n)| {
                std::iter::repeat(GestureLabel::from_index(idx).unwrap()).take(n)
            })
            .collect()
    })
}

fn ratios_strategy() -> impl Strategy<Value = SplitRatios> {
    (0.05f64..0.4, 0.05f64..0.4).prop_map(|(val, test)| SplitRatios {
        train: 1.0 - val - test,
        val,
        test,
    })
}

fn counts(labels: &[GestureLabel], indices: &[usize]) -> BTreeMap<GestureLabel, usize> {
    let mut out = BTreeMap::new();
    for &i in indices {
        *out.entry(labels[i]).or_insert(0) += 1;
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn subsets_partition_the_dataset(
        labels in labels_strategy(),
        ratios in ratios_strategy(),
        seed in any::<u64>()
    ) {
        let split = StratifiedSplitter::new(ratios, seed).unwrap().split_labels(&labels).unwrap();

        let mut seen = BTreeSet::new();
        for &i in split.train.iter().chain(&split.val).chain(&split.test) {
            prop_assert!(i < labels.len());
            prop_assert!(seen.insert(i), "index {} appears twice", i);
        }
        prop_assert_eq!(seen.len(), labels.len());

        for subset in [&split.train, &split.val, &split.test] {
            prop_assert!(subset.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn class_proportions_follow_global_ratios(
        labels in sized_labels_strategy(10..60),
        seed in any::<u64>()
    ) {
        let ratios = SplitRatios::default();
        let split = StratifiedSplitter::new(ratios, seed).unwrap().split_labels(&labels).unwrap();
        let total = counts(&labels, &(0..labels.len()).collect::<Vec<_>>());

        // Each holdout is off by less than one sample per class; val inherits
        // the test error scaled by val / (1 - test), train inherits both
        let bounds = [(&split.test, ratios.test, 1.0), (&split.val, ratios.val, 1.25), (&split.train, ratios.train, 2.25)];
        for (subset, ratio, bound) in bounds {
            let got = counts(&labels, subset);
            for (label, &n) in &total {
                let k = got.get(label).copied().unwrap_or(0) as f64;
                prop_assert!(
                    (k - n as f64 * ratio).abs() <= bound + 1e-9,
                    "{} has {} of {} in a {} subset", label, k, n, ratio
                );
            }
        }

        // Class shares inside each subset track the global shares
        for subset in [&split.train, &split.val, &split.test] {
            let got = counts(&labels, subset);
            for (label, &n) in &total {
                let share = got.get(label).copied().unwrap_or(0) as f64 / subset.len() as f64;
                let global = n as f64 / labels.len() as f64;
                prop_assert!(
                    (share - global).abs() <= 4.0 / subset.len() as f64 + 1e-9,
                    "{} share {} vs global {}", label, share, global
                );
            }
        }
    }

    #[test]
    fn every_class_reaches_every_subset(
        labels in sized_labels_strategy(10..60),
        seed in any::<u64>()
    ) {
        let split = StratifiedSplitter::new(SplitRatios::default(), seed).unwrap().split_labels(&labels).unwrap();
        let total = counts(&labels, &(0..labels.len()).collect::<Vec<_>>());
        for subset in [&split.train, &split.val, &split.test] {
            prop_assert_eq!(counts(&labels, subset).len(), total.len());
        }
    }

    #[test]
    fn same_seed_same_split(labels in labels_strategy(), seed in any::<u64>()) {
        let splitter = StratifiedSplitter::new(SplitRatios::default(), seed).unwrap();
        prop_assert_eq!(splitter.split_labels(&labels).unwrap(), splitter.split_labels(&labels).unwrap());
    }
}
