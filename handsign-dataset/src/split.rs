//! Stratified train/validation/test split
//!
//! ## Protocol
//!
//! ```text
//!   dataset ──(test ratio)──► test
//!      │
//!      └─ rest ──(val / (1 - test))──► validation
//!                 │
//!                 └─ train
//! ```
//!
//! Each arrow is a binary stratified holdout. The second ratio is rescaled so
//! the final proportions match the configured ratios of the whole dataset
//! (0.6 / 0.2 / 0.2 by default).
//!
//! ## Holdout
//!
//! Indices are grouped by class and each group is shuffled with a `StdRng`
//! seeded once from the configured seed. The number held out overall is
//! `round(n * ratio)`; it is shared between classes by largest-remainder
//! apportionment of their exact quotas `n_c * ratio`. A class with at least
//! two samples then gets at least one sample on each side of the cut,
//! borrowing a slot from the largest class when needed. The same seed,
//! ratios and label sequence always give the same split.

use std::collections::BTreeMap;

use handsign_core::GestureLabel;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::schema::Dataset;

const RATIO_TOLERANCE: f64 = 1e-6;

/// Subset proportions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.6,
            val: 0.2,
            test: 0.2,
        }
    }
}

impl SplitRatios {
    pub fn validate(&self) -> DatasetResult<()> {
        for (name, r) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(0.0..1.0).contains(&r) {
                return Err(DatasetError::InvalidRatios(format!(
                    "{name} ratio {r} is outside [0, 1)"
                )));
            }
        }
        if self.train <= 0.0 || self.val <= 0.0 || self.test <= 0.0 {
            return Err(DatasetError::InvalidRatios(
                "every subset needs a positive ratio".to_string(),
            ));
        }
        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(DatasetError::InvalidRatios(format!(
                "ratios sum to {sum}, expected 1"
            )));
        }
        Ok(())
    }
}

/// Disjoint index sets into the split dataset, each sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Seeded two-step stratified splitter
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSplitter {
    ratios: SplitRatios,
    seed: u64,
}

impl StratifiedSplitter {
    pub fn new(ratios: SplitRatios, seed: u64) -> DatasetResult<Self> {
        ratios.validate()?;
        Ok(Self { ratios, seed })
    }

    /// Split a dataset into index sets over its samples
    pub fn split(&self, dataset: &Dataset) -> DatasetResult<SplitIndices> {
        self.split_labels(&dataset.labels())
    }

    /// Split sample positions given the label of each sample
    pub fn split_labels(&self, labels: &[GestureLabel]) -> DatasetResult<SplitIndices> {
        if labels.is_empty() {
            return Err(DatasetError::EmptyDataset(
                "nothing to split".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let all: Vec<usize> = (0..labels.len()).collect();

        let (rest, mut test) = holdout(&all, labels, self.ratios.test, &mut rng);
        let val_ratio = self.ratios.val / (1.0 - self.ratios.test);
        let (mut train, mut val) = holdout(&rest, labels, val_ratio, &mut rng);

        train.sort_unstable();
        val.sort_unstable();
        test.sort_unstable();
        debug!(
            "Split {} samples into train {} / val {} / test {}",
            labels.len(),
            train.len(),
            val.len(),
            test.len()
        );
        Ok(SplitIndices { train, val, test })
    }
}

/// Stratified binary split of `indices`; returns (kept, held out)
fn holdout(
    indices: &[usize],
    labels: &[GestureLabel],
    ratio: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut groups: BTreeMap<GestureLabel, Vec<usize>> = BTreeMap::new();
    for &i in indices {
        groups.entry(labels[i]).or_default().push(i);
    }
    for group in groups.values_mut() {
        group.shuffle(rng);
    }

    let sizes: Vec<usize> = groups.values().map(Vec::len).collect();
    let quotas = apportion(&sizes, ratio);

    let mut kept = Vec::with_capacity(indices.len());
    let mut held = Vec::new();
    for (group, quota) in groups.values().zip(quotas) {
        held.extend_from_slice(&group[..quota]);
        kept.extend_from_slice(&group[quota..]);
    }
    (kept, held)
}

/// Held-out count per class
///
/// Largest remainder of `size * ratio`, totalling `round(total * ratio)`,
/// then rebalanced so classes with two or more samples appear on both sides.
fn apportion(sizes: &[usize], ratio: f64) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    let target = ((total as f64 * ratio).round() as usize).min(total);

    let exact: Vec<f64> = sizes.iter().map(|&n| n as f64 * ratio).collect();
    let mut quotas: Vec<usize> = exact
        .iter()
        .zip(sizes)
        .map(|(e, &n)| (e.floor() as usize).min(n))
        .collect();

    // Remaining slots go to the largest fractional parts, earlier class first on ties
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    let mut assigned: usize = quotas.iter().sum();
    for &c in order.iter().cycle().take(order.len() * 2) {
        if assigned >= target {
            break;
        }
        if quotas[c] < sizes[c] {
            quotas[c] += 1;
            assigned += 1;
        }
    }

    // Every class with >= 2 samples on both sides, keeping the total fixed
    for c in 0..sizes.len() {
        if sizes[c] < 2 {
            continue;
        }
        if quotas[c] == 0 {
            let donor = (0..sizes.len())
                .filter(|&d| d != c && quotas[d] >= 2)
                .max_by_key(|&d| (quotas[d], std::cmp::Reverse(d)));
            if let Some(d) = donor {
                quotas[d] -= 1;
                quotas[c] += 1;
            }
        } else if quotas[c] == sizes[c] {
            let recipient = (0..sizes.len())
                .filter(|&r| r != c && sizes[r] - quotas[r] >= 2)
                .max_by_key(|&r| (sizes[r] - quotas[r], std::cmp::Reverse(r)));
            if let Some(r) = recipient {
                quotas[r] += 1;
                quotas[c] -= 1;
            }
        }
    }
    quotas
}
