//! Common test utilities for dataset integration tests
//!
//! - Deterministic per-letter sample generator
//! - Helpers to lay out a raw/processed directory pair in a temp dir

#![allow(dead_code)]

use std::path::Path;

use handsign_core::{FeatureVector, GestureLabel, FEATURE_DIM};
use handsign_dataset::{ClassStore, DatasetConfig, DuplicatePolicy};

/// Deterministic sample generator
pub struct SampleGenerator {
    seed: u32,
}

impl SampleGenerator {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// One noisy vector around the base pose of `label`
    pub fn sample(&mut self, label: GestureLabel) -> FeatureVector {
        let k = label.index() as f32;
        let mut values = [0.0f32; FEATURE_DIM];
        for (i, v) in values.iter_mut().enumerate() {
            let base = 0.5 + 0.3 * (i as f32 * 0.37 + k * 0.9).sin();
            *v = base + (self.random_float() - 0.5) * 0.04;
        }
        FeatureVector::new(values)
    }

    pub fn samples(&mut self, label: GestureLabel, count: usize) -> Vec<FeatureVector> {
        (0..count).map(|_| self.sample(label)).collect()
    }

    fn random_float(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.seed as f32) / (u32::MAX as f32)
    }
}

pub fn label(c: char) -> GestureLabel {
    GestureLabel::from_char(c).unwrap()
}

/// Configuration rooted in `root`
pub fn config_in(root: &Path) -> DatasetConfig {
    DatasetConfig {
        raw_dir: root.join("raw_coordinates"),
        processed_dir: root.join("processed"),
        ..DatasetConfig::default()
    }
}

/// Fill stores with `(letter, count)` samples
pub fn populate(config: &DatasetConfig, classes: &[(char, usize)], seed: u32) -> ClassStore {
    let store = ClassStore::new(&config.raw_dir, DuplicatePolicy::Keep);
    let mut generator = SampleGenerator::new(seed);
    for &(c, n) in classes {
        store.append(label(c), &generator.samples(label(c), n)).unwrap();
    }
    store
}
