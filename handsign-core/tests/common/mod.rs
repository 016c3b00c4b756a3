//! Common test utilities and data generators for integration tests
//!
//! This module provides:
//! - Synthetic hand generators with one base pose per letter
//! - A scripted classifier that replays fixed results
//! - A nearest-centroid classifier trained on generated hands

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use handsign_core::{
    Classifier, DetectedHand, DetectorOutput, FeatureVector, GestureLabel, Landmark,
    NormalizationState, PipelineError, PipelineResult, FEATURE_DIM, NUM_CLASSES, NUM_LANDMARKS,
};

/// Deterministic hand generator
pub struct HandGenerator {
    seed: u32,
}

impl HandGenerator {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Noisy hand for `label`; poses of different letters are well separated
    pub fn hand(&mut self, label: GestureLabel, noise: f32) -> DetectedHand {
        let k = label.index() as f32;
        let landmarks = (0..NUM_LANDMARKS)
            .map(|i| {
                let t = i as f32 / NUM_LANDMARKS as f32;
                Landmark::new(
                    0.5 + 0.3 * (t * 6.0 + k * 0.7).sin() + self.noise(noise),
                    0.5 + 0.3 * (t * 4.0 + k * 1.3).cos() + self.noise(noise),
                    -0.05 * k / NUM_CLASSES as f32 + self.noise(noise * 0.1),
                )
            })
            .collect();
        DetectedHand::new(landmarks)
    }

    pub fn frame(&mut self, label: GestureLabel, noise: f32) -> DetectorOutput {
        DetectorOutput::single(self.hand(label, noise))
    }

    /// Flattened samples, `per_class` for every letter in `labels`
    pub fn samples(
        &mut self,
        labels: &[GestureLabel],
        per_class: usize,
        noise: f32,
    ) -> Vec<(FeatureVector, GestureLabel)> {
        let mut out = Vec::new();
        for &label in labels {
            for _ in 0..per_class {
                out.push((flatten(&self.hand(label, noise)), label));
            }
        }
        out
    }

    fn noise(&mut self, amplitude: f32) -> f32 {
        (self.random_float() - 0.5) * 2.0 * amplitude
    }

    fn random_float(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.seed as f32) / (u32::MAX as f32)
    }
}

pub fn flatten(hand: &DetectedHand) -> FeatureVector {
    let values: Vec<f32> = hand
        .landmarks
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .collect();
    FeatureVector::from_slice(&values).unwrap()
}

pub fn label(c: char) -> GestureLabel {
    GestureLabel::from_char(c).unwrap()
}

/// Probability vector with `p` on `label` and the rest spread evenly
pub fn peaked(label: GestureLabel, p: f32) -> Vec<f32> {
    let rest = (1.0 - p) / (NUM_CLASSES - 1) as f32;
    (0..NUM_CLASSES)
        .map(|i| if i == label.index() { p } else { rest })
        .collect()
}

/// Replays a fixed list of results, one per call
pub struct ScriptedClassifier {
    script: RefCell<VecDeque<(GestureLabel, f32)>>,
    normalization_id: Option<String>,
}

impl ScriptedClassifier {
    pub fn new(script: &[(char, f32)], normalization_id: Option<String>) -> Self {
        Self {
            script: RefCell::new(script.iter().map(|&(c, p)| (label(c), p)).collect()),
            normalization_id,
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn input_dim(&self) -> usize {
        FEATURE_DIM
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    fn normalization_id(&self) -> Option<&str> {
        self.normalization_id.as_deref()
    }

    fn predict(&self, input: &[f32]) -> PipelineResult<Vec<f32>> {
        if input.len() != FEATURE_DIM {
            return Err(PipelineError::SchemaMismatch {
                expected: FEATURE_DIM,
                actual: input.len(),
            });
        }
        let (label, p) = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| PipelineError::Transform("script exhausted".to_string()))?;
        Ok(peaked(label, p))
    }
}

/// Softmax over negative squared distances to per-class centroids in
/// normalized space
pub struct CentroidClassifier {
    centroids: Vec<(GestureLabel, FeatureVector)>,
    normalization_id: String,
}

impl CentroidClassifier {
    pub fn train(samples: &[(FeatureVector, GestureLabel)], normalization: &NormalizationState) -> Self {
        let mut centroids = Vec::new();
        for label in GestureLabel::all() {
            let members: Vec<_> = samples
                .iter()
                .filter(|(_, l)| *l == label)
                .map(|(v, _)| normalization.transform(v).unwrap())
                .collect();
            if members.is_empty() {
                continue;
            }
            let mut sum = [0.0f32; FEATURE_DIM];
            for v in &members {
                for (s, x) in sum.iter_mut().zip(v.iter()) {
                    *s += x / members.len() as f32;
                }
            }
            centroids.push((label, FeatureVector::new(sum)));
        }
        Self {
            centroids,
            normalization_id: normalization.id.clone(),
        }
    }
}

impl Classifier for CentroidClassifier {
    fn input_dim(&self) -> usize {
        FEATURE_DIM
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    fn normalization_id(&self) -> Option<&str> {
        Some(&self.normalization_id)
    }

    fn predict(&self, input: &[f32]) -> PipelineResult<Vec<f32>> {
        if input.len() != FEATURE_DIM {
            return Err(PipelineError::SchemaMismatch {
                expected: FEATURE_DIM,
                actual: input.len(),
            });
        }
        let mut logits = vec![f32::NEG_INFINITY; NUM_CLASSES];
        for (label, centroid) in &self.centroids {
            let d: f32 = centroid
                .iter()
                .zip(input)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            logits[label.index()] = -d;
        }
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f32 = exp.iter().sum();
        Ok(exp.iter().map(|e| e / total).collect())
    }
}
