//! Classifier boundary
//!
//! The trained model is an external artifact. The pipeline only relies on
//! the capability "normalized vector in, probability vector out":
//!
//! - input: `input_dim()` values (the feature contract, 63)
//! - output: `num_classes()` probabilities in label order, summing to 1
//!
//! Implementations report a wrong input length as `SchemaMismatch` for that
//! call only. The pipeline turns any per-call error into "no prediction for
//! this frame".

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::features::FeatureVector;
use crate::labels::GestureLabel;
use crate::NUM_CLASSES;

/// Maximum distance of a probability vector's sum from 1
pub const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Trained model capable of classifying one normalized feature vector
pub trait Classifier {
    /// Expected input dimensionality
    fn input_dim(&self) -> usize;

    /// Number of output classes
    fn num_classes(&self) -> usize;

    /// Normalization artifact id the model was trained against, if recorded
    fn normalization_id(&self) -> Option<&str> {
        None
    }

    /// Class probabilities for one input
    fn predict(&self, input: &[f32]) -> PipelineResult<Vec<f32>>;

    /// Class probabilities for a batch; each input fails independently
    fn predict_batch(&self, inputs: &[FeatureVector]) -> Vec<PipelineResult<Vec<f32>>> {
        inputs.iter().map(|v| self.predict(v.as_slice())).collect()
    }
}

/// Label and confidence for one classified frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Most probable class
    pub label: GestureLabel,
    /// Probability of that class, in [0, 1]
    pub confidence: f32,
}

impl ClassificationResult {
    /// Result with the given label and confidence
    pub fn new(label: GestureLabel, confidence: f32) -> Self {
        Self { label, confidence }
    }

    /// Argmax of a validated probability vector
    ///
    /// Ties resolve to the lowest class index.
    pub fn from_probabilities(probabilities: &[f32]) -> PipelineResult<Self> {
        validate_probabilities(probabilities)?;

        let (idx, &confidence) = probabilities
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| PipelineError::Transform("empty probability vector".to_string()))?;

        let label = GestureLabel::from_index(idx)
            .ok_or_else(|| PipelineError::Transform(format!("class index {idx} has no label")))?;
        Ok(Self::new(label, confidence))
    }
}

/// Check shape, range and normalization of a classifier output
pub fn validate_probabilities(probabilities: &[f32]) -> PipelineResult<()> {
    if probabilities.len() != NUM_CLASSES {
        return Err(PipelineError::Transform(format!(
            "classifier returned {} probabilities, expected {NUM_CLASSES}",
            probabilities.len()
        )));
    }
    if probabilities
        .iter()
        .any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0 + PROBABILITY_SUM_TOLERANCE)
    {
        return Err(PipelineError::Transform(
            "classifier returned a probability outside [0, 1]".to_string(),
        ));
    }

    let sum: f32 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PipelineError::Transform(format!(
            "classifier probabilities sum to {sum}"
        )));
    }
    Ok(())
}

/// Check an input against a classifier's expected dimensionality
pub fn check_input(input: &[f32], expected: usize) -> PipelineResult<()> {
    if input.len() != expected {
        return Err(PipelineError::SchemaMismatch {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}
