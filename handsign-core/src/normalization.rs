//! Per-feature normalization state
//!
//! ## Train/serve contract
//!
//! The classifier only ever sees standardized features:
//!
//! ```text
//! z[i] = (x[i] - mean[i]) / scale[i]
//! ```
//!
//! `mean` and `scale` are fit exactly once, on the training split, and then
//! persisted. Validation, test and every live session reuse the persisted
//! values unchanged. Refitting at inference time, or fitting on anything other
//! than the training split, silently degrades predictions, so this module has
//! no way to update a state in place.
//!
//! ## Identity
//!
//! Each state carries an `id`: the SHA-256 of its statistics. The classifier
//! artifact records the id of the state it was trained against, which lets the
//! pipeline refuse a mismatched pair at start-up.
//!
//! ## Degenerate features
//!
//! A feature with zero variance in the training data gets a scale of 1.0, so
//! it is centred but never divided by zero.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{PipelineError, PipelineResult};
use crate::features::FeatureVector;
use crate::persist;
use crate::FEATURE_DIM;

/// Current on-disk format of the normalization artifact
pub const NORMALIZATION_FORMAT_VERSION: u32 = 1;

/// Fitted per-feature statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationState {
    /// Artifact format version
    pub format_version: u32,
    /// SHA-256 of the statistics, hex encoded
    pub id: String,
    /// Number of training samples the statistics were computed from
    pub fit_samples: usize,
    /// Per-feature mean
    pub mean: Vec<f32>,
    /// Per-feature population standard deviation (zero-variance features stored as 1.0)
    pub std: Vec<f32>,
}

impl NormalizationState {
    /// Fit statistics on the training split
    ///
    /// Accumulates in `f64` and stores `f32`, the precision features are
    /// carried in.
    pub fn fit(train: &[FeatureVector]) -> PipelineResult<Self> {
        if train.is_empty() {
            return Err(PipelineError::Transform(
                "cannot fit normalization on an empty training split".to_string(),
            ));
        }
        if let Some(pos) = train.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::Transform(format!(
                "training sample {pos} contains non-finite values"
            )));
        }

        let n = train.len() as f64;
        let mut sums = [0.0f64; FEATURE_DIM];
        for vector in train {
            for (sum, &x) in sums.iter_mut().zip(vector.iter()) {
                *sum += x as f64;
            }
        }
        let means: Vec<f64> = sums.iter().map(|s| s / n).collect();

        let mut sq = [0.0f64; FEATURE_DIM];
        for vector in train {
            for ((acc, &x), &m) in sq.iter_mut().zip(vector.iter()).zip(means.iter()) {
                let d = x as f64 - m;
                *acc += d * d;
            }
        }

        let mean: Vec<f32> = means.iter().map(|&m| m as f32).collect();
        let std: Vec<f32> = sq
            .iter()
            .map(|&s| {
                let sd = (s / n).sqrt() as f32;
                if sd > f32::EPSILON {
                    sd
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self::from_parts(mean, std, train.len()))
    }

    /// Assemble a state from precomputed statistics
    pub fn from_parts(mean: Vec<f32>, std: Vec<f32>, fit_samples: usize) -> Self {
        let id = fingerprint(&mean, &std);
        Self {
            format_version: NORMALIZATION_FORMAT_VERSION,
            id,
            fit_samples,
            mean,
            std,
        }
    }

    /// Standardize one vector with the fitted statistics
    pub fn transform(&self, features: &FeatureVector) -> PipelineResult<FeatureVector> {
        self.check_shape()?;

        let mut out = [0.0f32; FEATURE_DIM];
        for (i, (&x, slot)) in features.iter().zip(out.iter_mut()).enumerate() {
            *slot = (x - self.mean[i]) / self.std[i];
        }

        let normalized = FeatureVector::new(out);
        if !normalized.is_finite() {
            return Err(PipelineError::Transform(
                "normalized features are not finite".to_string(),
            ));
        }
        Ok(normalized)
    }

    /// Standardize a batch with the same fitted statistics
    pub fn transform_batch(&self, batch: &[FeatureVector]) -> PipelineResult<Vec<FeatureVector>> {
        batch.iter().map(|v| self.transform(v)).collect()
    }

    /// Check vector lengths and that the id matches the statistics
    pub fn validate(&self) -> PipelineResult<()> {
        if self.format_version != NORMALIZATION_FORMAT_VERSION {
            return Err(PipelineError::Serialization(format!(
                "unsupported normalization format version {}",
                self.format_version
            )));
        }
        self.check_shape()?;
        if self.std.iter().any(|&s| !s.is_finite() || s <= 0.0)
            || self.mean.iter().any(|m| !m.is_finite())
        {
            return Err(PipelineError::Serialization(
                "normalization statistics must be finite with positive scale".to_string(),
            ));
        }
        let expected = fingerprint(&self.mean, &self.std);
        if expected != self.id {
            return Err(PipelineError::Serialization(format!(
                "normalization id {} does not match its statistics ({expected})",
                self.id
            )));
        }
        Ok(())
    }

    /// Persist as JSON (replace-on-write)
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        persist::write_json_atomic(path, self)?;
        info!("Normalization state {} saved to {}", short_id(&self.id), path.display());
        Ok(())
    }

    /// Load a persisted state
    ///
    /// Any failure, including a missing file, is reported as
    /// `ArtifactUnavailable` naming the path.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let artifact = path.display().to_string();
        if !path.exists() {
            return Err(PipelineError::artifact(artifact, "file not found"));
        }

        let state: Self = persist::read_json(path)
            .map_err(|e| PipelineError::artifact(artifact.clone(), e.to_string()))?;
        state
            .validate()
            .map_err(|e| PipelineError::artifact(artifact, e.to_string()))?;

        info!(
            "Normalization state {} loaded from {} ({} training samples)",
            short_id(&state.id),
            path.display(),
            state.fit_samples
        );
        Ok(state)
    }

    fn check_shape(&self) -> PipelineResult<()> {
        for len in [self.mean.len(), self.std.len()] {
            if len != FEATURE_DIM {
                return Err(PipelineError::SchemaMismatch {
                    expected: FEATURE_DIM,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

/// SHA-256 over the little-endian bytes of `mean` followed by `std`
pub fn fingerprint(mean: &[f32], std: &[f32]) -> String {
    let mut hasher = Sha256::new();
    for value in mean.iter().chain(std.iter()) {
        hasher.update(value.to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// First 12 hex digits, for log lines
pub fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}
