//! Pipeline configuration
//!
//! Every setting has a default, so an empty JSON object is a complete
//! configuration:
//!
//! ```json
//! {
//!   "smoother": { "window_capacity": 7, "warm_threshold": 3, "recency_decay": null },
//!   "recorder": { "confidence_floor": 0.7, "max_logged_records": 100, "sessions_dir": "sessions" },
//!   "estimator": { "max_hands": 1, "min_detection_confidence": 0.7, "min_tracking_confidence": 0.5 },
//!   "artifacts": { "normalization": "models/normalization.json", "classifier": "models/classifier.json" }
//! }
//! ```

use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};
use crate::persist;
use crate::session::RecorderConfig;
use crate::smoother::SmootherConfig;

/// Thresholds handed to the external hand estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Hands the estimator should report; only the first is classified
    pub max_hands: u32,
    /// Minimum score for a new hand detection
    pub min_detection_confidence: f32,
    /// Minimum score to keep tracking a hand across frames
    pub min_tracking_confidence: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_hands: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
        }
    }
}

impl EstimatorConfig {
    /// Check that both thresholds lie in [0, 1] and at least one hand is tracked
    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_hands == 0 {
            return Err(PipelineError::InvalidConfig(
                "estimator.max_hands must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::InvalidConfig(format!(
                    "estimator.{name} must be in [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Locations of the trained artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Fitted normalization state
    pub normalization: PathBuf,
    /// Trained classifier
    pub classifier: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            normalization: PathBuf::from("models/normalization.json"),
            classifier: PathBuf::from("models/classifier.json"),
        }
    }
}

/// Complete online pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window size and warm-up threshold
    pub smoother: SmootherConfig,
    /// Session recorder floor and record cap
    pub recorder: RecorderConfig,
    /// Thresholds handed to the hand estimator
    pub estimator: EstimatorConfig,
    /// Where the normalization and classifier artifacts live
    pub artifacts: ArtifactPaths,
}

impl PipelineConfig {
    /// Validate every section
    pub fn validate(&self) -> PipelineResult<()> {
        self.smoother.validate()?;
        self.recorder.validate()?;
        self.estimator.validate()?;
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let config: Self = persist::read_json(path)?;
        config.validate()?;
        info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Write as pretty JSON, atomically
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        persist::write_json_atomic(path, self)
    }
}
