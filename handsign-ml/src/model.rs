//! Dense classifier artifact
//!
//! ## Artifact format
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "input_dim": 63,
//!   "classes": ["A", "B", ..., "Z"],
//!   "normalization_id": "3f1c...e9",
//!   "layers": [
//!     { "weights": [[...63 values...], ...], "bias": [...], "activation": "relu" },
//!     { "weights": [[...], ...], "bias": [...26 values...], "activation": "softmax" }
//!   ]
//! }
//! ```
//!
//! Loading validates the whole chain: the first layer takes `input_dim`
//! inputs, each layer consumes what the previous one produced, and the last
//! layer is a softmax over exactly the 26 classes in alphabet order. Any
//! inconsistency makes the artifact unavailable rather than producing
//! predictions from a half-valid model.

use std::fs;
use std::path::Path;

use handsign_core::classifier::check_input;
use handsign_core::persist;
use handsign_core::{Classifier, GestureLabel, PipelineResult, FEATURE_DIM, NUM_CLASSES};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::layer::{Activation, DenseLayer};

/// Current on-disk format of the classifier artifact
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Feed-forward network ending in a softmax over the letters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseClassifier {
    pub format_version: u32,
    pub input_dim: usize,
    /// Output order of the final layer
    pub classes: Vec<GestureLabel>,
    /// Id of the normalization state the network was trained against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_id: Option<String>,
    pub layers: Vec<DenseLayer>,
}

impl DenseClassifier {
    /// Assemble and validate a classifier over the full alphabet
    pub fn new(layers: Vec<DenseLayer>, normalization_id: Option<String>) -> ModelResult<Self> {
        let model = Self {
            format_version: MODEL_FORMAT_VERSION,
            input_dim: FEATURE_DIM,
            classes: GestureLabel::all().collect(),
            normalization_id,
            layers,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check version, class list and the layer chain
    pub fn validate(&self) -> ModelResult<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(self.format_version));
        }
        if self.input_dim != FEATURE_DIM {
            return Err(ModelError::Architecture(format!(
                "input_dim is {}, features have {FEATURE_DIM}",
                self.input_dim
            )));
        }
        if self.classes.len() != NUM_CLASSES
            || self.classes.iter().enumerate().any(|(i, c)| c.index() != i)
        {
            return Err(ModelError::Classes(format!(
                "expected the {NUM_CLASSES} letters A-Z in order, got {}",
                self.classes.iter().map(|c| c.as_char()).collect::<String>()
            )));
        }

        let last = self
            .layers
            .last()
            .ok_or_else(|| ModelError::Architecture("model has no layers".to_string()))?;
        if last.activation != Activation::Softmax {
            return Err(ModelError::Architecture(
                "final layer must use softmax".to_string(),
            ));
        }

        let mut width = self.input_dim;
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(i)?;
            if layer.input_dim() != width {
                return Err(ModelError::Shape {
                    layer: i,
                    reason: format!("takes {} inputs, previous layer produces {width}", layer.input_dim()),
                });
            }
            if layer.activation == Activation::Softmax && i + 1 != self.layers.len() {
                return Err(ModelError::Architecture(format!(
                    "softmax is only allowed on the final layer, found on layer {i}"
                )));
            }
            width = layer.output_dim();
        }
        if width != NUM_CLASSES {
            return Err(ModelError::Architecture(format!(
                "final layer produces {width} outputs, expected {NUM_CLASSES}"
            )));
        }
        Ok(())
    }

    /// Read and validate an artifact
    pub fn read(path: &Path) -> ModelResult<Self> {
        let bytes = fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&bytes)?;
        model.validate()?;
        Ok(model)
    }

    /// Load for the pipeline; every failure is `ArtifactUnavailable`
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let model = Self::read(path).map_err(|e| e.into_artifact(path.display().to_string()))?;
        info!(
            "Classifier loaded from {} ({} layers, {} parameters)",
            path.display(),
            model.layers.len(),
            model.parameter_count()
        );
        Ok(model)
    }

    /// Persist as JSON (replace-on-write)
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        persist::write_json_atomic(path, self)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.output_dim() * (l.input_dim() + 1))
            .sum()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .fold(input.to_vec(), |activations, layer| layer.forward(&activations))
    }
}

impl Classifier for DenseClassifier {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn num_classes(&self) -> usize {
        self.classes.len()
    }

    fn normalization_id(&self) -> Option<&str> {
        self.normalization_id.as_deref()
    }

    fn predict(&self, input: &[f32]) -> PipelineResult<Vec<f32>> {
        check_input(input, self.input_dim)?;
        Ok(self.forward(input))
    }
}
