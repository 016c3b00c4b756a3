//! Model artifact errors

use std::path::PathBuf;

use handsign_core::PipelineError;
use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Problems reading, validating or evaluating a classifier artifact
#[derive(Error, Debug)]
pub enum ModelError {
    /// Artifact file could not be read or written
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not valid JSON for this format
    #[error("Malformed artifact: {0}")]
    Parse(String),

    /// Artifact written by an unknown format version
    #[error("Unsupported model format version {0}")]
    UnsupportedVersion(u32),

    /// A layer's shape is inconsistent with its neighbours
    #[error("Layer {layer}: {reason}")]
    Shape {
        /// Zero-based layer index
        layer: usize,
        reason: String,
    },

    /// Class list does not match the letter alphabet
    #[error("Class list mismatch: {0}")]
    Classes(String),

    /// Model has no layers or does not end in softmax
    #[error("Invalid architecture: {0}")]
    Architecture(String),
}

impl ModelError {
    /// Report this error as an unavailable pipeline artifact
    pub fn into_artifact(self, artifact: impl Into<String>) -> PipelineError {
        PipelineError::ArtifactUnavailable {
            artifact: artifact.into(),
            reason: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        let artifact = match &err {
            ModelError::Io { path, .. } => path.display().to_string(),
            _ => "classifier".to_string(),
        };
        err.into_artifact(artifact)
    }
}
