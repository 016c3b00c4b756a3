//! Error Types for the Recognition Pipeline
//!
//! ## Error Categories
//!
//! Errors fall into three groups, each with its own propagation rule:
//!
//! ### Per-frame conditions
//! - `SchemaMismatch`: a vector or stored row has the wrong dimensionality.
//!   The offending unit is dropped and processing continues.
//! - `Transform`: normalization or classification failed for one frame. The
//!   frame is skipped and counted, the stream keeps running.
//!
//! ### Initialization conditions
//! - `ArtifactUnavailable`: the classifier or normalization artifact is missing
//!   or corrupt. Fatal; the pipeline is never constructed.
//! - `ArtifactMismatch`: both artifacts loaded, but they were not produced by
//!   the same training run.
//! - `InvalidConfig`: a configuration value is out of range.
//!
//! ### Persistence conditions
//! - `Storage` / `Serialization`: writing or reading an artifact failed. These
//!   are returned to whoever requested the write; nothing is retried.
//!
//! "No hand in frame" is deliberately absent from this list. It is the normal
//! case between gestures and is modelled as [`crate::features::Detection::Absent`].
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use handsign_core::PipelineError;
//!
//! fn on_frame_error(err: PipelineError) {
//!     match err {
//!         PipelineError::SchemaMismatch { .. } | PipelineError::Transform(_) => {
//!             // skip this frame
//!         }
//!         PipelineError::ArtifactUnavailable { .. } | PipelineError::ArtifactMismatch { .. } => {
//!             // abort start-up
//!         }
//!         _ => {
//!             // report to the caller
//!         }
//!     }
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by the recognition pipeline and its artifacts
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A feature vector or stored sample has the wrong dimensionality
    #[error("Schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch {
        /// Dimensionality required by the feature contract
        expected: usize,
        /// Dimensionality actually observed
        actual: usize,
    },

    /// A required artifact is missing or corrupt
    #[error("Artifact unavailable: {artifact}: {reason}")]
    ArtifactUnavailable {
        /// Human readable artifact name, usually the path
        artifact: String,
        /// What went wrong while loading it
        reason: String,
    },

    /// Normalization and classifier artifacts come from different training runs
    #[error("Artifact mismatch: normalization {normalization} does not match classifier {classifier}")]
    ArtifactMismatch {
        /// Identity of the loaded normalization state
        normalization: String,
        /// Normalization identity recorded in the classifier artifact
        classifier: String,
    },

    /// Normalization or classification failed for a single frame
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Reading or writing an artifact failed
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        /// File that could not be read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Build an `ArtifactUnavailable` error
    pub fn artifact(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactUnavailable {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Storage` error for `path`
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort pipeline initialization
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ArtifactUnavailable { .. } | Self::ArtifactMismatch { .. } | Self::InvalidConfig(_)
        )
    }

    /// Whether this error only affects the current frame
    pub fn is_per_frame(&self) -> bool {
        matches!(self, Self::SchemaMismatch { .. } | Self::Transform(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let mismatch = PipelineError::SchemaMismatch { expected: 63, actual: 62 };
        assert!(mismatch.is_per_frame());
        assert!(!mismatch.is_fatal());

        let missing = PipelineError::artifact("models/model.json", "not found");
        assert!(missing.is_fatal());
        assert!(!missing.is_per_frame());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let storage = PipelineError::storage("sessions/x.json", io);
        assert!(!storage.is_fatal());
        assert!(!storage.is_per_frame());
    }

    #[test]
    fn messages_name_the_artifact() {
        let err = PipelineError::artifact("normalization.json", "file not found");
        assert_eq!(
            err.to_string(),
            "Artifact unavailable: normalization.json: file not found"
        );
    }
}
