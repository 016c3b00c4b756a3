//! Dataset errors

use std::path::PathBuf;

use handsign_core::PipelineError;
use thiserror::Error;

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised while storing, assembling or splitting samples
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A stored row does not follow the feature layout; the whole store is rejected
    #[error("Schema mismatch in {} at line {line}: {reason}", path.display())]
    Schema {
        /// Store or dataset file
        path: PathBuf,
        /// One-based line number, the header being line 1
        line: u64,
        /// What is wrong with the row
        reason: String,
    },

    /// CSV encoding or decoding failed
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Filesystem access failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No samples were found
    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    /// Split ratios are out of range or do not sum to one
    #[error("Invalid split ratios: {0}")]
    InvalidRatios(String),

    /// Error from the core contracts (normalization, persistence, config)
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl DatasetError {
    pub(crate) fn schema(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is a storage failure rather than bad data
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Pipeline(PipelineError::Storage { .. })
        )
    }
}
