//! Core recognition pipeline for HandSign
//!
//! Turns per-frame hand landmarks into stable letter predictions, and owns the
//! contracts shared by offline dataset preparation and live inference.
//!
//! Key constraints:
//! - One feature layout everywhere: 21 landmarks × 3 coordinates = 63 values
//! - Normalization is fit once on training data and never refit at inference
//! - Per-frame failures never stop the stream; artifact problems stop start-up
//!
//! ```no_run
//! use handsign_core::{FeatureExtractor, DetectorOutput, Detection};
//!
//! let extractor = FeatureExtractor::new();
//!
//! match extractor.extract(&DetectorOutput::empty()) {
//!     Detection::Present(features) => {} // Normalize and classify
//!     Detection::Absent(reason) => {}    // Nothing to classify this frame
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod classifier;
pub mod config;
pub mod errors;
pub mod features;
pub mod labels;
pub mod normalization;
pub mod persist;
pub mod pipeline;
pub mod session;
pub mod smoother;
pub mod time;
pub mod window;

// Public API
pub use classifier::{ClassificationResult, Classifier};
pub use config::{ArtifactPaths, EstimatorConfig, PipelineConfig};
pub use errors::{PipelineError, PipelineResult};
pub use features::{
    AbsenceReason, DetectedHand, Detection, DetectorOutput, FeatureExtractor, FeatureVector,
    Landmark,
};
pub use labels::GestureLabel;
pub use normalization::NormalizationState;
pub use pipeline::{FrameOutcome, NoPredictionReason, PipelineMetrics, RecognitionPipeline};
pub use session::{RawRecord, RecorderConfig, SessionRecorder, SessionStore, SessionSummary};
pub use smoother::{SmoothedPrediction, SmootherConfig, SmootherState, TemporalSmoother};
pub use time::{FixedTime, SystemTime, TimeSource, Timestamp};
pub use window::SmoothingWindow;

/// Landmarks per detected hand
pub const NUM_LANDMARKS: usize = 21;

/// Coordinates per landmark (x, y, z)
pub const COORDS_PER_LANDMARK: usize = 3;

/// Length of every feature vector
pub const FEATURE_DIM: usize = NUM_LANDMARKS * COORDS_PER_LANDMARK;

/// Number of gesture classes (letters A-Z)
pub const NUM_CLASSES: usize = 26;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
