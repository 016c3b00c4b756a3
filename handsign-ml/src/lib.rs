//! File-based gesture classifier for HandSign
//!
//! ## Overview
//!
//! Training happens outside this workspace. What arrives here is a JSON
//! artifact describing a small feed-forward network, which this crate loads,
//! validates and evaluates behind the core [`Classifier`] trait.
//!
//! ```text
//! normalized features (63) ─► Dense+ReLU ─► ... ─► Dense+Softmax ─► P(A..Z) (26)
//! ```
//!
//! ## Why a dense network?
//!
//! Static letter gestures are separable from a single normalized landmark
//! vector, and a two or three layer perceptron is what the collection tool
//! trains. Evaluating one takes a few thousand multiply-adds per frame, far
//! below the cost of the hand estimator that produces its input.
//!
//! ## Artifact identity
//!
//! The artifact records the id of the normalization state it was trained
//! against. [`handsign_core::RecognitionPipeline`] refuses to start if that id
//! differs from the normalization artifact it loaded.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use handsign_core::{FixedTime, PipelineConfig, RecognitionPipeline};
//! use handsign_ml::DenseClassifier;
//!
//! let config = PipelineConfig::default();
//! let pipeline = RecognitionPipeline::from_config(
//!     config,
//!     |path: &Path| DenseClassifier::load(path),
//!     FixedTime::new(0),
//! );
//! ```
//!
//! [`Classifier`]: handsign_core::Classifier

#![deny(unsafe_code)]

pub mod error;
pub mod layer;
pub mod model;

pub use error::{ModelError, ModelResult};
pub use layer::{Activation, DenseLayer};
pub use model::{DenseClassifier, MODEL_FORMAT_VERSION};
