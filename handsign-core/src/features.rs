//! Landmark feature extraction
//!
//! Turns one frame of hand-estimator output into the fixed-length vector the
//! classifier was trained on.
//!
//! Layout (shared by dataset stores and live inference):
//! - index `3*i + 0`: x of landmark i
//! - index `3*i + 1`: y of landmark i
//! - index `3*i + 2`: z of landmark i
//!
//! for i in 0..21, in the estimator's landmark order (wrist first).

use crate::errors::{PipelineError, PipelineResult};
use crate::{COORDS_PER_LANDMARK, FEATURE_DIM, NUM_LANDMARKS};

/// One detected keypoint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// Horizontal position, normalized to the image width
    pub x: f32,
    /// Vertical position, normalized to the image height
    pub y: f32,
    /// Depth relative to the wrist
    pub z: f32,
}

impl Landmark {
    /// Keypoint at `(x, y, z)`
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Landmarks of one detected hand, as reported by the estimator
///
/// A well-formed hand has exactly [`NUM_LANDMARKS`] points. Anything else is
/// malformed upstream data and never becomes a [`FeatureVector`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectedHand {
    /// Keypoints in estimator order, wrist first
    pub landmarks: Vec<Landmark>,
}

impl DetectedHand {
    /// Hand from its keypoints, unchecked
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }
}

/// Everything the estimator found in one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectorOutput {
    /// Detected hands in the order the estimator reported them
    pub hands: Vec<DetectedHand>,
}

impl DetectorOutput {
    /// Frame with no detections
    pub fn empty() -> Self {
        Self::default()
    }

    /// Frame with a single detected hand
    pub fn single(hand: DetectedHand) -> Self {
        Self { hands: vec![hand] }
    }
}

/// Flattened landmarks of one hand
///
/// The array length is the feature contract, so a `FeatureVector` of the
/// wrong dimensionality cannot exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_DIM]);

impl FeatureVector {
    /// Wrap an array of the contract length
    pub fn new(values: [f32; FEATURE_DIM]) -> Self {
        Self(values)
    }

    /// Build from an untyped slice, rejecting the wrong dimensionality
    pub fn from_slice(values: &[f32]) -> PipelineResult<Self> {
        let array: [f32; FEATURE_DIM] =
            values.try_into().map_err(|_| PipelineError::SchemaMismatch {
                expected: FEATURE_DIM,
                actual: values.len(),
            })?;
        Ok(Self(array))
    }

    /// Components as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Components as the fixed-size array
    pub fn as_array(&self) -> &[f32; FEATURE_DIM] {
        &self.0
    }

    /// Iterate over the components
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.0.iter()
    }

    /// All components are finite
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl TryFrom<&[f32]> for FeatureVector {
    type Error = PipelineError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        Self::from_slice(values)
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = PipelineError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Why a frame produced no feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceReason {
    /// No hand in frame
    NoHand,
    /// The first hand had the wrong number of points
    Malformed {
        /// Number of points the estimator reported
        points: usize,
    },
    /// The first hand contained NaN or infinite coordinates
    NonFinite,
}

/// Result of extracting one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// A well-formed hand was found
    Present(FeatureVector),
    /// Nothing usable this frame
    Absent(AbsenceReason),
}

impl Detection {
    /// A feature vector was extracted
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The feature vector, if one was extracted
    pub fn features(&self) -> Option<&FeatureVector> {
        match self {
            Self::Present(features) => Some(features),
            Self::Absent(_) => None,
        }
    }
}

/// Stateless extractor from estimator output to feature vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// New extractor
    pub fn new() -> Self {
        Self
    }

    /// Extract the first reported hand of a frame
    ///
    /// Additional hands are ignored; multi-hand scenes are not supported.
    pub fn extract(&self, output: &DetectorOutput) -> Detection {
        match output.hands.first() {
            Some(hand) => self.flatten(hand),
            None => Detection::Absent(AbsenceReason::NoHand),
        }
    }

    /// Flatten one hand, x/y/z per point in landmark order
    pub fn flatten(&self, hand: &DetectedHand) -> Detection {
        if hand.landmarks.len() != NUM_LANDMARKS {
            return Detection::Absent(AbsenceReason::Malformed {
                points: hand.landmarks.len(),
            });
        }

        if !hand.landmarks.iter().all(Landmark::is_finite) {
            return Detection::Absent(AbsenceReason::NonFinite);
        }

        let mut values = [0.0f32; FEATURE_DIM];
        for (i, point) in hand.landmarks.iter().enumerate() {
            let base = i * COORDS_PER_LANDMARK;
            values[base] = point.x;
            values[base + 1] = point.y;
            values[base + 2] = point.z;
        }

        Detection::Present(FeatureVector(values))
    }
}

/// Column names of the tabular feature layout: `x_0, y_0, z_0, ..., z_20`
pub fn feature_column_names() -> Vec<String> {
    (0..NUM_LANDMARKS)
        .flat_map(|i| [format!("x_{i}"), format!("y_{i}"), format!("z_{i}")])
        .collect()
}
