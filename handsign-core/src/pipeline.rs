//! Online Recognition Pipeline
//!
//! ## Overview
//!
//! The pipeline wires the per-frame stages of live recognition into one owner
//! that processes a single frame to completion before accepting the next:
//!
//! ```text
//! DetectorOutput → Extract → Normalize → Classify ──┬──► Smooth → FrameOutcome
//!                     ↓          ↓           ↓      │       ↓
//!                  Absent?   Transform   Schema /   │    Warming/
//!                             error      Transform  │     Stable
//!                                                   └──► Record (session statistics)
//! ```
//!
//! The recorder sees the classifier's per-frame result. Smoothing only shapes
//! what is displayed, so a low-confidence frame that the window votes back to
//! an earlier label still counts as low-confidence in the session summary.
//!
//! ## Error Propagation
//!
//! Construction is the only place a fatal error can surface: a missing or
//! mismatched artifact stops the pipeline before it sees any frame. Once
//! running, nothing a frame does can halt the stream. Absent hands, malformed
//! detections and per-frame classifier failures all become
//! [`FrameOutcome::NoPrediction`], are counted in [`PipelineMetrics`] and are
//! logged.
//!
//! ## Sessions
//!
//! Frames only flow while a session is active. `start_session()` resets the
//! smoother and opens a fresh recorder; `stop_session()` closes the recorder and
//! hands back its summary. Stopping is immediate, so a frame that has not been
//! submitted yet simply never reaches the closed session.
//!
//! ## Usage
//!
//! ```no_run
//! use handsign_core::{
//!     DetectorOutput, FrameOutcome, NormalizationState, PipelineConfig,
//!     RecognitionPipeline, SessionStore, SystemTime,
//! };
//! # use handsign_core::{Classifier, PipelineResult};
//! # struct Model;
//! # impl Classifier for Model {
//! #     fn input_dim(&self) -> usize { 63 }
//! #     fn num_classes(&self) -> usize { 26 }
//! #     fn predict(&self, _: &[f32]) -> PipelineResult<Vec<f32>> { Ok(vec![1.0 / 26.0; 26]) }
//! # }
//! # fn main() -> PipelineResult<()> {
//! let config = PipelineConfig::default();
//! let normalization = NormalizationState::load(&config.artifacts.normalization)?;
//! let mut pipeline = RecognitionPipeline::new(normalization, Model, config.clone(), SystemTime)?;
//!
//! pipeline.start_session();
//! if let FrameOutcome::Prediction(p) = pipeline.process_frame(&DetectorOutput::empty()) {
//!     println!("{} ({:.2})", p.label, p.confidence);
//! }
//! pipeline.stop_and_persist(&SessionStore::new(&config.recorder.sessions_dir))?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::classifier::{ClassificationResult, Classifier};
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::features::{AbsenceReason, Detection, DetectorOutput, FeatureExtractor};
use crate::normalization::{short_id, NormalizationState};
use crate::session::{SessionRecorder, SessionStore, SessionSummary};
use crate::smoother::{SmoothedPrediction, TemporalSmoother};
use crate::time::{SystemTime, TimeSource};
use crate::{FEATURE_DIM, NUM_CLASSES};

/// Why a frame produced no prediction
#[derive(Debug, Clone, PartialEq)]
pub enum NoPredictionReason {
    /// Extractor found nothing usable
    Absent(AbsenceReason),
    /// Normalization rejected the features
    Normalization(String),
    /// Classifier call or its output failed validation
    Classification(String),
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// No session is active; the frame was ignored
    NoSession,
    /// The frame was consumed without producing a prediction
    NoPrediction(NoPredictionReason),
    /// Stabilized prediction after this frame
    Prediction(SmoothedPrediction),
}

impl FrameOutcome {
    /// The prediction, if this frame produced one
    pub fn prediction(&self) -> Option<&SmoothedPrediction> {
        match self {
            Self::Prediction(p) => Some(p),
            _ => None,
        }
    }
}

/// Frame counters, cumulative over the pipeline's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineMetrics {
    /// Frames submitted while a session was active
    pub frames_processed: u64,
    /// Frames with no hand
    pub frames_absent: u64,
    /// Frames whose hand had the wrong shape or non-finite coordinates
    pub frames_malformed: u64,
    /// Frames dropped by a normalization or classifier error
    pub frames_failed: u64,
    /// Frames that produced a prediction
    pub predictions: u64,
    /// Frames submitted with no active session
    pub frames_ignored: u64,
    /// Calls to `start_session`
    pub sessions_started: u64,
}

/// Per-session state, dropped as a unit on stop
struct ActiveSession {
    recorder: SessionRecorder,
}

/// Owner of the online recognition flow
pub struct RecognitionPipeline<C: Classifier, T: TimeSource = SystemTime> {
    extractor: FeatureExtractor,
    normalization: NormalizationState,
    classifier: C,
    smoother: TemporalSmoother,
    config: PipelineConfig,
    time: T,
    session: Option<ActiveSession>,
    metrics: PipelineMetrics,
}

impl<C: Classifier, T: TimeSource> RecognitionPipeline<C, T> {
    /// Build a pipeline from loaded artifacts
    ///
    /// Fails if the configuration is invalid, the artifacts disagree on
    /// dimensionality, or the classifier was trained against a different
    /// normalization state.
    pub fn new(
        normalization: NormalizationState,
        classifier: C,
        config: PipelineConfig,
        time: T,
    ) -> PipelineResult<Self> {
        config.validate()?;
        normalization.validate().map_err(|e| {
            PipelineError::artifact(config.artifacts.normalization.display().to_string(), e.to_string())
        })?;
        check_classifier(&classifier, &config.artifacts.classifier)?;

        match classifier.normalization_id() {
            Some(id) if id != normalization.id => {
                return Err(PipelineError::ArtifactMismatch {
                    normalization: normalization.id.clone(),
                    classifier: id.to_string(),
                });
            }
            Some(_) => {}
            None => warn!(
                "Classifier does not record a normalization id; cannot verify it matches {}",
                short_id(&normalization.id)
            ),
        }

        let smoother = TemporalSmoother::new(config.smoother)?;
        info!(
            "Recognition pipeline ready (normalization {}, window {}, floor {})",
            short_id(&normalization.id),
            config.smoother.window_capacity,
            config.recorder.confidence_floor
        );

        Ok(Self {
            extractor: FeatureExtractor::new(),
            normalization,
            classifier,
            smoother,
            config,
            time,
            session: None,
            metrics: PipelineMetrics::default(),
        })
    }

    /// Load the normalization artifact named in `config` and the classifier
    /// through `load_classifier`
    pub fn from_config<F>(config: PipelineConfig, load_classifier: F, time: T) -> PipelineResult<Self>
    where
        F: FnOnce(&Path) -> PipelineResult<C>,
    {
        config.validate()?;
        let normalization = NormalizationState::load(&config.artifacts.normalization)?;
        let classifier = load_classifier(&config.artifacts.classifier)?;
        Self::new(normalization, classifier, config, time)
    }

    /// Open a new session, discarding any prediction history
    ///
    /// An already active session is closed and its summary dropped.
    pub fn start_session(&mut self) {
        if let Some(previous) = self.session.take() {
            warn!(
                "Starting a new session while one is active; discarding {} recorded frames",
                previous.recorder.raw_count()
            );
        }
        self.smoother.reset();
        self.session = Some(ActiveSession {
            recorder: SessionRecorder::start(&self.config.recorder, self.time.now()),
        });
        self.metrics.sessions_started += 1;
    }

    /// Whether frames are currently being recorded
    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Run one frame through every stage
    pub fn process_frame(&mut self, frame: &DetectorOutput) -> FrameOutcome {
        let Some(session) = self.session.as_mut() else {
            self.metrics.frames_ignored += 1;
            return FrameOutcome::NoSession;
        };
        self.metrics.frames_processed += 1;

        let features = match self.extractor.extract(frame) {
            Detection::Present(features) => features,
            Detection::Absent(reason) => {
                match reason {
                    AbsenceReason::NoHand => self.metrics.frames_absent += 1,
                    _ => {
                        self.metrics.frames_malformed += 1;
                        debug!("Dropping malformed detection: {reason:?}");
                    }
                }
                return FrameOutcome::NoPrediction(NoPredictionReason::Absent(reason));
            }
        };

        let normalized = match self.normalization.transform(&features) {
            Ok(v) => v,
            Err(e) => {
                self.metrics.frames_failed += 1;
                warn!("Frame skipped, normalization failed: {e}");
                return FrameOutcome::NoPrediction(NoPredictionReason::Normalization(e.to_string()));
            }
        };

        let result = match self
            .classifier
            .predict(normalized.as_slice())
            .and_then(|probs| ClassificationResult::from_probabilities(&probs))
        {
            Ok(result) => result,
            Err(e) => {
                self.metrics.frames_failed += 1;
                warn!("Frame skipped, classification failed: {e}");
                return FrameOutcome::NoPrediction(NoPredictionReason::Classification(e.to_string()));
            }
        };

        session
            .recorder
            .record_raw(&result, &features, self.time.now());
        session
            .recorder
            .record_prediction(result.label, result.confidence);
        let prediction = self.smoother.update(result);

        self.metrics.predictions += 1;
        FrameOutcome::Prediction(prediction)
    }

    /// Latest stabilized prediction of the active session
    pub fn current(&self) -> Option<SmoothedPrediction> {
        self.session.as_ref()?;
        self.smoother.current()
    }

    /// Close the active session and return its summary
    pub fn stop_session(&mut self) -> Option<SessionSummary> {
        let session = self.session.take()?;
        let summary = session.recorder.finish(self.time.now());
        info!(
            "Session stopped after {} ms: {} frames, {} above floor",
            summary.duration_ms, summary.raw_count, summary.filtered_count
        );
        Some(summary)
    }

    /// Close the active session and persist its summary
    ///
    /// A storage failure is returned; the session is closed either way.
    pub fn stop_and_persist(&mut self, store: &SessionStore) -> PipelineResult<Option<PathBuf>> {
        match self.stop_session() {
            Some(summary) => store.persist(&summary).map(Some),
            None => Ok(None),
        }
    }

    /// Counters since construction
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Validated configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalization state applied to every frame
    pub fn normalization(&self) -> &NormalizationState {
        &self.normalization
    }

    /// Wrapped classifier
    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

fn check_classifier<C: Classifier>(classifier: &C, path: &Path) -> PipelineResult<()> {
    let artifact = || path.display().to_string();
    if classifier.input_dim() != FEATURE_DIM {
        return Err(PipelineError::artifact(
            artifact(),
            format!("classifier expects {} inputs, features have {FEATURE_DIM}", classifier.input_dim()),
        ));
    }
    if classifier.num_classes() != NUM_CLASSES {
        return Err(PipelineError::artifact(
            artifact(),
            format!("classifier has {} classes, expected {NUM_CLASSES}", classifier.num_classes()),
        ));
    }
    Ok(())
}
