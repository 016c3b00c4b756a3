//! Session recording
//!
//! ## Overview
//!
//! A session is one continuous stretch of live detection, from the moment the
//! user starts recognition to the moment it stops. Every classified frame is
//! handed to the recorder twice:
//!
//! ```text
//!                  ┌─► record_raw()        counted, first N kept verbatim
//! classifier ──────┤
//!                  └─► record_prediction() kept only if above the floor
//! ```
//!
//! Both see the per-frame classifier result, not the smoothed display value,
//! so the statistics describe what the model actually said on each frame.
//!
//! Raw records are counted without bound but only the first
//! `max_logged_records` are kept, so memory stays fixed however long the
//! session runs. Confidences strictly above the floor feed an online mean
//! (`mean += (x - mean) / n`), a running max and per-label counts; no list of
//! confidences is ever stored.
//!
//! ## Persistence
//!
//! [`SessionStore`] writes one JSON document per session, named after the end
//! timestamp (`session_20240131_235959_123.json`). Existing files are never
//! replaced: a second session ending in the same millisecond gets a numeric
//! suffix (`session_20240131_235959_123_1.json`). A failed write is returned
//! to the caller and never poisons the pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use heapless::Vec as BoundedVec;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::errors::{PipelineError, PipelineResult};
use crate::features::FeatureVector;
use crate::labels::GestureLabel;
use crate::persist;
use crate::time::{self, Timestamp};

/// Hard upper bound on retained raw records
pub const MAX_LOGGED_RECORDS: usize = 256;

/// Number of leading raw feature values kept per logged record
pub const LOGGED_FEATURES: usize = 10;

/// Recorder tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Per-frame confidence must be strictly above this to count towards the statistics
    pub confidence_floor: f32,
    /// Raw records retained per session
    pub max_logged_records: usize,
    /// Directory receiving session summaries
    pub sessions_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.7,
            max_logged_records: 100,
            sessions_dir: PathBuf::from("sessions"),
        }
    }
}

impl RecorderConfig {
    /// Reject a floor outside `[0, 1]` or a log larger than [`MAX_LOGGED_RECORDS`]
    pub fn validate(&self) -> PipelineResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(PipelineError::InvalidConfig(format!(
                "recorder.confidence_floor must be in [0, 1], got {}",
                self.confidence_floor
            )));
        }
        if self.max_logged_records > MAX_LOGGED_RECORDS {
            return Err(PipelineError::InvalidConfig(format!(
                "recorder.max_logged_records must be at most {MAX_LOGGED_RECORDS}, got {}",
                self.max_logged_records
            )));
        }
        Ok(())
    }
}

/// One raw classification as logged in the session file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Frame time
    pub timestamp: Timestamp,
    /// Classifier's top label for the frame
    pub label: GestureLabel,
    /// Probability of `label`
    pub confidence: f32,
    /// Leading raw (un-normalized) feature values
    pub features: [f32; LOGGED_FEATURES],
}

impl RawRecord {
    /// Record `result` with the head of the un-normalized `features`
    pub fn new(result: &ClassificationResult, features: &FeatureVector, timestamp: Timestamp) -> Self {
        let mut head = [0.0f32; LOGGED_FEATURES];
        head.copy_from_slice(&features.as_slice()[..LOGGED_FEATURES]);
        Self {
            timestamp,
            label: result.label,
            confidence: result.confidence,
            features: head,
        }
    }
}

/// Aggregated statistics of one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session start, RFC 3339
    pub started_at: String,
    /// Session end, RFC 3339
    pub ended_at: String,
    /// Session start, ms since the epoch
    pub start_timestamp: Timestamp,
    /// Session end, ms since the epoch
    pub end_timestamp: Timestamp,
    /// `end_timestamp - start_timestamp`
    pub duration_ms: u64,
    /// Every classified frame
    pub raw_count: u64,
    /// Classified frames strictly above the floor
    pub filtered_count: u64,
    /// Mean confidence over filtered frames, 0 when there are none
    pub mean_confidence: f32,
    /// Max confidence over filtered frames, 0 when there are none
    pub max_confidence: f32,
    /// Floor the session was recorded with
    pub confidence_floor: f32,
    /// Filtered frames per label
    pub label_counts: BTreeMap<GestureLabel, u64>,
    /// Leading raw records, in arrival order
    pub records: Vec<RawRecord>,
}

impl SessionSummary {
    /// Label with the most filtered frames; ties go to the earlier letter
    pub fn dominant_label(&self) -> Option<GestureLabel> {
        self.label_counts
            .iter()
            .fold(None, |best: Option<(GestureLabel, u64)>, (&label, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((label, count)),
            })
            .map(|(label, _)| label)
    }
}

/// Running statistics for the active session
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    floor: f32,
    max_logged: usize,
    start: Timestamp,
    raw_count: u64,
    filtered_count: u64,
    mean: f32,
    max: f32,
    label_counts: BTreeMap<GestureLabel, u64>,
    records: BoundedVec<RawRecord, MAX_LOGGED_RECORDS>,
}

impl SessionRecorder {
    /// Begin a session at `start`
    pub fn start(config: &RecorderConfig, start: Timestamp) -> Self {
        debug!("Session started at {}", time::to_rfc3339(start));
        Self {
            floor: config.confidence_floor,
            max_logged: config.max_logged_records.min(MAX_LOGGED_RECORDS),
            start,
            raw_count: 0,
            filtered_count: 0,
            mean: 0.0,
            max: 0.0,
            label_counts: BTreeMap::new(),
            records: BoundedVec::new(),
        }
    }

    /// Log one raw classification
    pub fn record_raw(
        &mut self,
        result: &ClassificationResult,
        features: &FeatureVector,
        timestamp: Timestamp,
    ) {
        self.raw_count += 1;
        if self.records.len() < self.max_logged {
            // Capacity checked against max_logged <= MAX_LOGGED_RECORDS
            let _ = self.records.push(RawRecord::new(result, features, timestamp));
        }
    }

    /// Fold one frame's classification into the statistics
    ///
    /// Returns whether it cleared the confidence floor. A confidence equal to
    /// the floor does not.
    pub fn record_prediction(&mut self, label: GestureLabel, confidence: f32) -> bool {
        if confidence.is_nan() || confidence <= self.floor {
            return false;
        }

        self.filtered_count += 1;
        self.mean += (confidence - self.mean) / self.filtered_count as f32;
        if confidence > self.max {
            self.max = confidence;
        }
        *self.label_counts.entry(label).or_insert(0) += 1;
        true
    }

    /// Frames classified so far
    pub fn raw_count(&self) -> u64 {
        self.raw_count
    }

    /// Frames above the floor so far
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count
    }

    /// Running mean over filtered frames
    pub fn mean_confidence(&self) -> f32 {
        self.mean
    }

    /// Running max over filtered frames
    pub fn max_confidence(&self) -> f32 {
        self.max
    }

    /// Session start time
    pub fn started_at(&self) -> Timestamp {
        self.start
    }

    /// Close the session
    pub fn finish(self, end: Timestamp) -> SessionSummary {
        let end = end.max(self.start);
        SessionSummary {
            started_at: time::to_rfc3339(self.start),
            ended_at: time::to_rfc3339(end),
            start_timestamp: self.start,
            end_timestamp: end,
            duration_ms: end - self.start,
            raw_count: self.raw_count,
            filtered_count: self.filtered_count,
            mean_confidence: self.mean,
            max_confidence: self.max,
            confidence_floor: self.floor,
            label_counts: self.label_counts,
            records: self.records.into_iter().collect(),
        }
    }
}

/// Suffixes tried for sessions ending in the same millisecond
const MAX_KEY_COLLISIONS: u32 = 1_000;

/// Directory of persisted session summaries
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store rooted at `dir`, created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the session files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Preferred path of a summary ending at `end`
    pub fn path_for(&self, end: Timestamp) -> PathBuf {
        self.dir.join(format!("session_{}.json", time::file_key(end)))
    }

    fn suffixed_path(&self, end: Timestamp, n: u32) -> PathBuf {
        self.dir
            .join(format!("session_{}_{n}.json", time::file_key(end)))
    }

    /// Write a summary without replacing any existing session file
    ///
    /// Returns the path actually written.
    pub fn persist(&self, summary: &SessionSummary) -> PipelineResult<PathBuf> {
        let bytes = serde_json::to_vec_pretty(summary)?;
        let mut path = self.path_for(summary.end_timestamp);
        let mut n = 0;
        while !persist::write_new(&path, |out| out.write_all(&bytes))? {
            n += 1;
            if n > MAX_KEY_COLLISIONS {
                return Err(PipelineError::storage(
                    &path,
                    io::Error::new(io::ErrorKind::AlreadyExists, "no free session file name"),
                ));
            }
            path = self.suffixed_path(summary.end_timestamp, n);
        }
        info!(
            "Session saved to {} ({} frames, {} confident, mean {:.3})",
            path.display(),
            summary.raw_count,
            summary.filtered_count,
            summary.mean_confidence
        );
        Ok(path)
    }

    /// Read one persisted summary
    pub fn load(&self, path: &Path) -> PipelineResult<SessionSummary> {
        persist::read_json(path)
    }

    /// Persisted session files, oldest first
    pub fn list(&self) -> PipelineResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| PipelineError::storage(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::storage(&self.dir, e))?.path();
            let is_session = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("session_") && n.ends_with(".json"))
                .unwrap_or(false);
            if is_session {
                paths.push(path);
            }
        }
        // File keys sort chronologically
        paths.sort();
        Ok(paths)
    }
}
