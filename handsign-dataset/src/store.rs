//! Per-class sample stores
//!
//! Collection appends samples for one letter at a time to
//! `<raw_dir>/<LETTER>_coordinates.csv`. A store file is created with the
//! header on first append and only grows afterwards.
//!
//! ## Duplicates
//!
//! Holding a gesture still in front of the camera can produce bit-identical
//! frames. [`DuplicatePolicy::Keep`] stores them all, which is what the
//! collection tool has always done. [`DuplicatePolicy::SkipExisting`] drops a
//! row whose features exactly match a row already in the store or earlier in
//! the same batch.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use handsign_core::{FeatureVector, GestureLabel, FEATURE_DIM};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, DatasetResult};
use crate::schema::{self, Dataset, LabeledSample};

/// What to do with exact duplicate rows on append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Store every row
    #[default]
    Keep,
    /// Skip rows identical to one already stored
    SkipExisting,
}

/// Outcome of one append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub written: usize,
    pub skipped: usize,
}

/// Directory of per-letter sample files
#[derive(Debug, Clone)]
pub struct ClassStore {
    raw_dir: PathBuf,
    policy: DuplicatePolicy,
}

impl ClassStore {
    pub fn new(raw_dir: impl Into<PathBuf>, policy: DuplicatePolicy) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            policy,
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// File holding samples for `label`
    pub fn path_for(&self, label: GestureLabel) -> PathBuf {
        self.raw_dir.join(format!("{label}_coordinates.csv"))
    }

    pub fn exists(&self, label: GestureLabel) -> bool {
        self.path_for(label).is_file()
    }

    /// Letters that have a store, in alphabet order
    pub fn existing_labels(&self) -> Vec<GestureLabel> {
        GestureLabel::all().filter(|l| self.exists(*l)).collect()
    }

    /// Append samples for one letter
    pub fn append(&self, label: GestureLabel, samples: &[FeatureVector]) -> DatasetResult<AppendReport> {
        let path = self.path_for(label);
        let is_new = !path.is_file();

        let mut seen: HashSet<[u32; FEATURE_DIM]> = HashSet::new();
        if self.policy == DuplicatePolicy::SkipExisting && !is_new {
            for existing in self.read(label)?.samples() {
                seen.insert(existing.feature_bits());
            }
        }

        let mut rows = Vec::with_capacity(samples.len());
        let mut report = AppendReport::default();
        for features in samples {
            let sample = LabeledSample::new(*features, label);
            if self.policy == DuplicatePolicy::SkipExisting && !seen.insert(sample.feature_bits()) {
                report.skipped += 1;
                continue;
            }
            rows.push(sample);
        }
        report.written = rows.len();

        if report.skipped > 0 {
            warn!(
                "Skipped {} duplicate samples for {label} ({} new)",
                report.skipped, report.written
            );
        }
        if rows.is_empty() && !is_new {
            return Ok(report);
        }

        fs::create_dir_all(&self.raw_dir).map_err(|e| DatasetError::io(&self.raw_dir, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DatasetError::io(&path, e))?;
        schema::write_rows(&mut file, rows.iter(), is_new).map_err(|e| DatasetError::io(&path, e))?;
        file.sync_all().map_err(|e| DatasetError::io(&path, e))?;

        info!("Stored {} samples for {label} in {}", report.written, path.display());
        Ok(report)
    }

    /// All samples of one letter; any bad row rejects the store
    pub fn read(&self, label: GestureLabel) -> DatasetResult<Dataset> {
        let path = self.path_for(label);
        let dataset = Dataset::read_csv(&path, Some(label))?;
        debug!("Read {} samples from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Number of samples stored for `label`, 0 if there is no store
    pub fn count(&self, label: GestureLabel) -> DatasetResult<usize> {
        if !self.exists(label) {
            return Ok(0);
        }
        Ok(self.read(label)?.len())
    }
}
