//! Consolidation of per-class stores
//!
//! ```text
//!   A_coordinates.csv ─┐
//!   B_coordinates.csv ─┼──► check rows ──► complete_dataset.csv
//!   ...               ─┤        │
//!   Z_coordinates.csv ─┘        └──► rejected stores (logged, reported)
//! ```
//!
//! Stores are read in alphabet order, so the consolidated file lists all
//! samples of `A` first, then `B`, and so on, each class in collection order.
//!
//! A store with a malformed row is rejected as a whole: none of its rows
//! reach the dataset, and the other letters are still assembled. Missing
//! stores are skipped. Only an assembly with no usable store at all fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use handsign_core::GestureLabel;
use log::{info, warn};

use crate::error::{DatasetError, DatasetResult};
use crate::schema::Dataset;
use crate::store::ClassStore;

/// File name of the consolidated dataset inside the processed directory
pub const CONSOLIDATED_FILE: &str = "complete_dataset.csv";

/// Outcome of one assembly run
#[derive(Debug)]
pub struct AssemblyReport {
    /// Union of every accepted store
    pub dataset: Dataset,
    /// Samples taken from each accepted store
    pub loaded: BTreeMap<GestureLabel, usize>,
    /// Letters with no store
    pub missing: Vec<GestureLabel>,
    /// Stores dropped because a row failed validation
    pub rejected: Vec<(GestureLabel, DatasetError)>,
}

impl AssemblyReport {
    /// Letters whose store was dropped
    pub fn rejected_labels(&self) -> Vec<GestureLabel> {
        self.rejected.iter().map(|(label, _)| *label).collect()
    }
}

/// Reads every class store into one dataset
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    store: ClassStore,
    processed_dir: PathBuf,
}

impl DatasetAssembler {
    pub fn new(store: ClassStore, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            processed_dir: processed_dir.into(),
        }
    }

    pub fn store(&self) -> &ClassStore {
        &self.store
    }

    /// Path of the consolidated dataset
    pub fn output_path(&self) -> PathBuf {
        self.processed_dir.join(CONSOLIDATED_FILE)
    }

    /// Union of every valid store, without writing anything
    ///
    /// A store that fails validation is logged and reported; I/O failures
    /// outside a store's content still abort.
    pub fn collect(&self) -> DatasetResult<AssemblyReport> {
        let mut report = AssemblyReport {
            dataset: Dataset::default(),
            loaded: BTreeMap::new(),
            missing: Vec::new(),
            rejected: Vec::new(),
        };

        for label in GestureLabel::all() {
            if !self.store.exists(label) {
                report.missing.push(label);
                continue;
            }
            match self.store.read(label) {
                Ok(class) => {
                    info!("Loaded {} samples for {label}", class.len());
                    report.loaded.insert(label, class.len());
                    report.dataset.extend(class.samples().iter().copied());
                }
                Err(e @ (DatasetError::Schema { .. } | DatasetError::Csv { .. })) => {
                    warn!("Rejected store for {label}: {e}");
                    report.rejected.push((label, e));
                }
                Err(e) => return Err(e),
            }
        }

        if !report.missing.is_empty() {
            let letters: String = report.missing.iter().map(|l| l.as_char()).collect();
            warn!("No store for {} letters: {letters}", report.missing.len());
        }
        if report.dataset.is_empty() {
            return Err(DatasetError::EmptyDataset(format!(
                "no valid samples under {} ({} stores rejected)",
                self.store.raw_dir().display(),
                report.rejected.len()
            )));
        }
        Ok(report)
    }

    /// Collect every store and write the consolidated file
    pub fn assemble(&self) -> DatasetResult<AssemblyReport> {
        let report = self.collect()?;
        let path = self.output_path();
        report.dataset.write_csv(&path)?;
        info!(
            "Wrote {} samples over {} classes to {}",
            report.dataset.len(),
            report.loaded.len(),
            path.display()
        );
        if !report.rejected.is_empty() {
            warn!(
                "{} stores were rejected and left out: {:?}",
                report.rejected.len(),
                report.rejected_labels()
            );
        }
        Ok(report)
    }
}

/// Read a previously consolidated dataset
pub fn load_consolidated(processed_dir: &Path) -> DatasetResult<Dataset> {
    Dataset::read_csv(&processed_dir.join(CONSOLIDATED_FILE), None)
}
