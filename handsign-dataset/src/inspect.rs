//! Read-only health check of collected data
//!
//! Reports, per letter, whether a store exists and how many valid samples it
//! holds, and summarizes the consolidated dataset when one has been written.
//! A store that fails validation is reported with its error instead of
//! aborting the whole inspection.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use handsign_core::GestureLabel;
use serde::Serialize;

use crate::assembly::CONSOLIDATED_FILE;
use crate::config::DatasetConfig;
use crate::schema::Dataset;
use crate::store::ClassStore;

/// State of one per-class store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreStatus {
    Missing,
    Valid { samples: usize, bytes: u64 },
    Invalid { error: String },
}

/// State of the consolidated dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsolidatedStatus {
    Missing,
    Valid {
        samples: usize,
        bytes: u64,
        per_class: BTreeMap<GestureLabel, usize>,
    },
    Invalid { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionReport {
    pub raw_dir: PathBuf,
    pub consolidated_path: PathBuf,
    pub stores: BTreeMap<GestureLabel, StoreStatus>,
    pub consolidated: ConsolidatedStatus,
}

impl InspectionReport {
    /// Total valid samples across stores
    pub fn stored_samples(&self) -> usize {
        self.stores
            .values()
            .map(|s| match s {
                StoreStatus::Valid { samples, .. } => *samples,
                _ => 0,
            })
            .sum()
    }

    pub fn invalid_stores(&self) -> Vec<GestureLabel> {
        self.stores
            .iter()
            .filter(|(_, s)| matches!(s, StoreStatus::Invalid { .. }))
            .map(|(l, _)| *l)
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.invalid_stores().is_empty()
            && !matches!(self.consolidated, ConsolidatedStatus::Invalid { .. })
    }
}

/// Inspect the stores and consolidated dataset named by `config`
pub fn inspect(config: &DatasetConfig) -> InspectionReport {
    let store = ClassStore::new(&config.raw_dir, config.duplicate_policy);

    let stores = GestureLabel::all()
        .map(|label| {
            let path = store.path_for(label);
            let status = if !path.is_file() {
                StoreStatus::Missing
            } else {
                match store.read(label) {
                    Ok(set) => StoreStatus::Valid {
                        samples: set.len(),
                        bytes: file_size(&path),
                    },
                    Err(e) => StoreStatus::Invalid {
                        error: e.to_string(),
                    },
                }
            };
            (label, status)
        })
        .collect();

    let consolidated_path = config.processed_dir.join(CONSOLIDATED_FILE);
    let consolidated = if !consolidated_path.is_file() {
        ConsolidatedStatus::Missing
    } else {
        match Dataset::read_csv(&consolidated_path, None) {
            Ok(set) => ConsolidatedStatus::Valid {
                samples: set.len(),
                bytes: file_size(&consolidated_path),
                per_class: set.class_counts(),
            },
            Err(e) => ConsolidatedStatus::Invalid {
                error: e.to_string(),
            },
        }
    };

    InspectionReport {
        raw_dir: config.raw_dir.clone(),
        consolidated_path,
        stores,
        consolidated,
    }
}

fn file_size(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Raw stores in {}", self.raw_dir.display())?;
        for (label, status) in &self.stores {
            match status {
                StoreStatus::Missing => {}
                StoreStatus::Valid { samples, bytes } => {
                    writeln!(f, "  {label}: {samples} samples ({bytes} bytes)")?
                }
                StoreStatus::Invalid { error } => writeln!(f, "  {label}: INVALID {error}")?,
            }
        }
        let missing: String = self
            .stores
            .iter()
            .filter(|(_, s)| matches!(s, StoreStatus::Missing))
            .map(|(l, _)| l.as_char())
            .collect();
        if !missing.is_empty() {
            writeln!(f, "  missing: {missing}")?;
        }
        writeln!(f, "  total: {} samples", self.stored_samples())?;

        writeln!(f, "Consolidated dataset {}", self.consolidated_path.display())?;
        match &self.consolidated {
            ConsolidatedStatus::Missing => writeln!(f, "  not assembled yet"),
            ConsolidatedStatus::Valid {
                samples,
                bytes,
                per_class,
            } => {
                writeln!(
                    f,
                    "  {samples} samples, {} classes ({bytes} bytes)",
                    per_class.len()
                )?;
                for (label, count) in per_class {
                    writeln!(f, "  {label}: {count}")?;
                }
                Ok(())
            }
            ConsolidatedStatus::Invalid { error } => writeln!(f, "  INVALID {error}"),
        }
    }
}
