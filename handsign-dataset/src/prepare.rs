//! End-to-end offline preparation
//!
//! ## Stages
//!
//! ```text
//!   stores ──► assemble ──► split ──► fit(train) ──► transform(train, val, test)
//!                 │                       │                    │
//!                 ▼                       ▼                    ▼
//!     complete_dataset.csv     normalization.json     train.csv val.csv test.csv
//!                                                      dataset_report.json
//! ```
//!
//! Statistics are fitted on the training subset only and the same state is
//! applied to all three subsets, so validation and test measure the model on
//! data the normalization has never seen. Every output is written through a
//! temporary file and renamed into place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use handsign_core::normalization::short_id;
use handsign_core::{persist, GestureLabel, NormalizationState};
use log::info;
use serde::{Deserialize, Serialize};

use crate::assembly::DatasetAssembler;
use crate::config::DatasetConfig;
use crate::error::DatasetResult;
use crate::schema::{Dataset, LabeledSample};
use crate::split::{SplitIndices, SplitRatios, StratifiedSplitter};
use crate::store::ClassStore;

pub const NORMALIZATION_FILE: &str = "normalization.json";
pub const TRAIN_FILE: &str = "train.csv";
pub const VAL_FILE: &str = "val.csv";
pub const TEST_FILE: &str = "test.csv";
pub const REPORT_FILE: &str = "dataset_report.json";

/// Sample counts of one subset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetCounts {
    pub total: usize,
    pub per_class: BTreeMap<GestureLabel, usize>,
}

impl SubsetCounts {
    fn of(dataset: &Dataset) -> Self {
        Self {
            total: dataset.len(),
            per_class: dataset.class_counts(),
        }
    }
}

/// Summary written next to the prepared splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    /// Identity of the fitted normalization state
    pub normalization_id: String,
    pub seed: u64,
    pub ratios: SplitRatios,
    pub total: usize,
    /// Letters whose store failed validation and was left out
    pub rejected_stores: Vec<GestureLabel>,
    pub train: SubsetCounts,
    pub val: SubsetCounts,
    pub test: SubsetCounts,
}

/// Everything `prepare` produced
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub normalization: NormalizationState,
    pub indices: SplitIndices,
    pub train: Dataset,
    pub val: Dataset,
    pub test: Dataset,
    pub report: DatasetReport,
}

/// Runs assembly, split and normalization fitting
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    assembler: DatasetAssembler,
    splitter: StratifiedSplitter,
    processed_dir: PathBuf,
    seed: u64,
    ratios: SplitRatios,
}

impl DatasetPreparer {
    pub fn new(config: &DatasetConfig) -> DatasetResult<Self> {
        config.validate()?;
        let store = ClassStore::new(&config.raw_dir, config.duplicate_policy);
        Ok(Self {
            assembler: DatasetAssembler::new(store, &config.processed_dir),
            splitter: StratifiedSplitter::new(config.ratios, config.seed)?,
            processed_dir: config.processed_dir.clone(),
            seed: config.seed,
            ratios: config.ratios,
        })
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn prepare(&self) -> DatasetResult<PreparedDataset> {
        let assembly = self.assembler.assemble()?;
        let rejected_stores = assembly.rejected_labels();
        let dataset = assembly.dataset;
        let indices = self.splitter.split(&dataset)?;

        let train_raw = dataset.select(&indices.train);
        let normalization = NormalizationState::fit(&train_raw.features())?;
        info!(
            "Fitted normalization {} on {} training samples",
            short_id(&normalization.id),
            normalization.fit_samples
        );

        let train = normalize(&normalization, &train_raw)?;
        let val = normalize(&normalization, &dataset.select(&indices.val))?;
        let test = normalize(&normalization, &dataset.select(&indices.test))?;

        let report = DatasetReport {
            normalization_id: normalization.id.clone(),
            seed: self.seed,
            ratios: self.ratios,
            total: dataset.len(),
            rejected_stores,
            train: SubsetCounts::of(&train),
            val: SubsetCounts::of(&val),
            test: SubsetCounts::of(&test),
        };

        let dir = &self.processed_dir;
        normalization.save(&dir.join(NORMALIZATION_FILE))?;
        train.write_csv(&dir.join(TRAIN_FILE))?;
        val.write_csv(&dir.join(VAL_FILE))?;
        test.write_csv(&dir.join(TEST_FILE))?;
        persist::write_json_atomic(&dir.join(REPORT_FILE), &report)?;

        info!(
            "Prepared {} samples: train {}, val {}, test {} in {}",
            report.total,
            report.train.total,
            report.val.total,
            report.test.total,
            dir.display()
        );

        Ok(PreparedDataset {
            normalization,
            indices,
            train,
            val,
            test,
            report,
        })
    }
}

fn normalize(state: &NormalizationState, subset: &Dataset) -> DatasetResult<Dataset> {
    let features = state.transform_batch(&subset.features())?;
    Ok(Dataset::new(
        features
            .into_iter()
            .zip(subset.samples())
            .map(|(f, s)| LabeledSample::new(f, s.label))
            .collect(),
    ))
}

/// Read the report of a previous `prepare`
pub fn load_report(processed_dir: &Path) -> DatasetResult<DatasetReport> {
    Ok(persist::read_json(&processed_dir.join(REPORT_FILE))?)
}
