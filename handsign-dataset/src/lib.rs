//! Offline Dataset Preparation for HandSign
//!
//! ## Overview
//!
//! Samples are collected one letter at a time and appended to a per-class
//! CSV store. Before training, the stores are consolidated, split into
//! train/validation/test subsets with class proportions preserved, and a
//! normalization state is fitted on the training subset. The fitted state is
//! the same artifact the online pipeline loads, so offline and online
//! standardization cannot drift apart. A trained classifier is finally
//! scored on the held-out test subset.
//!
//! ```text
//!  collection         assembly              split                 fit
//!  ┌──────────┐     ┌────────────┐     ┌──────────────┐     ┌───────────────┐
//!  │ClassStore│ ──► │  Dataset   │ ──► │  Stratified  │ ──► │Normalization- │
//!  │ A..Z.csv │     │ Assembler  │     │  Splitter    │     │ State (train) │
//!  └──────────┘     └────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! data/
//!   raw_coordinates/
//!     A_coordinates.csv ... Z_coordinates.csv
//!   processed/
//!     complete_dataset.csv
//!     normalization.json
//!     train.csv  val.csv  test.csv
//!     dataset_report.json
//!     evaluation_report.json
//! ```
//!
//! Every CSV shares the header `x_0,y_0,z_0,...,x_20,y_20,z_20,label`. Rows
//! are validated strictly; a malformed row rejects its whole file rather than
//! being padded, truncated or skipped.
//!
//! ## Reproducibility
//!
//! The split is driven by one seeded `StdRng` (seed 42 unless configured), so
//! the same stores and configuration always yield the same subsets and the
//! same normalization identity.
//!
//! ## Example
//!
//! ```no_run
//! use handsign_dataset::{DatasetConfig, DatasetPreparer};
//!
//! let config = DatasetConfig::default();
//! let prepared = DatasetPreparer::new(&config)?.prepare()?;
//! println!("normalization {}", prepared.report.normalization_id);
//! # Ok::<(), handsign_dataset::DatasetError>(())
//! ```

#![deny(unsafe_code)]

pub mod assembly;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod inspect;
pub mod prepare;
pub mod schema;
pub mod split;
pub mod store;

pub use assembly::{load_consolidated, AssemblyReport, DatasetAssembler, CONSOLIDATED_FILE};
pub use config::DatasetConfig;
pub use error::{DatasetError, DatasetResult};
pub use evaluate::{evaluate, evaluate_prepared, ClassMetrics, EvaluationReport, EVALUATION_FILE};
pub use inspect::{inspect, InspectionReport};
pub use prepare::{load_report, DatasetPreparer, DatasetReport, PreparedDataset};
pub use schema::{Dataset, LabeledSample};
pub use split::{SplitIndices, SplitRatios, StratifiedSplitter};
pub use store::{AppendReport, ClassStore, DuplicatePolicy};
