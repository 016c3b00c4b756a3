//! Offline dataset configuration

use std::path::{Path, PathBuf};

use handsign_core::persist;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::DatasetResult;
use crate::split::SplitRatios;
use crate::store::DuplicatePolicy;

/// Seed used for the split unless configured otherwise
pub const DEFAULT_SEED: u64 = 42;

/// Locations and parameters of the offline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding `<LETTER>_coordinates.csv` stores
    pub raw_dir: PathBuf,
    /// Directory receiving the consolidated dataset, splits and artifacts
    pub processed_dir: PathBuf,
    pub ratios: SplitRatios,
    pub seed: u64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw_coordinates"),
            processed_dir: PathBuf::from("data/processed"),
            ratios: SplitRatios::default(),
            seed: DEFAULT_SEED,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> DatasetResult<()> {
        self.ratios.validate()
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> DatasetResult<Self> {
        let config: Self = persist::read_json(path)?;
        config.validate()?;
        info!("Loaded dataset configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> DatasetResult<()> {
        persist::write_json_atomic(path, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;

    #[test]
    fn defaults() {
        let config = DatasetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed, 42);
        assert_eq!(config.raw_dir, PathBuf::from("data/raw_coordinates"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Keep);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, r#"{"seed": 7, "duplicate_policy": "skip_existing"}"#).unwrap();

        let config = DatasetConfig::load(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::SkipExisting);
        assert_eq!(config.ratios, SplitRatios::default());
    }

    #[test]
    fn bad_ratios_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, r#"{"ratios": {"train": 0.7, "val": 0.2, "test": 0.2}}"#).unwrap();
        assert!(matches!(
            DatasetConfig::load(&path),
            Err(DatasetError::InvalidRatios(_))
        ));
    }
}
