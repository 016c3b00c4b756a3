//! HandSign dataset tool
//!
//! Inspects collected class stores, consolidates them, prepares the
//! normalized train/validation/test splits used for training, and scores a
//! trained classifier on the test split.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use handsign_dataset::{
    evaluate_prepared, inspect, ClassStore, DatasetAssembler, DatasetConfig, DatasetPreparer,
    EVALUATION_FILE,
};
use handsign_ml::DenseClassifier;
use log::{info, warn};

/// HandSign dataset preparation CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug)]
struct PathArgs {
    /// JSON dataset configuration; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of per-letter coordinate stores
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Directory receiving the consolidated dataset and splits
    #[arg(long, global = true)]
    processed_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report store sizes, label distribution and schema problems
    Inspect {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Consolidate every class store into complete_dataset.csv
    Assemble,

    /// Assemble, split, fit normalization and write the splits
    Prepare {
        /// Split seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score a trained classifier on the prepared test split
    Evaluate {
        /// Classifier artifact
        #[arg(long, default_value = "models/classifier.json")]
        model: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(paths: &PathArgs) -> Result<DatasetConfig> {
    let mut config = match &paths.config {
        Some(path) => DatasetConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DatasetConfig::default(),
    };
    if let Some(dir) = &paths.raw_dir {
        config.raw_dir = dir.clone();
    }
    if let Some(dir) = &paths.processed_dir {
        config.processed_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.paths)?;

    match cli.command {
        Commands::Inspect { json } => {
            let report = inspect(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
            if !report.is_healthy() {
                bail!("invalid stores: {:?}", report.invalid_stores());
            }
        }
        Commands::Assemble => {
            let store = ClassStore::new(&config.raw_dir, config.duplicate_policy);
            let assembler = DatasetAssembler::new(store, &config.processed_dir);
            let report = assembler.assemble().context("assembling dataset")?;
            info!(
                "Consolidated {} samples into {}",
                report.dataset.len(),
                assembler.output_path().display()
            );
            for (label, error) in &report.rejected {
                warn!("Rejected {label}: {error}");
            }
        }
        Commands::Prepare { seed } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let prepared = DatasetPreparer::new(&config)?
                .prepare()
                .context("preparing dataset")?;
            println!("{}", serde_json::to_string_pretty(&prepared.report)?);
        }
        Commands::Evaluate { model, json } => {
            let classifier = DenseClassifier::load(&model)
                .with_context(|| format!("loading classifier {}", model.display()))?;
            let report = evaluate_prepared(&classifier, &config.processed_dir)
                .context("evaluating classifier")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
            info!(
                "Wrote {}",
                config.processed_dir.join(EVALUATION_FILE).display()
            );
        }
    }

    Ok(())
}
