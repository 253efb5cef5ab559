use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use agroclim_features::DroughtRule;
use agroclim_models::{
    DiseaseRiskClassifier, DroughtClassifier, RainfallRegressor, TrainingReport,
};

mod ingest;

#[derive(Parser)]
#[command(name = "agroclim")]
#[command(about = "Agro-climatic risk prediction: rainfall, drought, and crop-disease models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    Rainfall,
    Drought,
    Disease,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RuleArg {
    /// Flag drought when any heuristic condition holds
    Any,
    /// Flag drought only when at least two conditions hold
    AtLeastTwo,
}

impl From<RuleArg> for DroughtRule {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::Any => DroughtRule::AnyCondition,
            RuleArg::AtLeastTwo => DroughtRule::AtLeastTwo,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier on a daily weather CSV and save its bundle
    Train {
        /// Path to the input CSV file (one row per day)
        #[arg(long)]
        data: PathBuf,

        /// Which model to train (rainfall is self-initializing and needs no data)
        #[arg(long, value_enum)]
        model: ModelKind,

        /// Output path for the bundle file
        #[arg(long)]
        out: PathBuf,

        /// Drought-flag rule for label synthesis
        #[arg(long, value_enum, default_value = "any")]
        rule: RuleArg,
    },

    /// Predict from a trained bundle over a daily weather CSV
    Predict {
        /// Path to the input CSV file (one row per day)
        #[arg(long)]
        data: PathBuf,

        /// Which model to run
        #[arg(long, value_enum)]
        model: ModelKind,

        /// Bundle file; optional for rainfall, which self-initializes
        #[arg(long)]
        bundle: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct TrainOutput {
    model: &'static str,
    n_records: usize,
    bundle: PathBuf,
    report: TrainingReport,
}

#[derive(Serialize)]
struct PredictOutput<P: Serialize> {
    model: &'static str,
    n_predictions: usize,
    predictions: Vec<P>,
}

fn print_predictions<P: Serialize>(model: &'static str, predictions: Vec<P>) -> Result<()> {
    let output = PredictOutput {
        model,
        n_predictions: predictions.len(),
        predictions,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            model,
            out,
            rule,
        } => {
            let records = ingest::read_records(&data)?;
            info!(n_records = records.len(), "records loaded");

            let (name, report) = match model {
                ModelKind::Rainfall => {
                    // Self-initializing: synthesis, not the CSV, trains it.
                    let predictor = RainfallRegressor::with_seed(cli.seed)
                        .context("rainfall self-initialization failed")?;
                    predictor.save(&out).context("failed to save bundle")?;
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "model": "rainfall",
                            "bundle": out,
                            "note": "self-initialized from synthetic data",
                        }))?
                    );
                    return Ok(());
                }
                ModelKind::Drought => {
                    let mut predictor = DroughtClassifier::new()
                        .with_rule(rule.into())
                        .with_seed(cli.seed);
                    let report = predictor
                        .train(&records)
                        .context("drought training failed")?;
                    predictor.save(&out).context("failed to save bundle")?;
                    ("drought", report)
                }
                ModelKind::Disease => {
                    let mut predictor = DiseaseRiskClassifier::new().with_seed(cli.seed);
                    let report = predictor
                        .train(&records)
                        .context("disease training failed")?;
                    predictor.save(&out).context("failed to save bundle")?;
                    ("disease", report)
                }
            };

            let output = TrainOutput {
                model: name,
                n_records: records.len(),
                bundle: out,
                report,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            data,
            model,
            bundle,
        } => {
            let records = ingest::read_records(&data)?;
            info!(n_records = records.len(), "records loaded");

            match model {
                ModelKind::Rainfall => {
                    let predictor = match bundle {
                        Some(path) => {
                            RainfallRegressor::load(&path).context("failed to load bundle")?
                        }
                        None => RainfallRegressor::with_seed(cli.seed)
                            .context("rainfall self-initialization failed")?,
                    };
                    print_predictions("rainfall", predictor.predict(&records)?)?;
                }
                ModelKind::Drought => {
                    let path = bundle.context("--bundle is required for drought predictions")?;
                    let predictor =
                        DroughtClassifier::load(&path).context("failed to load bundle")?;
                    print_predictions("drought", predictor.predict(&records)?)?;
                }
                ModelKind::Disease => {
                    let path = bundle.context("--bundle is required for disease predictions")?;
                    let predictor =
                        DiseaseRiskClassifier::load(&path).context("failed to load bundle")?;
                    print_predictions("disease", predictor.predict(&records)?)?;
                }
            }
        }
    }

    Ok(())
}
