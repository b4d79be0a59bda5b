//! Train, predict and evaluate binary classifiers from the command line
//!
//! Every subcommand prints its JSON payload to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use model_validation::{EvaluationHarness, EvaluationSettings};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Parser, Debug)]
#[command(name = "model-validation")]
#[command(about = "Validate binary classifiers by repeated resampling")]
#[command(version)]
struct Args {
    /// Model directory; falls back to MODEL_VALIDATION_DIR
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Seed for shuffling and splitting
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Store the learning curve and ROC series in the run directory
    #[arg(long, global = true)]
    log_into_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on a labelled samples file and persist the classifier
    Train { file: PathBuf },

    /// Predict an unlabelled samples file with the persisted classifier
    Predict { file: PathBuf },

    /// Evaluate the classifier family on a labelled samples file
    Evaluate {
        file: PathBuf,

        #[arg(long)]
        min_score: Option<f64>,

        #[arg(long)]
        accepted_deviation: Option<f64>,

        /// Number of random train/test splits
        #[arg(short = 'n', long)]
        runs: Option<usize>,

        /// Retrain on the whole file and persist the classifier afterwards
        #[arg(long)]
        store_model: bool,
    },
}

fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = config::Config::from_env()?;

    let directory = args
        .dir
        .or(config.directory.clone())
        .context("no model directory given, use --dir or MODEL_VALIDATION_DIR")?;

    let mut settings = EvaluationSettings {
        min_score: config.min_score,
        accepted_deviation: config.accepted_deviation,
        n_runs: config.test_runs,
        log_into_file: args.log_into_file || config.log_into_file,
        seed: args.seed,
        ..Default::default()
    };

    let payload = match args.command {
        Command::Train { file } => {
            let mut harness = EvaluationHarness::new(&directory, settings)?;
            serde_json::to_string(&harness.train_dataset(&file)?)?
        }
        Command::Predict { file } => {
            let mut harness = EvaluationHarness::new(&directory, settings)?;
            serde_json::to_string(&harness.predict_dataset(&file)?)?
        }
        Command::Evaluate {
            file,
            min_score,
            accepted_deviation,
            runs,
            store_model,
        } => {
            if let Some(min_score) = min_score {
                settings.min_score = min_score;
            }
            if let Some(accepted_deviation) = accepted_deviation {
                settings.accepted_deviation = accepted_deviation;
            }
            if let Some(runs) = runs {
                settings.n_runs = runs;
            }

            let mut harness = EvaluationHarness::new(&directory, settings)?;
            let report = harness
                .evaluate_dataset(&file)
                .with_context(|| format!("evaluating {}", file.display()))?;
            if store_model {
                let path = harness.store_model()?;
                tracing::info!("Classifier stored in {}", path.display());
            }
            serde_json::to_string(&report.verdict)?
        }
    };

    println!("{payload}");
    Ok(())
}
