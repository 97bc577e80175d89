//! CLI command definitions for imdb-forge.
//!
//! Two independent tools share one binary: `materialize` builds the on-disk
//! review corpus and `train` fits, evaluates, exports and uploads the model.

use crate::corpus::{materialize, CorpusTargets, HfRowsConfig, HfRowsSource, SplitTargets, DEFAULT_DATASET};
use crate::pipeline::config::{DEFAULT_C, DEFAULT_MAX_FEATURES, DEFAULT_MODEL_OUT, DEFAULT_SEED};
use crate::pipeline::{run, PipelineConfig, RunEvent};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Default corpus directory.
const DEFAULT_BASE_DIR: &str = "aclImdb";

/// IMDB sentiment corpus builder and classifier trainer.
#[derive(Parser)]
#[command(name = "imdb-forge")]
#[command(about = "Materialize the IMDB review corpus and train a sentiment classifier")]
#[command(version)]
#[command(
    long_about = "imdb-forge materializes a per-class directory tree of IMDB reviews and trains a TF-IDF + logistic regression classifier on it.\n\nExample usage:\n  imdb-forge materialize --base aclImdb\n  imdb-forge train --data aclImdb --upload-url https://scoring.example.com/upload"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Top up `{base}/{split}/{label}/*.txt` from the streaming dataset.
    Materialize(MaterializeArgs),

    /// Train, evaluate, export and upload the sentiment model.
    Train(TrainArgs),
}

/// Arguments for `imdb-forge materialize`.
#[derive(Parser, Debug)]
pub struct MaterializeArgs {
    /// Corpus root directory.
    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    pub base: PathBuf,

    /// Target number of positive training reviews.
    #[arg(long, default_value_t = 6000)]
    pub train_pos: usize,

    /// Target number of negative training reviews.
    #[arg(long, default_value_t = 6000)]
    pub train_neg: usize,

    /// Target number of positive test reviews.
    #[arg(long, default_value_t = 2500)]
    pub test_pos: usize,

    /// Target number of negative test reviews.
    #[arg(long, default_value_t = 2500)]
    pub test_neg: usize,

    /// HuggingFace dataset id to stream from.
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// Rows per request (1 to 100).
    #[arg(
        long,
        default_value_t = 100,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=100)
    )]
    pub page_size: usize,

    /// Pause between page requests, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub page_delay_ms: u64,
}

impl MaterializeArgs {
    pub fn targets(&self) -> CorpusTargets {
        CorpusTargets {
            train: SplitTargets::new(self.train_pos, self.train_neg),
            test: SplitTargets::new(self.test_pos, self.test_neg),
        }
    }

    pub fn source_config(&self) -> HfRowsConfig {
        HfRowsConfig {
            dataset: self.dataset.clone(),
            page_size: self.page_size,
            page_delay_ms: self.page_delay_ms,
            ..HfRowsConfig::default()
        }
    }
}

/// Arguments for `imdb-forge train`.
#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Corpus root containing `train/` and `test/`.
    #[arg(long)]
    pub data: PathBuf,

    /// Endpoint receiving the model (can also use IMDB_FORGE_UPLOAD_URL env var).
    #[arg(long, env = "IMDB_FORGE_UPLOAD_URL")]
    pub upload_url: String,

    /// Seed for the solver's coordinate order.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum vocabulary size.
    #[arg(long, default_value_t = DEFAULT_MAX_FEATURES)]
    pub max_features: usize,

    /// Inverse regularization strength.
    #[arg(long = "C", default_value_t = DEFAULT_C)]
    pub c: f64,

    /// Where to write the model artifact.
    #[arg(long, default_value = DEFAULT_MODEL_OUT)]
    pub model_out: PathBuf,
}

impl From<TrainArgs> for PipelineConfig {
    fn from(args: TrainArgs) -> Self {
        PipelineConfig::new(args.data, args.upload_url)
            .with_seed(args.seed)
            .with_max_features(args.max_features)
            .with_c(args.c)
            .with_model_out(args.model_out)
    }
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Materialize(args) => run_materialize_command(args).await,
        Commands::Train(args) => run_train_command(args).await,
    }
}

async fn run_materialize_command(args: MaterializeArgs) -> anyhow::Result<()> {
    let source = HfRowsSource::with_config(args.source_config())?;
    info!(
        dataset = %source.dataset_name(),
        base = %args.base.display(),
        "Materializing corpus"
    );

    let reports = materialize(&args.base, args.targets(), &source).await?;
    for report in &reports {
        println!(
            "[{}] pos {} -> {} | neg {} -> {}",
            report.split.as_str(),
            report.before.pos,
            report.after.pos,
            report.before.neg,
            report.after.neg
        );
    }
    Ok(())
}

/// Console text for one stage of a train run.
fn describe_event(event: &RunEvent<'_>) -> String {
    match event {
        RunEvent::Loading { data_root } => format!("[*] Loading data from {}", data_root.display()),
        RunEvent::Training => "[*] Training model".to_string(),
        RunEvent::Evaluated { report } => {
            format!("[✓] Test Accuracy: {:.2}%\n{}", report.accuracy * 100.0, report)
        }
        RunEvent::Saved { path, .. } => format!("[✓] Model saved to {}", path.display()),
        RunEvent::Uploading { url } => format!("[*] Uploading to {}", url),
        RunEvent::Uploaded { response } => {
            format!("[*] HTTP {}\n{}", response.status.as_u16(), response.rendered_body())
        }
    }
}

async fn run_train_command(args: TrainArgs) -> anyhow::Result<()> {
    let summary = run(PipelineConfig::from(args), |event| {
        println!("{}", describe_event(&event))
    })
    .await?;
    info!(
        accuracy = summary.accuracy,
        artifact = %summary.artifact_path.display(),
        status = summary.upload_status,
        "Train run complete"
    );
    Ok(())
}
