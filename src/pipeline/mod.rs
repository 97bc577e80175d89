//! Train/evaluate/export/upload pipeline.
//!
//! # Pipeline Flow
//!
//! 1. **Validate**: the upload URL parses and its host resolves
//! 2. **Load**: read `{data}/{train,test}/{neg,pos}/*.txt`
//! 3. **Fit**: TF-IDF vocabulary and logistic regression on the train split
//! 4. **Evaluate**: accuracy and per-class report on the test split
//! 5. **Export**: gzip-compressed artifact at `model_out`
//! 6. **Upload**: multipart POST of the artifact, server reply reported
//!
//! # Example
//!
//! ```rust,ignore
//! use imdb_forge::pipeline::{run, PipelineConfig};
//!
//! let config = PipelineConfig::new("aclImdb", "https://scoring.example.com/upload")
//!     .with_seed(1337)
//!     .with_max_features(300_000);
//! let summary = run(config, |event| tracing::debug!(?event, "stage")).await?;
//! println!("accuracy {:.4}", summary.accuracy);
//! ```

pub mod config;
pub mod runner;

pub use config::{validate_upload_url, ConfigError, PipelineConfig};
pub use runner::{fit_and_evaluate, run, RunError, RunEvent, RunSummary, TrainOutcome};
