//! Sequential train/evaluate/export/upload run.
//!
//! Each stage consumes the previous stage's output; the first failure aborts
//! the rest. Fitting is CPU-bound and runs on the blocking pool. Progress is
//! handed to the caller as [`RunEvent`]s; presenting it is the caller's job.

use chrono::Utc;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::corpus::{load_corpus, Corpus};
use crate::error::{CorpusError, ExportError, ModelError};
use crate::export::{
    file_sha256, ArtifactMetadata, ModelArtifact, ModelUploader, UploadConfig, UploadResponse,
};
use crate::model::{ClassificationReport, PipelineParams, SentimentPipeline};

use super::config::{validate_upload_url, ConfigError, PipelineConfig};

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// A fitted pipeline and its held-out evaluation.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub pipeline: SentimentPipeline,
    pub report: ClassificationReport,
    pub train_size: usize,
    pub test_size: usize,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub accuracy: f64,
    pub artifact_path: PathBuf,
    pub artifact_bytes: u64,
    pub artifact_sha256: String,
    pub upload_status: u16,
}

/// A stage of [`run`] starting or finishing.
#[derive(Debug)]
pub enum RunEvent<'a> {
    Loading { data_root: &'a Path },
    Training,
    Evaluated { report: &'a ClassificationReport },
    Saved { path: &'a Path, bytes: u64, sha256: &'a str },
    Uploading { url: &'a Url },
    /// Sent for every reply, including the one that fails the run.
    Uploaded { response: &'a UploadResponse },
}

/// Fits on the train split and evaluates on the test split.
///
/// Vocabulary and IDF weights come from the training texts only.
pub async fn fit_and_evaluate(corpus: Corpus, config: &PipelineConfig) -> Result<TrainOutcome, RunError> {
    let params = PipelineParams::new(config.max_features, config.c, config.seed);
    let Corpus { train, test } = corpus;
    let train_size = train.len();
    let test_size = test.len();

    tracing::info!(
        train = train_size,
        max_features = config.max_features,
        c = config.c,
        "Fitting TF-IDF + logistic regression"
    );
    let started = Instant::now();
    let pipeline = tokio::task::spawn_blocking(move || {
        SentimentPipeline::fit(&train.texts, &train.labels, params)
    })
    .await
    .map_err(|e| ModelError::TaskFailed(e.to_string()))??;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        vocabulary = pipeline.vectorizer.n_features(),
        epochs = pipeline.classifier.n_iter(),
        "Pipeline fitted"
    );

    let report = pipeline.evaluate(&test.texts, &test.labels);
    Ok(TrainOutcome {
        pipeline,
        report,
        train_size,
        test_size,
    })
}

/// Runs every stage in order: validate, seed, load, fit, evaluate, export, upload.
///
/// `on_event` sees each stage as it happens, so a rejected upload's reply
/// reaches it before the error is returned.
pub async fn run(
    config: PipelineConfig,
    mut on_event: impl FnMut(RunEvent<'_>),
) -> Result<RunSummary, RunError> {
    config.validate()?;
    let upload_url = validate_upload_url(&config.upload_url).await?;
    tracing::info!(url = %upload_url, "Upload endpoint validated");

    tracing::info!(seed = config.seed, "Seeding solver");

    on_event(RunEvent::Loading {
        data_root: &config.data_root,
    });
    let corpus = load_corpus(&config.data_root)?;
    tracing::info!(
        train = corpus.train.len(),
        test = corpus.test.len(),
        "Corpus loaded"
    );

    on_event(RunEvent::Training);
    let outcome = fit_and_evaluate(corpus, &config).await?;
    let accuracy = outcome.report.accuracy;
    tracing::info!(accuracy, "Evaluated on test split");
    on_event(RunEvent::Evaluated {
        report: &outcome.report,
    });

    let metadata = ArtifactMetadata {
        trained_at: Utc::now(),
        seed: config.seed,
        train_size: outcome.train_size,
        test_size: outcome.test_size,
        test_accuracy: Some(accuracy),
    };
    let artifact = ModelArtifact::new(outcome.pipeline, metadata);
    let artifact_bytes = artifact.save(&config.model_out)?;
    let artifact_sha256 = file_sha256(&config.model_out)?;
    tracing::info!(
        path = %config.model_out.display(),
        bytes = artifact_bytes,
        sha256 = %artifact_sha256,
        "Artifact written"
    );
    on_event(RunEvent::Saved {
        path: &config.model_out,
        bytes: artifact_bytes,
        sha256: &artifact_sha256,
    });

    on_event(RunEvent::Uploading { url: &upload_url });
    let uploader = ModelUploader::new(UploadConfig::new(upload_url.clone()))?;
    let response = uploader.upload(&config.model_out).await?;
    on_event(RunEvent::Uploaded {
        response: &response,
    });
    response.error_for_status()?;

    Ok(RunSummary {
        accuracy,
        artifact_path: config.model_out,
        artifact_bytes,
        artifact_sha256,
        upload_status: response.status.as_u16(),
    })
}
