//! Error types for imdb-forge operations.
//!
//! Defines error types for the major subsystems:
//! - Corpus materialization and loading
//! - Model fitting and prediction
//! - Artifact export and upload
//!
//! Configuration errors live next to the configuration in
//! [`crate::pipeline::config`], and upstream stream errors next to the
//! streaming source in [`crate::corpus::types`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while materializing or loading the review corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Label directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Upstream stream failed: {0}")]
    Source(#[from] crate::corpus::SourceError),

    #[error("Failed to persist review file '{}': {reason}", path.display())]
    PersistFailed { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CorpusError {
    /// Whether this error reports a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        match self {
            CorpusError::MissingDirectory(_) => true,
            CorpusError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Errors that can occur while fitting or applying the sentiment model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No training documents")]
    EmptyTrainingSet,

    #[error("Training labels contain a single class ({0}); two are required")]
    SingleClass(u8),

    #[error("Text and label counts differ: {texts} texts, {labels} labels")]
    LengthMismatch { texts: usize, labels: usize },

    #[error("Empty vocabulary after pruning; try a lower min_df or more documents")]
    EmptyVocabulary,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("Model is not fitted")]
    NotFitted,

    #[error("Training task failed: {0}")]
    TaskFailed(String),
}

/// Errors that can occur during artifact export and upload.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Failed to upload '{file}': {reason}")]
    UploadFailed { file: String, reason: String },

    #[error("Upload rejected with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
