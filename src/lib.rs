//! imdb-forge: IMDB review corpus materializer and sentiment classifier.
//!
//! This library provides the on-disk corpus tooling, the TF-IDF + logistic
//! regression model, and the export and upload of the fitted model.

pub mod cli;
pub mod corpus;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;

// Re-export commonly used error types
pub use corpus::SourceError;
pub use error::{CorpusError, ExportError, ModelError};
pub use pipeline::{ConfigError, RunError};
