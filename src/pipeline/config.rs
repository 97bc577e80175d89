//! Configuration for the train/evaluate/export/upload pipeline.
//!
//! Holds the data location, the upload endpoint and the hyperparameters of
//! the two model stages, plus the checks run before any expensive work.

use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The upload URL does not parse or lacks a scheme or host.
    #[error("Invalid upload URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The upload host has no DNS record.
    #[error("Cannot resolve upload host {host}:{port}")]
    Unresolvable { host: String, port: u16 },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Default random seed.
pub const DEFAULT_SEED: u64 = 1337;

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 300_000;

/// Default inverse regularization strength.
pub const DEFAULT_C: f64 = 2.0;

/// Default artifact path.
pub const DEFAULT_MODEL_OUT: &str = "skills_assessment.joblib";

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the review corpus, containing `train/` and `test/`.
    pub data_root: PathBuf,
    /// Endpoint receiving the artifact.
    pub upload_url: String,
    pub seed: u64,
    /// Maximum vocabulary size.
    pub max_features: usize,
    /// Inverse regularization strength.
    pub c: f64,
    /// Where the artifact is written.
    pub model_out: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("aclImdb"),
            upload_url: String::new(),
            seed: DEFAULT_SEED,
            max_features: DEFAULT_MAX_FEATURES,
            c: DEFAULT_C,
            model_out: PathBuf::from(DEFAULT_MODEL_OUT),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for `data_root` and `upload_url` with defaults.
    pub fn new(data_root: impl Into<PathBuf>, upload_url: impl Into<String>) -> Self {
        Self {
            data_root: data_root.into(),
            upload_url: upload_url.into(),
            ..Self::default()
        }
    }

    /// Validates the local configuration values.
    ///
    /// Does not touch the network; see [`validate_upload_url`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "data_root cannot be empty".to_string(),
            ));
        }

        if self.upload_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "upload_url cannot be empty".to_string(),
            ));
        }

        if self.max_features == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_features must be greater than 0".to_string(),
            ));
        }

        if !self.c.is_finite() || self.c <= 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "C must be a positive number, got {}",
                self.c
            )));
        }

        if self.model_out.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model_out cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the vocabulary cap.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    /// Builder method to set C.
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Builder method to set the artifact path.
    pub fn with_model_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_out = path.into();
        self
    }
}

/// Port used when the URL names none: 443 for https, 80 otherwise.
fn effective_port(url: &Url) -> u16 {
    url.port()
        .unwrap_or(if url.scheme() == "https" { 443 } else { 80 })
}

/// Parses `raw` and checks that its host resolves.
///
/// # Errors
///
/// `ConfigError::InvalidUrl` when the URL does not parse or has no host,
/// `ConfigError::Unresolvable` when DNS yields no address.
pub async fn validate_upload_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme().is_empty() {
        return Err(invalid("missing scheme"));
    }
    // IPv6 literals come back bracketed.
    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.trim_start_matches('[').trim_end_matches(']').to_string(),
        _ => return Err(invalid("missing host")),
    };
    let port = effective_port(&url);

    let unresolvable = || ConfigError::Unresolvable {
        host: host.clone(),
        port,
    };
    let mut addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|_| unresolvable())?;
    let addr = addrs.next().ok_or_else(unresolvable)?;

    tracing::debug!(host = %host, port, addr = %addr, "Upload host resolved");
    Ok(url)
}
