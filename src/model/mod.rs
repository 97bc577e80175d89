//! The two-stage sentiment classifier.
//!
//! A [`SentimentPipeline`] chains a [`TfidfVectorizer`] and a
//! [`LogisticRegression`]. Fitting learns the vocabulary from the training
//! texts only, then trains the classifier on the resulting rows.

pub mod logistic;
pub mod metrics;
pub mod text;
pub mod tfidf;

pub use logistic::{ClassWeight, LogisticConfig, LogisticRegression};
pub use metrics::{accuracy, ClassMetrics, ClassificationReport};
pub use text::Analyzer;
pub use tfidf::{DocFrequency, SparseVector, TfidfConfig, TfidfVectorizer};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Hyperparameters of both stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub vectorizer: TfidfConfig,
    pub classifier: LogisticConfig,
}

impl PipelineParams {
    /// Defaults with the given vocabulary cap, regularization and seed.
    pub fn new(max_features: usize, c: f64, seed: u64) -> Self {
        Self {
            vectorizer: TfidfConfig {
                max_features: Some(max_features),
                ..TfidfConfig::default()
            },
            classifier: LogisticConfig {
                c,
                seed,
                ..LogisticConfig::default()
            },
        }
    }
}

/// A fitted vectorizer and classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPipeline {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LogisticRegression,
}

impl SentimentPipeline {
    /// Fits both stages on `texts` and `labels` (0 = negative, 1 = positive).
    pub fn fit<S: AsRef<str>>(
        texts: &[S],
        labels: &[u8],
        params: PipelineParams,
    ) -> Result<Self, ModelError> {
        if texts.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                texts: texts.len(),
                labels: labels.len(),
            });
        }
        let mut vectorizer = TfidfVectorizer::new(params.vectorizer);
        let rows = vectorizer.fit_transform(texts)?;
        let classifier =
            LogisticRegression::fit(&rows, labels, vectorizer.n_features(), params.classifier)?;
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn predict_one(&self, text: &str) -> u8 {
        self.classifier
            .predict(&self.vectorizer.transform_one(text))
    }

    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Vec<u8> {
        texts.iter().map(|t| self.predict_one(t.as_ref())).collect()
    }

    /// Accuracy and per-class report on a held-out set.
    pub fn evaluate<S: AsRef<str>>(&self, texts: &[S], labels: &[u8]) -> ClassificationReport {
        let predicted = self.predict(texts);
        ClassificationReport::new(labels, &predicted)
    }
}
