//! TF-IDF feature extraction over word n-grams.
//!
//! Fitting learns a vocabulary and smoothed inverse document frequencies
//! from the training documents only; transforming maps any document to an
//! L2-normalized sparse vector over that vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::ModelError;

use super::text::Analyzer;

/// A sparse row: `(feature index, value)` pairs sorted by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub entries: Vec<(u32, f64)>,
}

impl SparseVector {
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|&(i, v)| v * dense[i as usize])
            .sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.entries.iter().map(|&(_, v)| v * v).sum()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Document-frequency bound: absolute count or proportion of documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocFrequency {
    Count(usize),
    Proportion(f64),
}

impl DocFrequency {
    fn as_count(&self, n_docs: usize) -> f64 {
        match *self {
            DocFrequency::Count(c) => c as f64,
            DocFrequency::Proportion(p) => p * n_docs as f64,
        }
    }
}

/// Vectorizer hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    pub analyzer: Analyzer,
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
    /// Keep only the most frequent terms across the corpus.
    pub max_features: Option<usize>,
    /// Replace term frequency `tf` with `1 + ln(tf)`.
    pub sublinear_tf: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            analyzer: Analyzer::default(),
            min_df: DocFrequency::Count(2),
            max_df: DocFrequency::Proportion(0.95),
            max_features: Some(300_000),
            sublinear_tf: true,
        }
    }
}

/// TF-IDF vectorizer with smoothed IDF and L2 row normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    /// Term to feature index, indices assigned in term order.
    vocabulary: BTreeMap<String, u32>,
    /// IDF weight per feature index.
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Creates an unfitted vectorizer.
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, u32> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.idf.is_empty()
    }

    fn term_counts(&self, doc: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for gram in self.config.analyzer.analyze(doc) {
            *counts.entry(gram).or_insert(0) += 1;
        }
        counts
    }

    /// Learns the vocabulary and IDF weights from `docs`.
    pub fn fit<S: AsRef<str>>(&mut self, docs: &[S]) -> Result<(), ModelError> {
        if docs.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if self.config.max_features == Some(0) {
            return Err(ModelError::InvalidParameter(
                "max_features must be greater than 0".to_string(),
            ));
        }

        let n_docs = docs.len();
        let mut df: HashMap<String, usize> = HashMap::new();
        let mut total_tf: HashMap<String, u64> = HashMap::new();
        for doc in docs {
            for (term, count) in self.term_counts(doc.as_ref()) {
                *total_tf.entry(term.clone()).or_insert(0) += u64::from(count);
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let low = self.config.min_df.as_count(n_docs);
        let high = self.config.max_df.as_count(n_docs);
        if high < low {
            return Err(ModelError::InvalidParameter(
                "max_df corresponds to fewer documents than min_df".to_string(),
            ));
        }

        let mut kept: Vec<(String, u64)> = total_tf
            .into_iter()
            .filter(|(term, _)| {
                let d = df[term] as f64;
                d >= low && d <= high
            })
            .collect();

        if let Some(limit) = self.config.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(limit);
        }
        if kept.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }

        let mut terms: Vec<String> = kept.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n = n_docs as f64;
        self.idf = terms
            .iter()
            .map(|t| ((1.0 + n) / (1.0 + df[t] as f64)).ln() + 1.0)
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t, i as u32))
            .collect();

        tracing::debug!(
            documents = n_docs,
            features = self.idf.len(),
            "Fitted TF-IDF vocabulary"
        );
        Ok(())
    }

    /// Maps one document to its normalized TF-IDF row.
    pub fn transform_one(&self, doc: &str) -> SparseVector {
        let mut entries: Vec<(u32, f64)> = self
            .term_counts(doc)
            .into_iter()
            .filter_map(|(term, count)| {
                let &index = self.vocabulary.get(&term)?;
                let tf = if self.config.sublinear_tf {
                    1.0 + f64::from(count).ln()
                } else {
                    f64::from(count)
                };
                Some((index, tf * self.idf[index as usize]))
            })
            .collect();
        entries.sort_by_key(|&(i, _)| i);

        let norm = entries.iter().map(|&(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut entries {
                *v /= norm;
            }
        }
        SparseVector { entries }
    }

    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<Vec<SparseVector>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        Ok(docs.iter().map(|d| self.transform_one(d.as_ref())).collect())
    }

    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        docs: &[S],
    ) -> Result<Vec<SparseVector>, ModelError> {
        self.fit(docs)?;
        self.transform(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<&'static str> {
        vec![
            "great movie great cast",
            "terrible movie awful plot",
            "great plot",
            "awful cast",
        ]
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let mut v = TfidfVectorizer::new(TfidfConfig {
            max_df: DocFrequency::Proportion(1.0),
            ..TfidfConfig::default()
        });
        v.fit(&docs()).unwrap();
        let terms: Vec<&str> = v.vocabulary().keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["awful", "cast", "great", "movie", "plot"]);
        assert_eq!(v.vocabulary()["awful"], 0);
    }

    #[test]
    fn test_max_df_prunes_ubiquitous_terms() {
        let mut v = TfidfVectorizer::new(TfidfConfig {
            min_df: DocFrequency::Count(1),
            max_df: DocFrequency::Proportion(0.95),
            ..TfidfConfig::default()
        });
        v.fit(&["film good", "film bad", "film fine"]).unwrap();
        assert!(!v.vocabulary().contains_key("film"));
        assert!(v.vocabulary().contains_key("good"));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut v = TfidfVectorizer::new(TfidfConfig {
            max_df: DocFrequency::Proportion(1.0),
            max_features: Some(2),
            ..TfidfConfig::default()
        });
        v.fit(&docs()).unwrap();
        // great: 3 occurrences; ties at 2 broken by term order -> awful.
        let terms: Vec<&str> = v.vocabulary().keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["awful", "great"]);
    }

    #[test]
    fn test_rows_are_unit_norm_with_smoothed_idf() {
        let mut v = TfidfVectorizer::new(TfidfConfig {
            max_df: DocFrequency::Proportion(1.0),
            ..TfidfConfig::default()
        });
        let rows = v.fit_transform(&docs()).unwrap();
        for row in &rows {
            assert!((row.squared_norm() - 1.0).abs() < 1e-12);
        }
        let great = v.vocabulary()["great"] as usize;
        let expected = (5.0f64 / 3.0).ln() + 1.0;
        assert!((v.idf()[great] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_terms_give_empty_row() {
        let mut v = TfidfVectorizer::new(TfidfConfig {
            max_df: DocFrequency::Proportion(1.0),
            ..TfidfConfig::default()
        });
        v.fit(&docs()).unwrap();
        assert_eq!(v.transform_one("zebra").nnz(), 0);
    }

    #[test]
    fn test_transform_requires_fit() {
        let v = TfidfVectorizer::new(TfidfConfig::default());
        assert!(matches!(v.transform(&["x"]), Err(ModelError::NotFitted)));
    }
}
