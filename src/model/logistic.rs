//! L2-regularized logistic regression trained by dual coordinate descent.
//!
//! Minimizes `0.5 * |w|^2 + sum_i C_i * log(1 + exp(-y_i * w.x_i))` where
//! `C_i = C * class_weight[y_i]`. The intercept is an extra constant feature
//! of value 1 and is regularized with the other weights. Each epoch visits
//! the examples in a fresh random order drawn from a seeded ChaCha8 stream,
//! which makes a fit a pure function of data, hyperparameters and seed.

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

use super::tfidf::SparseVector;

/// Inner Newton steps allowed per coordinate.
const MAX_INNER_ITER: usize = 100;

/// How classes are weighted in the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every example weighs 1.
    Uniform,
    /// `n_samples / (n_classes * count_c)`.
    Balanced,
}

/// Classifier hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    pub c: f64,
    pub class_weight: ClassWeight,
    /// Maximum number of epochs over the training set.
    pub max_iter: usize,
    /// Stop once the largest projected dual gradient falls below this.
    pub tol: f64,
    pub seed: u64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 2.0,
            class_weight: ClassWeight::Balanced,
            max_iter: 2000,
            tol: 1e-4,
            seed: 1337,
        }
    }
}

/// A fitted binary logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    /// Feature weights.
    weights: Array1<f64>,
    bias: f64,
    /// Weight of class 0 and class 1 in the loss.
    class_weights: [f64; 2],
    /// Epochs run by the solver.
    n_iter: usize,
}

/// Per-class weights for `labels`.
pub fn compute_class_weights(labels: &[u8], mode: ClassWeight) -> [f64; 2] {
    match mode {
        ClassWeight::Uniform => [1.0, 1.0],
        ClassWeight::Balanced => {
            let n = labels.len() as f64;
            let pos = labels.iter().filter(|&&l| l == 1).count() as f64;
            let neg = n - pos;
            [n / (2.0 * neg), n / (2.0 * pos)]
        }
    }
}

impl LogisticRegression {
    /// Fits a model on `rows` with labels in `{0, 1}`.
    pub fn fit(
        rows: &[SparseVector],
        labels: &[u8],
        n_features: usize,
        config: LogisticConfig,
    ) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                texts: rows.len(),
                labels: labels.len(),
            });
        }
        if !(config.c > 0.0) || !config.c.is_finite() {
            return Err(ModelError::InvalidParameter(format!(
                "C must be a positive number, got {}",
                config.c
            )));
        }
        if config.max_iter == 0 {
            return Err(ModelError::InvalidParameter(
                "max_iter must be greater than 0".to_string(),
            ));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
            return Err(ModelError::InvalidParameter(format!(
                "labels must be 0 or 1, got {}",
                bad
            )));
        }
        if labels.iter().all(|&l| l == labels[0]) {
            return Err(ModelError::SingleClass(labels[0]));
        }

        let class_weights = compute_class_weights(labels, config.class_weight);
        let l = rows.len();
        let y: Vec<f64> = labels.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();
        let upper: Vec<f64> = labels
            .iter()
            .map(|&l| config.c * class_weights[l as usize])
            .collect();
        // Row norms including the constant intercept feature.
        let xtx: Vec<f64> = rows.iter().map(|r| r.squared_norm() + 1.0).collect();

        // Weights plus the intercept in the last slot.
        let mut w = vec![0.0; n_features + 1];
        // alpha[2i] is the dual variable, alpha[2i + 1] its complement C_i - alpha.
        let mut alpha = vec![0.0; 2 * l];
        for i in 0..l {
            alpha[2 * i] = (0.001 * upper[i]).min(1e-8);
            alpha[2 * i + 1] = upper[i] - alpha[2 * i];
            axpy(&mut w, y[i] * alpha[2 * i], &rows[i], n_features);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut index: Vec<usize> = (0..l).collect();
        let inner_eps_min = config.tol.min(1e-8);
        let mut inner_eps = 1e-2;
        let mut iter = 0;

        while iter < config.max_iter {
            index.shuffle(&mut rng);
            let mut newton_iter = 0usize;
            let mut gmax: f64 = 0.0;

            for &i in &index {
                let c = upper[i];
                let yi = y[i];
                let a = xtx[i];
                let b = yi * dot(&w, &rows[i], n_features);

                let (mut ind1, mut ind2, mut sign) = (2 * i, 2 * i + 1, 1.0);
                if 0.5 * a * (alpha[ind2] - alpha[ind1]) + b < 0.0 {
                    ind1 = 2 * i + 1;
                    ind2 = 2 * i;
                    sign = -1.0;
                }

                let alpha_old = alpha[ind1];
                let mut z = alpha_old;
                if c - z < 0.5 * c {
                    z *= 0.1;
                }
                let mut gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                gmax = gmax.max(gp.abs());

                let mut inner_iter = 0;
                while inner_iter <= MAX_INNER_ITER {
                    if gp.abs() < inner_eps {
                        break;
                    }
                    let gpp = a + c / (c - z) / z;
                    let tmpz = z - gp / gpp;
                    if tmpz <= 0.0 {
                        z *= 0.1;
                    } else {
                        z = tmpz;
                    }
                    gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                    newton_iter += 1;
                    inner_iter += 1;
                }

                if inner_iter > 0 {
                    alpha[ind1] = z;
                    alpha[ind2] = c - z;
                    axpy(&mut w, sign * (z - alpha_old) * yi, &rows[i], n_features);
                }
            }

            iter += 1;
            if gmax < config.tol {
                break;
            }
            if newton_iter <= l / 10 {
                inner_eps = inner_eps_min.max(0.1 * inner_eps);
            }
        }

        if iter >= config.max_iter {
            tracing::warn!(
                max_iter = config.max_iter,
                "Solver reached max_iter before converging"
            );
        }
        tracing::debug!(epochs = iter, "Logistic regression fitted");

        let bias = w[n_features];
        w.truncate(n_features);
        Ok(Self {
            config,
            weights: Array1::from_vec(w),
            bias,
            class_weights,
            n_iter: iter,
        })
    }

    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Signed distance to the decision boundary; positive means class 1.
    pub fn decision_function(&self, row: &SparseVector) -> f64 {
        let weights = self.weights.as_slice().unwrap_or(&[]);
        row.entries
            .iter()
            .filter(|&&(i, _)| (i as usize) < weights.len())
            .map(|&(i, v)| v * weights[i as usize])
            .sum::<f64>()
            + self.bias
    }

    /// Probability of class 1.
    pub fn predict_proba(&self, row: &SparseVector) -> f64 {
        1.0 / (1.0 + (-self.decision_function(row)).exp())
    }

    pub fn predict(&self, row: &SparseVector) -> u8 {
        u8::from(self.decision_function(row) > 0.0)
    }
}

/// `w.x` where `x` carries an implicit trailing 1 for the intercept.
fn dot(w: &[f64], x: &SparseVector, n_features: usize) -> f64 {
    x.dot(w) + w[n_features]
}

/// `w += scale * x` where `x` carries an implicit trailing 1.
fn axpy(w: &mut [f64], scale: f64, x: &SparseVector, n_features: usize) {
    for &(i, v) in &x.entries {
        w[i as usize] += scale * v;
    }
    w[n_features] += scale;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(u32, f64)]) -> SparseVector {
        SparseVector {
            entries: entries.to_vec(),
        }
    }

    fn toy() -> (Vec<SparseVector>, Vec<u8>) {
        let rows = vec![
            row(&[(0, 1.0)]),
            row(&[(0, 0.8), (2, 0.6)]),
            row(&[(0, 0.6), (2, 0.8)]),
            row(&[(1, 1.0)]),
            row(&[(1, 0.8), (2, 0.6)]),
            row(&[(1, 0.6), (2, 0.8)]),
        ];
        (rows, vec![1, 1, 1, 0, 0, 0])
    }

    #[test]
    fn test_separable_data_is_learned() {
        let (rows, labels) = toy();
        let model = LogisticRegression::fit(&rows, &labels, 3, LogisticConfig::default()).unwrap();
        let predicted: Vec<u8> = rows.iter().map(|r| model.predict(r)).collect();
        assert_eq!(predicted, labels);
        assert!(model.weights()[0] > 0.0);
        assert!(model.weights()[1] < 0.0);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let (rows, labels) = toy();
        let a = LogisticRegression::fit(&rows, &labels, 3, LogisticConfig::default()).unwrap();
        let b = LogisticRegression::fit(&rows, &labels, 3, LogisticConfig::default()).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.bias(), b.bias());
    }

    #[test]
    fn test_balanced_class_weights() {
        let weights = compute_class_weights(&[0, 0, 0, 1], ClassWeight::Balanced);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);
        assert_eq!(compute_class_weights(&[0, 1], ClassWeight::Uniform), [1.0, 1.0]);
    }

    #[test]
    fn test_single_class_rejected() {
        let rows = vec![row(&[(0, 1.0)]), row(&[(0, 0.5)])];
        let err = LogisticRegression::fit(&rows, &[1, 1], 1, LogisticConfig::default());
        assert!(matches!(err, Err(ModelError::SingleClass(1))));
    }

    #[test]
    fn test_non_positive_c_rejected() {
        let (rows, labels) = toy();
        let config = LogisticConfig {
            c: 0.0,
            ..LogisticConfig::default()
        };
        assert!(matches!(
            LogisticRegression::fit(&rows, &labels, 3, config),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_probability_matches_decision() {
        let (rows, labels) = toy();
        let model = LogisticRegression::fit(&rows, &labels, 3, LogisticConfig::default()).unwrap();
        for r in &rows {
            let p = model.predict_proba(r);
            assert_eq!(p > 0.5, model.predict(r) == 1);
        }
    }
}
