//! Evaluation metrics for binary predictions.

use serde::Serialize;
use std::fmt;

/// Fraction of predictions equal to the truth; 0 for empty input.
pub fn accuracy(truth: &[u8], predicted: &[u8]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class metrics with accuracy, macro and weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Indexed by class: 0 = negative, 1 = positive.
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// Decimal places used by `Display`.
    pub digits: usize,
}

impl ClassificationReport {
    pub fn new(truth: &[u8], predicted: &[u8]) -> Self {
        let classes = [0u8, 1u8].map(|class| {
            let tp = truth
                .iter()
                .zip(predicted)
                .filter(|&(&t, &p)| t == class && p == class)
                .count();
            let predicted_count = predicted.iter().filter(|&&p| p == class).count();
            let support = truth.iter().filter(|&&t| t == class).count();
            let precision = ratio(tp, predicted_count);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        });

        let total: usize = classes.iter().map(|m| m.support).sum();
        let average = |weight: &dyn Fn(&ClassMetrics) -> f64| {
            let sum_w: f64 = classes.iter().map(weight).sum();
            let avg = |field: fn(&ClassMetrics) -> f64| {
                if sum_w == 0.0 {
                    0.0
                } else {
                    classes.iter().map(|m| field(m) * weight(m)).sum::<f64>() / sum_w
                }
            };
            ClassMetrics {
                precision: avg(|m| m.precision),
                recall: avg(|m| m.recall),
                f1: avg(|m| m.f1),
                support: total,
            }
        };

        Self {
            classes,
            accuracy: accuracy(truth, predicted),
            macro_avg: average(&|_| 1.0),
            weighted_avg: average(&|m| m.support as f64),
            digits: 4,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.digits;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (class, m) in self.classes.iter().enumerate() {
            writeln!(
                f,
                "{:>12} {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
