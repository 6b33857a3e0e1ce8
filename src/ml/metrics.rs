//! Held-out evaluation metrics.
//!
//! Accuracy plus per-class precision, recall and F1 computed from predicted
//! and ground-truth class indices. Zero divisions yield 0.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-class metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged metrics over all classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Accuracy and per-class breakdown for one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub total_support: usize,
}

impl ClassificationReport {
    /// Compute the report; `labels[i]` names class index `i`
    pub fn compute(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(AppError::Training(format!(
                "{} ground-truth labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if let Some(&bad) = y_true.iter().chain(y_pred.iter()).find(|&&c| c >= labels.len()) {
            return Err(AppError::Training(format!(
                "class index {} has no label ({} labels known)",
                bad,
                labels.len()
            )));
        }

        let n_samples = y_true.len();
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = if n_samples > 0 {
            correct as f64 / n_samples as f64
        } else {
            0.0
        };

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(class_idx, label)| {
                let mut tp = 0usize;
                let mut fp = 0usize;
                let mut fn_count = 0usize;
                for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                    match (t == class_idx, p == class_idx) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_count += 1,
                        (false, false) => {}
                    }
                }

                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_count);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1_score,
                    support: tp + fn_count,
                }
            })
            .collect();

        let n_classes = classes.len().max(1) as f64;
        let macro_avg = AveragedMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n_classes,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            if n_samples == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / n_samples as f64
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
        };

        Ok(Self {
            accuracy,
            classes,
            macro_avg,
            weighted_avg,
            total_support: n_samples,
        })
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label, class.precision, class.recall, class.f1_score, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, self.total_support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Anxiety".to_string(), "Normal".to_string(), "Stress".to_string()]
    }

    #[test]
    fn test_perfect_predictions() {
        let y = vec![0, 1, 2, 1];
        let report = ClassificationReport::compute(&y, &y, &labels()).unwrap();
        assert!((report.accuracy - 1.0).abs() < 1e-9);
        for class in &report.classes {
            assert!((class.f1_score - 1.0).abs() < 1e-9);
        }
        assert_eq!(report.class("Normal").unwrap().support, 2);
    }

    #[test]
    fn test_mixed_predictions() {
        let y_true = vec![0, 0, 1, 1, 2];
        let y_pred = vec![0, 1, 1, 1, 0];
        let report = ClassificationReport::compute(&y_true, &y_pred, &labels()).unwrap();

        assert!((report.accuracy - 0.6).abs() < 1e-9);

        let anxiety = report.class("Anxiety").unwrap();
        assert!((anxiety.precision - 0.5).abs() < 1e-9);
        assert!((anxiety.recall - 0.5).abs() < 1e-9);

        let normal = report.class("Normal").unwrap();
        assert!((normal.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((normal.recall - 1.0).abs() < 1e-9);

        // Never predicted: zero division yields zero
        let stress = report.class("Stress").unwrap();
        assert_eq!(stress.precision, 0.0);
        assert_eq!(stress.f1_score, 0.0);
        assert_eq!(stress.support, 1);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(ClassificationReport::compute(&[0, 1], &[0], &labels()).is_err());
        assert!(ClassificationReport::compute(&[5], &[0], &labels()).is_err());
    }

    #[test]
    fn test_display_lists_every_class() {
        let report = ClassificationReport::compute(&[0, 1, 2], &[0, 1, 1], &labels()).unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("precision"));
        assert!(rendered.contains("Anxiety"));
        assert!(rendered.contains("Stress"));
        assert!(rendered.contains("weighted avg"));
    }
}
