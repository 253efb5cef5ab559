//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::ForestError;

/// A multi-class confusion matrix stored as a flat row-major grid:
/// entry `(true_class, predicted_class)` counts how many samples with that
/// true label received that prediction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<usize>,
    n_classes: usize,
}

/// Per-class precision, recall, F1, and support.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// TP / (TP + FP); 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class has no true samples.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from parallel true/predicted label vectors.
    ///
    /// # Errors
    ///
    /// [`ForestError::EmptyDataset`] for zero labels,
    /// [`ForestError::LabelLengthMismatch`] when the vectors differ in length.
    pub fn from_labels(
        truth: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if truth.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if truth.len() != predicted.len() {
            return Err(ForestError::LabelLengthMismatch {
                truth: truth.len(),
                predicted: predicted.len(),
            });
        }
        let mut counts = vec![0usize; n_classes * n_classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            counts[t * n_classes + p] += 1;
        }
        Ok(Self { counts, n_classes })
    }

    fn entry(&self, t: usize, p: usize) -> usize {
        self.counts[t * self.n_classes + p]
    }

    /// Fraction of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|c| self.entry(c, c)).sum();
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Precision/recall/F1/support for every class.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.entry(c, c);
                let predicted: usize = (0..self.n_classes).map(|t| self.entry(t, c)).sum();
                let support: usize = (0..self.n_classes).map(|p| self.entry(c, p)).sum();
                let precision = if predicted == 0 {
                    0.0
                } else {
                    tp as f64 / predicted as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// The matrix as nested rows, `rows[true][predicted]`.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        (0..self.n_classes)
            .map(|t| (0..self.n_classes).map(|p| self.entry(t, p)).collect())
            .collect()
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for p in 0..self.n_classes {
            write!(f, " pred_{p:>3}")?;
        }
        writeln!(f)?;
        for t in 0..self.n_classes {
            write!(f, "true_{t:>3}")?;
            for p in 0..self.n_classes {
                write!(f, " {:>7}", self.entry(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let truth = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&truth, &truth, 3).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn cyclic_misclassification() {
        let truth = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted, 3).unwrap();
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics[0].support, 3);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn empty_labels_rejected() {
        let err = ConfusionMatrix::from_labels(&[], &[], 2).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = ConfusionMatrix::from_labels(&[0, 1], &[0], 2).unwrap_err();
        assert!(matches!(err, ForestError::LabelLengthMismatch { .. }));
    }

    #[test]
    fn rows_match_entries() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 1, 0, 1], 2).unwrap();
        assert_eq!(cm.to_rows(), vec![vec![1, 1], vec![1, 1]]);
    }

    #[test]
    fn absent_class_zero_metrics() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 0, 1, 1], 3).unwrap();
        let m = &cm.class_metrics()[2];
        assert_eq!(m.support, 0);
        assert!((m.recall - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_has_headers() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let text = format!("{cm}");
        assert!(text.contains("pred_"));
        assert!(text.contains("true_"));
    }
}
