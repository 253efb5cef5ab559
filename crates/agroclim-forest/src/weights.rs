//! Explicit per-class sample weights for imbalance correction.

/// A weight table indexed by class label.
///
/// Passed explicitly to [`ForestClassifierConfig::fit`](crate::ForestClassifierConfig::fit);
/// each training sample contributes `weight(label)` to every impurity
/// computation and leaf distribution it participates in.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClassWeights(Vec<f64>);

impl ClassWeights {
    /// Equal weight 1.0 for every class.
    #[must_use]
    pub fn uniform(n_classes: usize) -> Self {
        Self(vec![1.0; n_classes])
    }

    /// Weights inversely proportional to class frequency:
    /// `n_samples / (n_classes * count(c))`, 0.0 for absent classes.
    #[must_use]
    pub fn balanced(labels: &[usize], n_classes: usize) -> Self {
        let mut counts = vec![0usize; n_classes];
        for &l in labels {
            if l < n_classes {
                counts[l] += 1;
            }
        }
        let n = labels.len() as f64;
        let k = n_classes as f64;
        let weights = counts
            .iter()
            .map(|&c| if c == 0 { 0.0 } else { n / (k * c as f64) })
            .collect();
        Self(weights)
    }

    /// An explicit weight table, one entry per class.
    #[must_use]
    pub fn from_weights(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    /// Weight for the given class label.
    #[must_use]
    pub fn weight(&self, class: usize) -> f64 {
        self.0.get(class).copied().unwrap_or(0.0)
    }

    /// Number of classes covered by the table.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.0.len()
    }

    /// The raw weight table.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}
