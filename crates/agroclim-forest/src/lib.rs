//! Bagged decision-tree ensembles for the agro-climatic predictors.
//!
//! Provides a weighted-sample Random Forest classifier (CART trees,
//! Gini/Entropy criteria, explicit per-class weights for imbalance
//! correction) and a bagged regression forest (SSE-reduction splits,
//! mean-value leaves). Tree construction is parallelized via rayon and
//! fully reproducible from a single master seed.

mod confusion;
mod error;
mod forest;
mod importance;
mod node;
mod regressor;
mod split;
mod tree;
mod value_tree;
mod weights;

pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::ForestError;
pub use forest::{ClassifierFit, ForestClassifier, ForestClassifierConfig};
pub use importance::FeatureImportance;
pub use regressor::{ForestRegressor, ForestRegressorConfig, RegressorFit};
pub use split::SplitCriterion;
pub use weights::ClassWeights;

/// Strategy for the number of candidate features examined per split.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Ceiling of the square root of the feature count.
    Sqrt,
    /// Ceiling of log2 of the feature count (at least 1).
    Log2,
    /// A fraction of the feature count, in (0.0, 1.0].
    Fraction(f64),
    /// A fixed candidate count.
    Fixed(usize),
    /// Every feature (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete candidate count for `n_features` columns.
    pub(crate) fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Index of the largest value in a probability slice (first on ties).
#[must_use]
pub fn argmax(probs: &[f64]) -> usize {
    probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{MaxFeatures, argmax};

    #[test]
    fn max_features_sqrt() {
        assert_eq!(MaxFeatures::Sqrt.resolve(16).unwrap(), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 4);
    }

    #[test]
    fn max_features_all() {
        assert_eq!(MaxFeatures::All.resolve(7).unwrap(), 7);
    }

    #[test]
    fn max_features_fixed_out_of_range() {
        assert!(MaxFeatures::Fixed(9).resolve(4).is_err());
        assert!(MaxFeatures::Fixed(0).resolve(4).is_err());
    }

    #[test]
    fn argmax_first_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
    }
}
