//! Random-forest regressor built from variance-reduction trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::{bootstrap_indices, to_columns};
use crate::importance::{aggregate, FeatureImportance};
use crate::split::SplitCriterion;
use crate::tree::TreeParams;
use crate::value_tree::{grow_value_tree, ValueTree};
use crate::MaxFeatures;

/// Configuration for training a [`ForestRegressor`].
#[derive(Debug, Clone)]
pub struct ForestRegressorConfig {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    seed: u64,
}

impl ForestRegressorConfig {
    /// Create a configuration with `n_trees` trees and defaults otherwise:
    /// unlimited depth, `min_samples_split = 2`, `min_samples_leaf = 1`,
    /// all features considered at each split, seed 42.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] when `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            seed: 42,
        })
    }

    /// Limit trees to `max_depth` levels below the root.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxDepth`] when `max_depth` is zero.
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self, ForestError> {
        if max_depth == 0 {
            return Err(ForestError::InvalidMaxDepth);
        }
        self.max_depth = Some(max_depth);
        Ok(self)
    }

    /// Minimum samples a node needs before a split is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMinSamplesSplit`] when below 2.
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Result<Self, ForestError> {
        if min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit { min_samples_split });
        }
        self.min_samples_split = min_samples_split;
        Ok(self)
    }

    /// Minimum samples each child of a split must keep.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMinSamplesLeaf`] when zero.
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Result<Self, ForestError> {
        if min_samples_leaf == 0 {
            return Err(ForestError::InvalidMinSamplesLeaf);
        }
        self.min_samples_leaf = min_samples_leaf;
        Ok(self)
    }

    /// Number of candidate features examined at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Master seed for bootstrap sampling and feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of trees to train.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a forest on row-major `features` with one target per row.
    ///
    /// # Errors
    ///
    /// Returns a [`ForestError`] describing the first validation failure:
    /// empty or ragged data, non-finite values, or a target vector that
    /// does not match the sample count.
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<RegressorFit, ForestError> {
        if features.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_samples = features.len();
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        if targets.len() != n_samples {
            return Err(ForestError::TargetLengthMismatch {
                samples: n_samples,
                targets: targets.len(),
            });
        }
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(ForestError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }
        for (sample_index, &t) in targets.iter().enumerate() {
            if !t.is_finite() {
                return Err(ForestError::NonFiniteTarget { sample_index });
            }
        }

        let max_features = self.max_features.resolve(n_features)?;

        info!(
            n_samples,
            n_features, max_features, "training forest regressor"
        );

        let cols = to_columns(features, n_features);

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        let max_depth = self.max_depth;
        let min_samples_split = self.min_samples_split;
        let min_samples_leaf = self.min_samples_leaf;

        let trees: Vec<ValueTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap = bootstrap_indices(n_samples, &mut rng);

                let boot_cols: Vec<Vec<f64>> = cols
                    .iter()
                    .map(|col| bootstrap.iter().map(|&i| col[i]).collect())
                    .collect();
                let boot_targets: Vec<f64> = bootstrap.iter().map(|&i| targets[i]).collect();

                let params = TreeParams {
                    // Unused by variance-reduction trees.
                    criterion: SplitCriterion::Gini,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                    max_features,
                    seed: rng.r#gen(),
                };
                grow_value_tree(&boot_cols, &boot_targets, &params)
            })
            .collect();

        let per_tree: Vec<Vec<f64>> = trees.iter().map(ValueTree::feature_importances).collect();
        let importances = aggregate(&per_tree, feature_names);

        debug!(n_trees = trees.len(), "forest regressor training complete");

        Ok(RegressorFit {
            model: ForestRegressor {
                trees,
                n_features,
                feature_names: feature_names.to_vec(),
            },
            importances,
        })
    }
}

/// The output of [`ForestRegressorConfig::fit`]: the fitted ensemble plus
/// its aggregated feature importances.
#[derive(Debug, Clone)]
pub struct RegressorFit {
    /// The fitted ensemble.
    pub model: ForestRegressor,
    /// Variance-reduction importances, normalized and sorted by
    /// descending weight.
    pub importances: Vec<FeatureImportance>,
}

/// A fitted random-forest regressor. Predictions average the per-tree
/// leaf values.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForestRegressor {
    trees: Vec<ValueTree>,
    n_features: usize,
    feature_names: Vec<String>,
}

impl ForestRegressor {
    /// Predict the target value for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(sample)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict targets for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample
    /// has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature column names, in training order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
