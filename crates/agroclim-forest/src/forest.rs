//! Random-forest classifier: bootstrap sampling, parallel tree training,
//! and probability-averaging prediction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::importance::{aggregate, FeatureImportance};
use crate::split::SplitCriterion;
use crate::tree::{grow_class_tree, ClassTree, TreeParams};
use crate::weights::ClassWeights;
use crate::MaxFeatures;

/// Configuration for training a [`ForestClassifier`].
#[derive(Debug, Clone)]
pub struct ForestClassifierConfig {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    criterion: SplitCriterion,
    seed: u64,
    n_classes: Option<usize>,
}

impl ForestClassifierConfig {
    /// Create a configuration with `n_trees` trees and defaults otherwise:
    /// unlimited depth, `min_samples_split = 2`, `min_samples_leaf = 1`,
    /// sqrt feature subsampling, Gini impurity, seed 42.
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
            max_features: MaxFeatures::Sqrt,
            criterion: SplitCriterion::Gini,
            seed: 42,
            n_classes: None,
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

    /// Split-quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Master seed for bootstrap sampling and feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fix the class count instead of inferring it from the labels.
    ///
    /// Use this when the label space is known up front and the training
    /// set may not contain every class.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = Some(n_classes);
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

    /// Train a forest on row-major `features` with one label per row.
    ///
    /// `class_weights` scales each sample by the weight of its class when
    /// counting impurity, so minority classes can be emphasized.
    ///
    /// # Errors
    ///
    /// Returns a [`ForestError`] describing the first validation failure:
    /// empty or ragged data, non-finite values, labels outside the class
    /// range, or a weight table that does not cover every class.
    #[instrument(skip_all, fields(n_trees = self.n_trees, n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        class_weights: &ClassWeights,
    ) -> Result<ClassifierFit, ForestError> {
        if features.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_samples = features.len();
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        if labels.len() != n_samples {
            return Err(ForestError::TargetLengthMismatch {
                samples: n_samples,
                targets: labels.len(),
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

        let inferred = labels.iter().max().copied().unwrap_or(0) + 1;
        let n_classes = self.n_classes.unwrap_or(inferred);
        for (sample_index, &label) in labels.iter().enumerate() {
            if label >= n_classes {
                return Err(ForestError::LabelOutOfRange {
                    label,
                    n_classes,
                    sample_index,
                });
            }
        }
        if class_weights.n_classes() != n_classes {
            return Err(ForestError::ClassWeightMismatch {
                expected: n_classes,
                got: class_weights.n_classes(),
            });
        }

        let max_features = self.max_features.resolve(n_features)?;

        info!(
            n_samples,
            n_features,
            n_classes,
            max_features,
            criterion = ?self.criterion,
            "training forest classifier"
        );

        // Column-major layout so split scans stride contiguously.
        let cols = to_columns(features, n_features);

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        let criterion = self.criterion;
        let max_depth = self.max_depth;
        let min_samples_split = self.min_samples_split;
        let min_samples_leaf = self.min_samples_leaf;

        let trees: Vec<ClassTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap = bootstrap_indices(n_samples, &mut rng);

                let boot_cols: Vec<Vec<f64>> = cols
                    .iter()
                    .map(|col| bootstrap.iter().map(|&i| col[i]).collect())
                    .collect();
                let boot_labels: Vec<usize> = bootstrap.iter().map(|&i| labels[i]).collect();
                let boot_weights: Vec<f64> = boot_labels
                    .iter()
                    .map(|&l| class_weights.weight(l))
                    .collect();

                let params = TreeParams {
                    criterion,
                    max_depth,
                    min_samples_split,
                    min_samples_leaf,
                    max_features,
                    seed: rng.r#gen(),
                };
                grow_class_tree(&boot_cols, &boot_labels, &boot_weights, n_classes, &params)
            })
            .collect();

        let per_tree: Vec<Vec<f64>> = trees.iter().map(ClassTree::feature_importances).collect();
        let importances = aggregate(&per_tree, feature_names);

        debug!(n_trees = trees.len(), "forest classifier training complete");

        Ok(ClassifierFit {
            model: ForestClassifier {
                trees,
                n_features,
                n_classes,
                feature_names: feature_names.to_vec(),
            },
            importances,
        })
    }
}

/// The output of [`ForestClassifierConfig::fit`]: the fitted ensemble plus
/// its aggregated feature importances.
#[derive(Debug, Clone)]
pub struct ClassifierFit {
    /// The fitted ensemble.
    pub model: ForestClassifier,
    /// Mean-decrease-in-impurity importances, normalized and sorted
    /// by descending weight.
    pub importances: Vec<FeatureImportance>,
}

/// A fitted random-forest classifier.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForestClassifier {
    trees: Vec<ClassTree>,
    n_features: usize,
    n_classes: usize,
    feature_names: Vec<String>,
}

impl ForestClassifier {
    /// Predict the class label for a single sample: argmax of the
    /// averaged leaf distributions.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        Ok(crate::argmax(&self.predict_proba(sample)?))
    }

    /// Average the leaf distributions of all trees for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in avg.iter_mut().zip(tree.predict_proba(sample)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(avg)
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample
    /// has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] if any sample
    /// has the wrong feature count.
    pub fn predict_proba_batch(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
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

/// Transpose row-major samples into column-major layout.
pub(crate) fn to_columns(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    let mut cols = vec![Vec::with_capacity(features.len()); n_features];
    for row in features {
        for (col, &v) in cols.iter_mut().zip(row) {
            col.push(v);
        }
    }
    cols
}

/// Draw `n_samples` indices with replacement.
pub(crate) fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(vec![i as f64 * 0.15, 0.5]);
            labels.push(0);
        }
        for i in 0..20 {
            features.push(vec![10.0 + i as f64 * 0.15, 0.5]);
            labels.push(1);
        }
        for i in 0..20 {
            features.push(vec![20.0 + i as f64 * 0.15, 0.5]);
            labels.push(2);
        }
        let names = vec!["x".to_string(), "y".to_string()];
        (features, labels, names)
    }

    #[test]
    fn three_class_separable_accuracy() {
        let (features, labels, names) = make_separable_data();
        let fit = ForestClassifierConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42)
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();

        let predictions = fit.model.predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        let accuracy = correct as f64 / labels.len() as f64;
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn importances_sum_to_one() {
        let (features, labels, names) = make_separable_data();
        let fit = ForestClassifierConfig::new(20)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();

        let total: f64 = fit.importances.iter().map(|f| f.weight).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_separable_data();
        let weights = ClassWeights::uniform(3);
        let fit_once = |_: ()| {
            ForestClassifierConfig::new(10)
                .unwrap()
                .with_seed(99)
                .fit(&features, &labels, &names, &weights)
                .unwrap()
        };
        let preds1 = fit_once(()).model.predict_batch(&features).unwrap();
        let preds2 = fit_once(()).model.predict_batch(&features).unwrap();
        assert_eq!(preds1, preds2);
    }

    #[test]
    fn proba_batch_matches_individual() {
        let (features, labels, names) = make_separable_data();
        let fit = ForestClassifierConfig::new(10)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();

        let batch = fit.model.predict_proba_batch(&features).unwrap();
        for (i, sample) in features.iter().enumerate() {
            let single = fit.model.predict_proba(sample).unwrap();
            assert_eq!(batch[i], single);
        }
    }

    #[test]
    fn fixed_class_count_preserved_without_minority_samples() {
        // Only class 0 present, but the label space is declared as 3.
        let features = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![0, 0, 0, 0];
        let names = vec!["x".to_string()];
        let fit = ForestClassifierConfig::new(5)
            .unwrap()
            .with_n_classes(3)
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();

        let probs = fit.model.predict_proba(&[1.5]).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn balanced_weights_lift_minority_class() {
        // 18:2 imbalance with overlapping x ranges near the boundary.
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..18 {
            features.push(vec![i as f64 * 0.3]);
            labels.push(0);
        }
        features.push(vec![5.0]);
        features.push(vec![5.2]);
        labels.push(1);
        labels.push(1);
        let names = vec!["x".to_string()];

        let balanced = ClassWeights::balanced(&labels, 2);
        let fit = ForestClassifierConfig::new(30)
            .unwrap()
            .with_seed(7)
            .fit(&features, &labels, &names, &balanced)
            .unwrap();

        // The minority region should still be recoverable.
        assert_eq!(fit.model.predict(&[5.1]).unwrap(), 1);
    }

    #[test]
    fn bincode_round_trip_preserves_predictions() {
        let (features, labels, names) = make_separable_data();
        let fit = ForestClassifierConfig::new(10)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();

        let bytes = bincode::serialize(&fit.model).unwrap();
        let restored: ForestClassifier = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.n_features(), fit.model.n_features());
        assert_eq!(restored.n_classes(), fit.model.n_classes());
        assert_eq!(restored.feature_names(), fit.model.feature_names());
        assert_eq!(
            restored.predict_proba_batch(&features).unwrap(),
            fit.model.predict_proba_batch(&features).unwrap()
        );
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(ForestClassifierConfig::new(0).is_err());
    }

    #[test]
    fn empty_dataset_error() {
        let err = ForestClassifierConfig::new(10)
            .unwrap()
            .fit(&[], &[], &[], &ClassWeights::uniform(2))
            .unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn label_out_of_range_error() {
        let features = vec![vec![0.0], vec![1.0]];
        let labels = vec![0, 5];
        let names = vec!["x".to_string()];
        let err = ForestClassifierConfig::new(5)
            .unwrap()
            .with_n_classes(2)
            .fit(&features, &labels, &names, &ClassWeights::uniform(2))
            .unwrap_err();
        assert!(matches!(err, ForestError::LabelOutOfRange { label: 5, .. }));
    }

    #[test]
    fn class_weight_table_must_cover_classes() {
        let features = vec![vec![0.0], vec![1.0]];
        let labels = vec![0, 1];
        let names = vec!["x".to_string()];
        let err = ForestClassifierConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::ClassWeightMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn prediction_feature_mismatch() {
        let (features, labels, names) = make_separable_data();
        let fit = ForestClassifierConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &names, &ClassWeights::uniform(3))
            .unwrap();
        assert!(matches!(
            fit.model.predict(&[1.0]).unwrap_err(),
            ForestError::PredictionFeatureMismatch {
                expected: 2,
                got: 1
            }
        ));
    }
}
