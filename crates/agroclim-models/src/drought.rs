//! Binary drought detection with imbalance-corrected training.

use std::path::Path;

use agroclim_features::{
    BalancePolicy, DroughtRule, FeatureEngine, LabelSynthesizer, RiskTier, WeatherRecord,
};
use agroclim_forest::{
    ClassWeights, ConfusionMatrix, ForestClassifier, ForestClassifierConfig,
};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::bundle;
use crate::error::ModelError;
use crate::holdout;
use crate::report::TrainingReport;

const KIND: &str = "drought";
const MIN_ROWS: usize = 10;
const TEST_FRACTION: f64 = 0.2;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DroughtState {
    model: ForestClassifier,
    feature_names: Vec<String>,
    rule: DroughtRule,
}

/// Drought assessment for one day.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DroughtPrediction {
    /// Forecast date.
    pub date: NaiveDate,
    /// Whether the day is flagged as drought.
    pub is_drought: bool,
    /// Probability of the drought class, in [0, 1].
    pub probability: f64,
    /// Severity: high when flagged with probability > 0.8, medium when
    /// flagged otherwise, low when not flagged.
    pub level: RiskTier,
}

/// Binary drought classifier over the full derived feature set.
///
/// Starts untrained; [`train`](Self::train) or [`load`](Self::load)
/// transitions it to trained. Training targets are synthesized by the
/// drought heuristic, with balanced class weights passed explicitly to
/// the forest fit.
#[derive(Debug, Default)]
pub struct DroughtClassifier {
    rule: DroughtRule,
    seed: u64,
    trained: Option<DroughtState>,
}

impl DroughtClassifier {
    /// An untrained classifier with the default drought rule and seed 42.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rule: DroughtRule::default(),
            seed: 42,
            trained: None,
        }
    }

    /// Override the drought-flag rule used for label synthesis.
    #[must_use]
    pub fn with_rule(mut self, rule: DroughtRule) -> Self {
        self.rule = rule;
        self
    }

    /// Override the training seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// True once trained or loaded.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// The drought-flag rule retraining will use.
    #[must_use]
    pub fn rule(&self) -> DroughtRule {
        self.rule
    }

    /// Derive features from `records`, synthesize drought labels, and fit.
    ///
    /// A failed training leaves the classifier in its previous state.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InsufficientData`] with fewer than 10 usable
    /// rows after cleaning, or [`ModelError::Forest`] on a fit failure.
    #[instrument(skip_all, fields(n_records = records.len()))]
    pub fn train(&mut self, records: &[WeatherRecord]) -> Result<TrainingReport, ModelError> {
        let frame = FeatureEngine::derive(records)?;
        if frame.n_rows() < MIN_ROWS {
            return Err(ModelError::InsufficientData {
                rows: frame.n_rows(),
                required: MIN_ROWS,
            });
        }

        let mut labels: Vec<usize> = LabelSynthesizer::new(self.rule)
            .drought_flags(&frame)
            .into_iter()
            .map(usize::from)
            .collect();
        let adjustment = BalancePolicy.apply(&mut labels, 2);

        let feature_names = frame.names().to_vec();
        let rows = frame.rows();

        let split = holdout::split(rows.len(), TEST_FRACTION, self.seed);
        let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&i| rows[i].clone()).collect();
        let train_labels: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
        let test_rows: Vec<Vec<f64>> = split.test.iter().map(|&i| rows[i].clone()).collect();
        let test_labels: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

        let weights = ClassWeights::balanced(&train_labels, 2);
        let fit = ForestClassifierConfig::new(100)?
            .with_max_depth(10)?
            .with_min_samples_split(5)?
            .with_min_samples_leaf(2)?
            .with_seed(self.seed)
            .with_n_classes(2)
            .fit(&train_rows, &train_labels, &feature_names, &weights)?;

        let train_preds = fit.model.predict_batch(&train_rows)?;
        let train_accuracy = accuracy(&train_labels, &train_preds);
        let test_preds = fit.model.predict_batch(&test_rows)?;
        let confusion = ConfusionMatrix::from_labels(&test_labels, &test_preds, 2)?;

        let report = TrainingReport {
            train_accuracy,
            test_accuracy: confusion.accuracy(),
            class_metrics: confusion.class_metrics(),
            confusion,
            importances: fit.importances,
            adjusted_labels: adjustment.adjusted_labels,
            n_train: train_rows.len(),
            n_test: test_rows.len(),
        };

        info!(
            test_accuracy = report.test_accuracy,
            adjusted_labels = report.adjusted_labels,
            "drought classifier trained"
        );
        self.trained = Some(DroughtState {
            model: fit.model,
            feature_names,
            rule: self.rule,
        });
        Ok(report)
    }

    /// Predict drought risk per day.
    ///
    /// Features absent at prediction time are filled with 0.0 so the
    /// fit-time column list is always replayed exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotTrained`] before `train()`/`load()`.
    pub fn predict(&self, records: &[WeatherRecord]) -> Result<Vec<DroughtPrediction>, ModelError> {
        let state = self.trained.as_ref().ok_or(ModelError::NotTrained)?;
        let frame = FeatureEngine::derive(records)?;
        let rows = frame.select(&state.feature_names);
        let probs = state.model.predict_proba_batch(&rows)?;

        Ok(frame
            .dates()
            .iter()
            .zip(probs)
            .map(|(&date, p)| {
                let probability = p[1];
                let is_drought = probability > p[0];
                let level = if is_drought && probability > 0.8 {
                    RiskTier::High
                } else if is_drought {
                    RiskTier::Medium
                } else {
                    RiskTier::Low
                };
                DroughtPrediction {
                    date,
                    is_drought,
                    probability,
                    level,
                }
            })
            .collect())
    }

    /// Save the fitted state as a kind-tagged bundle file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotTrained`] when untrained, otherwise
    /// [`ModelError::SerializeBundle`] or [`ModelError::WriteBundle`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let state = self.trained.as_ref().ok_or(ModelError::NotTrained)?;
        bundle::save_path(KIND, state, path)
    }

    /// Reconstruct a trained classifier from a bundle file. The drought
    /// rule it was trained under is restored with it, so a retrain keeps
    /// the same labeling policy.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ReadBundle`], [`ModelError::DeserializeBundle`],
    /// [`ModelError::BundleKindMismatch`], or
    /// [`ModelError::IncompatibleBundleVersion`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let state: DroughtState = bundle::load_path(KIND, path)?;
        Ok(Self {
            rule: state.rule,
            seed: 42,
            trained: Some(state),
        })
    }
}

fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
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
