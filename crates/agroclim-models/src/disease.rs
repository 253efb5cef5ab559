//! Three-tier crop-disease risk classification with per-sample
//! risk-factor explanations.

use std::path::Path;

use agroclim_features::{
    BalancePolicy, CategoryEncoder, FeatureEngine, FeatureFrame, LabelSynthesizer, RiskTier,
    WeatherRecord,
};
use agroclim_forest::{ClassWeights, ConfusionMatrix, ForestClassifier, ForestClassifierConfig};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::bundle;
use crate::error::ModelError;
use crate::holdout;
use crate::report::TrainingReport;

const KIND: &str = "disease";
const MIN_ROWS: usize = 10;
const TEST_FRACTION: f64 = 0.2;
/// Crop label substituted when a record carries none.
const DEFAULT_CROP: &str = "mixed";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DiseaseState {
    model: ForestClassifier,
    feature_names: Vec<String>,
    encoder: CategoryEncoder,
}

/// Qualitative factors active for one predicted sample.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskFactors {
    /// Humidity above 75%.
    pub high_humidity: bool,
    /// Mean temperature in the 15–30 °C disease-friendly band.
    pub optimal_temperature: bool,
    /// Temperature × humidity interaction, `t · h / 100`.
    pub temp_humidity_index: f64,
}

/// Disease-risk assessment for one day.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiseasePrediction {
    /// Forecast date.
    pub date: NaiveDate,
    /// Predicted risk tier.
    pub risk_level: RiskTier,
    /// Maximum class probability, used as confidence.
    pub confidence: f64,
    /// The qualitative factors behind the assessment.
    pub risk_factors: RiskFactors,
}

/// Three-class disease-risk classifier over the derived feature set plus
/// an encoded crop id.
///
/// Starts untrained. Owns its [`CategoryEncoder`] exclusively; the
/// append-only encoder travels inside the bundle, so crop ids recorded at
/// fit time keep their meaning after retrains and reloads.
#[derive(Debug, Default)]
pub struct DiseaseRiskClassifier {
    seed: u64,
    trained: Option<DiseaseState>,
}

impl DiseaseRiskClassifier {
    /// An untrained classifier with seed 42.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: 42,
            trained: None,
        }
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

    /// Derive features, synthesize tier labels, encode crops, and fit.
    ///
    /// Retraining reuses the existing encoder so previously assigned crop
    /// ids are preserved; new crops are appended. A failed training leaves
    /// the classifier in its previous state.
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

        let mut labels: Vec<usize> = LabelSynthesizer::default()
            .disease_tiers(&frame)
            .iter()
            .map(|tier| tier.index())
            .collect();
        let adjustment = BalancePolicy.apply(&mut labels, RiskTier::COUNT);

        let mut encoder = match &self.trained {
            Some(state) => state.encoder.clone(),
            None => CategoryEncoder::new(),
        };
        let rows = rows_with_crop_id(&frame, &mut encoder);
        let mut feature_names = frame.names().to_vec();
        feature_names.push("crop_id".to_string());

        let split = holdout::split(rows.len(), TEST_FRACTION, self.seed);
        let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&i| rows[i].clone()).collect();
        let train_labels: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
        let test_rows: Vec<Vec<f64>> = split.test.iter().map(|&i| rows[i].clone()).collect();
        let test_labels: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

        let weights = ClassWeights::uniform(RiskTier::COUNT);
        let fit = ForestClassifierConfig::new(100)?
            .with_max_depth(10)?
            .with_min_samples_split(5)?
            .with_min_samples_leaf(2)?
            .with_seed(self.seed)
            .with_n_classes(RiskTier::COUNT)
            .fit(&train_rows, &train_labels, &feature_names, &weights)?;

        let train_preds = fit.model.predict_batch(&train_rows)?;
        let correct = train_preds
            .iter()
            .zip(&train_labels)
            .filter(|(p, t)| p == t)
            .count();
        let train_accuracy = correct as f64 / train_labels.len() as f64;

        let test_preds = fit.model.predict_batch(&test_rows)?;
        let confusion = ConfusionMatrix::from_labels(&test_labels, &test_preds, RiskTier::COUNT)?;

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
            n_crops = encoder.n_categories(),
            adjusted_labels = report.adjusted_labels,
            "disease classifier trained"
        );
        self.trained = Some(DiseaseState {
            model: fit.model,
            feature_names,
            encoder,
        });
        Ok(report)
    }

    /// Predict disease risk per day.
    ///
    /// Unseen crop types encode to the unknown sentinel and never error.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotTrained`] before `train()`/`load()`.
    pub fn predict(&self, records: &[WeatherRecord]) -> Result<Vec<DiseasePrediction>, ModelError> {
        let state = self.trained.as_ref().ok_or(ModelError::NotTrained)?;
        let frame = FeatureEngine::derive(records)?;

        // Replay the fit-time column order, then overwrite the trailing
        // crop_id column that select() zero-filled.
        let mut rows = frame.select(&state.feature_names);
        for (row, crop) in rows.iter_mut().zip(frame.crops()) {
            let label = crop.as_deref().unwrap_or(DEFAULT_CROP);
            if let Some(last) = row.last_mut() {
                *last = state.encoder.encode(label) as f64;
            }
        }

        let probs = state.model.predict_proba_batch(&rows)?;
        let high_humidity = frame.column("high_humidity").unwrap_or_default();
        let optimal = frame.column("optimal_disease_temp").unwrap_or_default();
        let thi = frame.column("temp_humidity_index").unwrap_or_default();

        Ok(frame
            .dates()
            .iter()
            .enumerate()
            .zip(probs)
            .map(|((i, &date), p)| {
                let class = agroclim_forest::argmax(&p);
                DiseasePrediction {
                    date,
                    risk_level: RiskTier::from_index(class),
                    confidence: p[class],
                    risk_factors: RiskFactors {
                        high_humidity: high_humidity.get(i).copied() == Some(1.0),
                        optimal_temperature: optimal.get(i).copied() == Some(1.0),
                        temp_humidity_index: thi.get(i).copied().unwrap_or(0.0),
                    },
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

    /// Reconstruct a trained classifier from a bundle file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ReadBundle`], [`ModelError::DeserializeBundle`],
    /// [`ModelError::BundleKindMismatch`], or
    /// [`ModelError::IncompatibleBundleVersion`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let state: DiseaseState = bundle::load_path(KIND, path)?;
        Ok(Self {
            seed: 42,
            trained: Some(state),
        })
    }
}

/// Numeric rows with the encoded crop id appended, registering any crop
/// not yet known to the encoder.
fn rows_with_crop_id(frame: &FeatureFrame, encoder: &mut CategoryEncoder) -> Vec<Vec<f64>> {
    frame
        .rows()
        .iter()
        .zip(frame.crops())
        .map(|(row, crop)| {
            let label = crop.as_deref().unwrap_or(DEFAULT_CROP);
            let id = encoder.register(label);
            let mut row = row.clone();
            row.push(id as f64);
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day_offset: u64, humidity: f64, rain: f64, temp: f64, crop: Option<&str>) -> WeatherRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(day_offset);
        WeatherRecord {
            temp_min: Some(temp - 5.0),
            temp_max: Some(temp + 5.0),
            temp_mean: Some(temp),
            humidity: Some(humidity),
            rain_mm: Some(rain),
            crop_type: crop.map(str::to_string),
            ..WeatherRecord::empty(date)
        }
    }

    /// Mixed conditions spanning all three risk tiers.
    fn varied_records() -> Vec<WeatherRecord> {
        let mut records = Vec::new();
        for d in 0..15 {
            // Dry, cool, low humidity: low tier.
            records.push(record(d, 50.0, 0.0, 8.0, Some("wheat")));
        }
        for d in 15..30 {
            // Warm and humid: medium tier.
            records.push(record(d, 80.0, 0.0, 22.0, Some("maize")));
        }
        for d in 30..45 {
            // Hot, saturated, recent rain: high tier.
            records.push(record(d, 92.0, 10.0, 25.0, Some("rice")));
        }
        records
    }

    #[test]
    fn untrained_predict_fails() {
        let model = DiseaseRiskClassifier::new();
        assert!(matches!(
            model.predict(&varied_records()).unwrap_err(),
            ModelError::NotTrained
        ));
    }

    #[test]
    fn insufficient_data_rejected() {
        let mut model = DiseaseRiskClassifier::new();
        let err = model.train(&varied_records()[..9]).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { rows: 9, .. }));
        assert!(!model.is_trained());
    }

    #[test]
    fn train_reports_full_metrics() {
        let mut model = DiseaseRiskClassifier::new();
        let report = model.train(&varied_records()).unwrap();
        assert!((0.0..=1.0).contains(&report.train_accuracy));
        assert!((0.0..=1.0).contains(&report.test_accuracy));
        assert_eq!(report.confusion.n_classes(), 3);
        assert_eq!(report.class_metrics.len(), 3);
        let total: f64 = report.importances.iter().map(|f| f.weight).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn predictions_expose_risk_factors() {
        let mut model = DiseaseRiskClassifier::new();
        model.train(&varied_records()).unwrap();
        let preds = model.predict(&varied_records()).unwrap();
        assert_eq!(preds.len(), 45);

        // Hot humid block: factors should be active.
        let hot = &preds[40];
        assert!(hot.risk_factors.high_humidity);
        assert!(hot.risk_factors.optimal_temperature);
        assert!((hot.risk_factors.temp_humidity_index - 25.0 * 92.0 / 100.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&hot.confidence));
    }

    #[test]
    fn unseen_crop_never_errors() {
        let mut model = DiseaseRiskClassifier::new();
        model.train(&varied_records()).unwrap();
        let preds = model
            .predict(&[record(0, 85.0, 3.0, 24.0, Some("dragonfruit")), record(1, 85.0, 3.0, 24.0, None)])
            .unwrap();
        assert_eq!(preds.len(), 2);
    }

    #[test]
    fn retrain_preserves_crop_ids() {
        let mut model = DiseaseRiskClassifier::new();
        model.train(&varied_records()).unwrap();
        let wheat_id = model.trained.as_ref().unwrap().encoder.encode("wheat");

        // Retrain with a new crop mixed in.
        let mut records = varied_records();
        for r in records.iter_mut().take(10) {
            r.crop_type = Some("soy".to_string());
        }
        model.train(&records).unwrap();
        let enc = &model.trained.as_ref().unwrap().encoder;
        assert_eq!(enc.encode("wheat"), wheat_id);
        assert_ne!(enc.encode("soy"), 0);
    }

    #[test]
    fn bundle_round_trip_preserves_predictions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("disease.bin");

        let mut model = DiseaseRiskClassifier::new();
        model.train(&varied_records()).unwrap();
        model.save(&path).unwrap();
        let loaded = DiseaseRiskClassifier::load(&path).unwrap();

        let before = model.predict(&varied_records()).unwrap();
        let after = loaded.predict(&varied_records()).unwrap();
        for (x, y) in before.iter().zip(&after) {
            assert_eq!(x.risk_level, y.risk_level);
            assert!((x.confidence - y.confidence).abs() < 1e-9);
        }
    }

    #[test]
    fn wrong_kind_bundle_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("drought.bin");

        let mut drought = crate::DroughtClassifier::new();
        // Enough rows spanning both classes.
        let records = varied_records();
        drought.train(&records).unwrap();
        drought.save(&path).unwrap();

        let err = DiseaseRiskClassifier::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::BundleKindMismatch { .. }));
    }
}
