//! Rainfall amount regression.
//!
//! Unlike the drought and disease classifiers, this predictor is
//! self-initializing: constructing it synthesizes a seeded training set
//! and fits the forest immediately, so it is never observed untrained.

use std::path::Path;

use agroclim_features::{ResolvedBase, WeatherRecord};
use agroclim_forest::{ForestRegressor, ForestRegressorConfig};
use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::bundle;
use crate::error::ModelError;

const KIND: &str = "rainfall";
const N_SYNTHETIC: usize = 500;

/// The fixed, ordered feature set recorded at fit time.
const FEATURES: [&str; 8] = [
    "temp_day",
    "temp_min",
    "temp_max",
    "humidity",
    "pressure",
    "wind_speed",
    "clouds",
    "pop",
];

#[derive(serde::Serialize, serde::Deserialize)]
struct RainfallState {
    model: ForestRegressor,
    feature_names: Vec<String>,
}

/// Predicted rainfall for one day.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RainfallPrediction {
    /// Forecast date.
    pub date: NaiveDate,
    /// Predicted rainfall, mm, clipped to ≥ 0.
    pub rain_mm: f64,
}

/// Ensemble regression of daily rainfall in millimeters.
#[derive(Debug, Clone)]
pub struct RainfallRegressor {
    model: ForestRegressor,
    feature_names: Vec<String>,
}

impl RainfallRegressor {
    /// Build and fit the default predictor (synthesis seed 42).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] if the fit fails, which indicates an
    /// internal synthesis bug.
    pub fn new() -> Result<Self, ModelError> {
        Self::with_seed(42)
    }

    /// Build and fit the predictor from synthetic data under `seed`.
    ///
    /// Synthesis draws 500 samples with uniform base fields
    /// (`temp_day` 20–35, `temp_min` 15–25, `temp_max` 25–40, `humidity`
    /// 30–95, `pressure` 1000–1025, `wind_speed` 0–15, `clouds` 0–100,
    /// `pop` 0–100) and targets
    /// `rain = 10·h/100 + 8·clouds/100 + 12·pop/100 + noise`, noise
    /// uniform in [−2, 2], clipped to ≥ 0.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] if the fit fails.
    #[instrument]
    pub fn with_seed(seed: u64) -> Result<Self, ModelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut features = Vec::with_capacity(N_SYNTHETIC);
        let mut targets = Vec::with_capacity(N_SYNTHETIC);
        for _ in 0..N_SYNTHETIC {
            let row = vec![
                rng.gen_range(20.0..35.0),
                rng.gen_range(15.0..25.0),
                rng.gen_range(25.0..40.0),
                rng.gen_range(30.0..95.0),
                rng.gen_range(1000.0..1025.0),
                rng.gen_range(0.0..15.0),
                rng.gen_range(0.0..100.0),
                rng.gen_range(0.0..100.0),
            ];
            let humidity = row[3];
            let clouds = row[6];
            let pop = row[7];
            let noise: f64 = rng.gen_range(-2.0..2.0);
            let rain =
                (humidity / 100.0 * 10.0 + clouds / 100.0 * 8.0 + pop / 100.0 * 12.0 + noise)
                    .max(0.0);
            features.push(row);
            targets.push(rain);
        }

        let feature_names: Vec<String> = FEATURES.iter().map(|s| s.to_string()).collect();
        let fit = ForestRegressorConfig::new(50)?
            .with_max_depth(8)?
            .with_seed(seed)
            .fit(&features, &targets, &feature_names)?;

        info!(n_samples = N_SYNTHETIC, seed, "rainfall regressor self-initialized");
        Ok(Self {
            model: fit.model,
            feature_names,
        })
    }

    /// Predict rainfall for each record. Outputs are clipped to ≥ 0.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] on an internal feature-width
    /// mismatch.
    pub fn predict(&self, records: &[WeatherRecord]) -> Result<Vec<RainfallPrediction>, ModelError> {
        let rows: Vec<Vec<f64>> = records.iter().map(feature_row).collect();
        let raw = self.model.predict_batch(&rows)?;
        Ok(records
            .iter()
            .zip(raw)
            .map(|(record, rain)| RainfallPrediction {
                date: record.date,
                rain_mm: rain.max(0.0),
            })
            .collect())
    }

    /// The ordered feature names recorded at fit time.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Save the fitted state as a kind-tagged bundle file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SerializeBundle`] or [`ModelError::WriteBundle`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let state = RainfallState {
            model: self.model.clone(),
            feature_names: self.feature_names.clone(),
        };
        bundle::save_path(KIND, &state, path)
    }

    /// Reconstruct a fitted predictor from a bundle file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ReadBundle`], [`ModelError::DeserializeBundle`],
    /// [`ModelError::BundleKindMismatch`], or
    /// [`ModelError::IncompatibleBundleVersion`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let state: RainfallState = bundle::load_path(KIND, path)?;
        Ok(Self {
            model: state.model,
            feature_names: state.feature_names,
        })
    }
}

/// Build the fixed feature row from one record, with the documented
/// defaults for absent fields.
fn feature_row(record: &WeatherRecord) -> Vec<f64> {
    let b = ResolvedBase::from_record(record);
    vec![
        b.temp_mean,
        b.temp_min,
        b.temp_max,
        b.humidity,
        b.pressure,
        b.wind_speed,
        b.clouds,
        b.pop_pct,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(pop: f64, humidity: f64, clouds: f64) -> WeatherRecord {
        WeatherRecord {
            humidity: Some(humidity),
            clouds: Some(clouds),
            pop: Some(pop),
            ..WeatherRecord::empty(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        }
    }

    #[test]
    fn constructed_trained_and_nonnegative() {
        let model = RainfallRegressor::new().unwrap();
        let preds = model
            .predict(&[record(0.0, 30.0, 0.0), record(1.0, 95.0, 100.0)])
            .unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| p.rain_mm >= 0.0));
    }

    #[test]
    fn wet_conditions_predict_more_rain() {
        let model = RainfallRegressor::new().unwrap();
        let preds = model
            .predict(&[record(0.05, 35.0, 5.0), record(0.95, 90.0, 95.0)])
            .unwrap();
        assert!(
            preds[1].rain_mm > preds[0].rain_mm,
            "dry {} vs wet {}",
            preds[0].rain_mm,
            preds[1].rain_mm
        );
    }

    #[test]
    fn deterministic_across_instances() {
        let a = RainfallRegressor::new().unwrap();
        let b = RainfallRegressor::new().unwrap();
        let input = vec![record(0.4, 70.0, 50.0)];
        assert_eq!(
            a.predict(&input).unwrap()[0].rain_mm,
            b.predict(&input).unwrap()[0].rain_mm
        );
    }

    #[test]
    fn bundle_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rainfall.bin");
        let model = RainfallRegressor::new().unwrap();
        model.save(&path).unwrap();
        let loaded = RainfallRegressor::load(&path).unwrap();

        let input = vec![record(0.3, 65.0, 40.0), record(0.8, 88.0, 90.0)];
        let before = model.predict(&input).unwrap();
        let after = loaded.predict(&input).unwrap();
        for (x, y) in before.iter().zip(&after) {
            assert!((x.rain_mm - y.rain_mm).abs() < 1e-9);
        }
    }
}
