//! Agro-climatic risk predictors.
//!
//! Three supervised models over derived weather features: a rainfall
//! regressor (self-initializing on synthetic data), a binary drought
//! classifier with balanced class weights, and a 3-tier crop-disease
//! classifier with per-sample risk-factor explanations. Each trained
//! predictor serializes to a self-contained, versioned bundle.

mod bundle;
mod disease;
mod drought;
mod error;
mod holdout;
mod rainfall;
mod report;

pub use disease::{DiseasePrediction, DiseaseRiskClassifier, RiskFactors};
pub use drought::{DroughtClassifier, DroughtPrediction};
pub use error::ModelError;
pub use rainfall::{RainfallPrediction, RainfallRegressor};
pub use report::TrainingReport;
