//! Agro-meteorological feature derivation.
//!
//! Turns ordered daily [`WeatherRecord`]s into a [`FeatureFrame`] of derived
//! indices (evapotranspiration, water stress, humidex, rolling rain and
//! humidity aggregates, drought indicators, disease risk factors), and
//! provides the weak-supervision label heuristics and the categorical
//! crop-type encoder used by the risk models.

mod encoder;
mod engine;
mod error;
mod frame;
mod labels;
mod record;

pub use encoder::CategoryEncoder;
pub use engine::{FeatureEngine, ResolvedBase};
pub use error::FeatureError;
pub use frame::FeatureFrame;
pub use labels::{BalanceAdjustment, BalancePolicy, DroughtRule, LabelSynthesizer, RiskTier};
pub use record::WeatherRecord;
