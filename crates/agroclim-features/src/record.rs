use chrono::NaiveDate;

/// One calendar day of weather observations.
///
/// Every meteorological field is optional; the feature engine substitutes
/// documented neutral defaults for absent values rather than erroring.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeatherRecord {
    /// Observation date.
    pub date: NaiveDate,
    /// Daily minimum temperature, °C.
    pub temp_min: Option<f64>,
    /// Daily maximum temperature, °C.
    pub temp_max: Option<f64>,
    /// Daily mean temperature, °C.
    pub temp_mean: Option<f64>,
    /// Relative humidity, 0–100.
    pub humidity: Option<f64>,
    /// Rainfall, mm (≥ 0).
    pub rain_mm: Option<f64>,
    /// Atmospheric pressure, hPa.
    pub pressure: Option<f64>,
    /// Wind speed, m/s.
    pub wind_speed: Option<f64>,
    /// Cloud cover, 0–100.
    pub clouds: Option<f64>,
    /// Probability of precipitation, 0–1.
    pub pop: Option<f64>,
    /// UV index.
    pub uvi: Option<f64>,
    /// Crop grown at the observed location.
    pub crop_type: Option<String>,
}

impl WeatherRecord {
    /// A record with only the date set; every field defaults at derivation.
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            temp_min: None,
            temp_max: None,
            temp_mean: None,
            humidity: None,
            rain_mm: None,
            pressure: None,
            wind_speed: None,
            clouds: None,
            pop: None,
            uvi: None,
            crop_type: None,
        }
    }
}
