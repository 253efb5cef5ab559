//! Derivation of agro-meteorological indices from daily records.
//!
//! All formulas operate on one chronological, day-granular sequence.
//! Rolling windows use a minimum period of 1: the first `k-1` rows of a
//! `k`-day window aggregate over however many rows exist so far.

use tracing::{debug, instrument};

use crate::error::FeatureError;
use crate::frame::FeatureFrame;
use crate::record::WeatherRecord;

/// Rain-sum window lengths, days.
const RAIN_WINDOWS: [usize; 5] = [1, 3, 7, 14, 30];
/// Humidity-mean window lengths, days.
const HUMIDITY_WINDOWS: [usize; 3] = [7, 14, 30];

/// Base fields of one record with every absence resolved to its
/// documented default.
///
/// Resolution order: `temp_mean` = given, else `(min+max)/2`, else 25.0;
/// `amplitude` = `max - min` when both are present, else 10.0; a missing
/// `temp_max`/`temp_min` is reconstructed from the mean and amplitude.
/// `humidity` defaults to 60.0, `rain_mm` to 0.0, and the remaining
/// fields to 0.0 (neutral). `pop` is scaled from 0–1 to percent.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedBase {
    pub temp_mean: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub amplitude: f64,
    pub humidity: f64,
    pub rain_mm: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub clouds: f64,
    pub pop_pct: f64,
    pub uvi: f64,
}

impl ResolvedBase {
    /// Resolve one record's base fields.
    #[must_use]
    pub fn from_record(record: &WeatherRecord) -> Self {
        let temp_mean = record.temp_mean.unwrap_or(
            match (record.temp_min, record.temp_max) {
                (Some(lo), Some(hi)) => (lo + hi) / 2.0,
                _ => 25.0,
            },
        );
        let amplitude = match (record.temp_min, record.temp_max) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 10.0,
        };
        let temp_max = record.temp_max.unwrap_or(temp_mean + amplitude / 2.0);
        let temp_min = record.temp_min.unwrap_or(temp_mean - amplitude / 2.0);
        Self {
            temp_mean,
            temp_min,
            temp_max,
            amplitude,
            humidity: record.humidity.unwrap_or(60.0),
            rain_mm: record.rain_mm.unwrap_or(0.0),
            pressure: record.pressure.unwrap_or(0.0),
            wind_speed: record.wind_speed.unwrap_or(0.0),
            clouds: record.clouds.unwrap_or(0.0),
            pop_pct: record.pop.unwrap_or(0.0) * 100.0,
            uvi: record.uvi.unwrap_or(0.0),
        }
    }
}

/// Derives the full feature column set from raw daily records.
pub struct FeatureEngine;

impl FeatureEngine {
    /// Derive every feature column, in a fixed order, from a chronological
    /// sequence of records. An empty input yields an empty frame.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::ColumnLengthMismatch`] if a derived column
    /// cannot be appended, which indicates an internal length bug.
    #[instrument(skip_all, fields(n_records = records.len()))]
    pub fn derive(records: &[WeatherRecord]) -> Result<FeatureFrame, FeatureError> {
        let dates = records.iter().map(|r| r.date).collect();
        let crops = records.iter().map(|r| r.crop_type.clone()).collect();
        let mut frame = FeatureFrame::new(dates, crops);
        if records.is_empty() {
            return Ok(frame);
        }

        let base: Vec<ResolvedBase> = records.iter().map(ResolvedBase::from_record).collect();

        frame.push_column("temp_mean", base.iter().map(|b| b.temp_mean).collect())?;
        frame.push_column("temp_min", base.iter().map(|b| b.temp_min).collect())?;
        frame.push_column("temp_max", base.iter().map(|b| b.temp_max).collect())?;
        frame.push_column("amplitude", base.iter().map(|b| b.amplitude).collect())?;
        frame.push_column("humidity", base.iter().map(|b| b.humidity).collect())?;
        frame.push_column("rain_mm", base.iter().map(|b| b.rain_mm).collect())?;
        frame.push_column("pressure", base.iter().map(|b| b.pressure).collect())?;
        frame.push_column("wind_speed", base.iter().map(|b| b.wind_speed).collect())?;
        frame.push_column("clouds", base.iter().map(|b| b.clouds).collect())?;
        frame.push_column("pop", base.iter().map(|b| b.pop_pct).collect())?;
        frame.push_column("uvi", base.iter().map(|b| b.uvi).collect())?;

        let water_stress: Vec<f64> = base
            .iter()
            .map(|b| ((b.temp_max - 25.0) * (100.0 - b.humidity) / 100.0).max(0.0))
            .collect();
        frame.push_column("water_stress_index", water_stress)?;

        // Simplified Hargreaves reference evapotranspiration.
        let et0: Vec<f64> = base
            .iter()
            .map(|b| 0.0023 * (b.temp_mean + 17.8) * b.amplitude.max(0.0).sqrt())
            .collect();
        frame.push_column("et0_mm", et0.clone())?;

        let irrigation: Vec<f64> = base
            .iter()
            .zip(&et0)
            .map(|(b, &e)| (e - b.rain_mm).max(0.0))
            .collect();
        frame.push_column("irrigation_need_mm", irrigation)?;

        let rain: Vec<f64> = base.iter().map(|b| b.rain_mm).collect();
        for window in RAIN_WINDOWS {
            frame.push_column(&format!("rain_sum_{window}d"), rolling_sum(&rain, window))?;
        }

        let humidity: Vec<f64> = base.iter().map(|b| b.humidity).collect();
        for window in HUMIDITY_WINDOWS {
            frame.push_column(
                &format!("humidity_mean_{window}d"),
                rolling_mean(&humidity, window),
            )?;
        }

        let humidex: Vec<f64> = base
            .iter()
            .map(|b| humidex(b.temp_mean, b.humidity))
            .collect();
        frame.push_column("humidex", humidex)?;

        for window in [7usize, 30] {
            let rain_cum = frame
                .column(&format!("rain_sum_{window}d"))
                .unwrap_or_default();
            let indicator: Vec<f64> = rain_cum
                .iter()
                .zip(&et0)
                .map(|(&cum, &e)| cum / (e * window as f64 + 0.1))
                .collect();
            frame.push_column(&format!("drought_indicator_{window}d"), indicator)?;
        }

        let humidity_stress: Vec<f64> = base
            .iter()
            .map(|b| {
                if b.humidity > 85.0 {
                    2.0
                } else if b.humidity > 70.0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        frame.push_column("humidity_stress", humidity_stress.clone())?;

        let optimal_temp: Vec<f64> = base
            .iter()
            .map(|b| f64::from(u8::from((15.0..=30.0).contains(&b.temp_mean))))
            .collect();
        frame.push_column("optimal_disease_temp", optimal_temp.clone())?;

        let rain_3d = frame.column("rain_sum_3d").unwrap_or_default();
        let combined: Vec<f64> = humidity_stress
            .iter()
            .zip(&optimal_temp)
            .zip(&rain_3d)
            .map(|((&hs, &ot), &r3)| hs + ot + if r3 > 5.0 { 2.0 } else { 0.0 })
            .collect();
        frame.push_column("combined_risk_factor", combined)?;

        let high_humidity: Vec<f64> = base
            .iter()
            .map(|b| f64::from(u8::from(b.humidity > 75.0)))
            .collect();
        frame.push_column("high_humidity", high_humidity)?;

        let moderate_temp: Vec<f64> = base
            .iter()
            .map(|b| f64::from(u8::from(b.temp_mean > 10.0 && b.temp_mean < 35.0)))
            .collect();
        frame.push_column("moderate_disease_temp", moderate_temp)?;

        let thi: Vec<f64> = base
            .iter()
            .map(|b| b.temp_mean * b.humidity / 100.0)
            .collect();
        frame.push_column("temp_humidity_index", thi)?;

        let dropped = frame.retain_finite();
        debug!(
            n_rows = frame.n_rows(),
            n_columns = frame.names().len(),
            dropped,
            "derived feature frame"
        );
        Ok(frame)
    }
}

/// Heat-stress index combining temperature and humidity.
fn humidex(temp_mean: f64, humidity: f64) -> f64 {
    let vapor = 6.11 * (5417.753 * (1.0 / 273.16 - 1.0 / (temp_mean + 273.16))).exp();
    temp_mean + 0.5555 * (vapor * (humidity / 100.0 - 10.0))
}

/// Trailing sum over up to `window` values, minimum period 1.
fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i].iter().sum()
        })
        .collect()
}

/// Trailing mean over up to `window` values, minimum period 1.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32) -> WeatherRecord {
        WeatherRecord::empty(NaiveDate::from_ymd_opt(2024, 3, day).unwrap())
    }

    fn full_record(day: u32, t_min: f64, t_max: f64, humidity: f64, rain: f64) -> WeatherRecord {
        WeatherRecord {
            temp_min: Some(t_min),
            temp_max: Some(t_max),
            humidity: Some(humidity),
            rain_mm: Some(rain),
            ..record(day)
        }
    }

    #[test]
    fn empty_input_yields_empty_frame() {
        let frame = FeatureEngine::derive(&[]).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn amplitude_and_water_stress() {
        // temp_min=20, temp_max=34, humidity=85.
        let frame = FeatureEngine::derive(&[full_record(1, 20.0, 34.0, 85.0, 0.0)]).unwrap();
        assert_eq!(frame.column("amplitude").unwrap()[0], 14.0);
        let wsi = frame.column("water_stress_index").unwrap()[0];
        assert!((wsi - 1.35).abs() < 1e-12, "wsi = {wsi}");
    }

    #[test]
    fn hargreaves_et0() {
        // temp_mean=25, amplitude=9 -> 0.0023 * 42.8 * 3.
        let rec = WeatherRecord {
            temp_mean: Some(25.0),
            temp_min: Some(20.5),
            temp_max: Some(29.5),
            ..record(1)
        };
        let et0 = FeatureEngine::derive(&[rec]).unwrap().column("et0_mm").unwrap()[0];
        assert!((et0 - 0.29532).abs() < 1e-10, "et0 = {et0}");
    }

    #[test]
    fn disease_factors_high_tier_inputs() {
        // humidity=90, temp=20, 6mm of rain within the 3-day window.
        let records = vec![
            full_record(1, 18.0, 22.0, 90.0, 6.0),
            full_record(2, 18.0, 22.0, 90.0, 0.0),
        ];
        let frame = FeatureEngine::derive(&records).unwrap();
        assert_eq!(frame.column("humidity_stress").unwrap()[1], 2.0);
        assert_eq!(frame.column("optimal_disease_temp").unwrap()[1], 1.0);
        assert_eq!(frame.column("combined_risk_factor").unwrap()[1], 5.0);
    }

    #[test]
    fn rolling_windows_use_available_history() {
        let records: Vec<WeatherRecord> = (1..=5)
            .map(|d| full_record(d, 15.0, 25.0, 60.0, 2.0))
            .collect();
        let frame = FeatureEngine::derive(&records).unwrap();
        let sums = frame.column("rain_sum_3d").unwrap();
        assert_eq!(sums, vec![2.0, 4.0, 6.0, 6.0, 6.0]);
        let means = frame.column("humidity_mean_7d").unwrap();
        assert!(means.iter().all(|&m| (m - 60.0).abs() < 1e-12));
    }

    #[test]
    fn defaults_applied_for_missing_fields() {
        let frame = FeatureEngine::derive(&[record(1)]).unwrap();
        assert_eq!(frame.column("temp_mean").unwrap()[0], 25.0);
        assert_eq!(frame.column("amplitude").unwrap()[0], 10.0);
        assert_eq!(frame.column("humidity").unwrap()[0], 60.0);
        assert_eq!(frame.column("rain_mm").unwrap()[0], 0.0);
        assert_eq!(frame.column("temp_max").unwrap()[0], 30.0);
        assert_eq!(frame.column("temp_min").unwrap()[0], 20.0);
    }

    #[test]
    fn pop_column_scaled_to_percent() {
        let rec = WeatherRecord {
            pop: Some(0.4),
            ..record(1)
        };
        let frame = FeatureEngine::derive(&[rec]).unwrap();
        assert_eq!(frame.column("pop").unwrap()[0], 40.0);
    }

    #[test]
    fn drought_indicator_uses_window_scaled_et0() {
        let records: Vec<WeatherRecord> = (1..=10)
            .map(|d| full_record(d, 15.0, 25.0, 60.0, 1.0))
            .collect();
        let frame = FeatureEngine::derive(&records).unwrap();
        let et0 = frame.column("et0_mm").unwrap()[9];
        let rain7 = frame.column("rain_sum_7d").unwrap()[9];
        let expected = rain7 / (et0 * 7.0 + 0.1);
        let got = frame.column("drought_indicator_7d").unwrap()[9];
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn column_order_is_stable() {
        let frame = FeatureEngine::derive(&[record(1)]).unwrap();
        let names = frame.names();
        assert_eq!(names[0], "temp_mean");
        assert_eq!(names.last().unwrap(), "temp_humidity_index");
        let again = FeatureEngine::derive(&[record(1)]).unwrap();
        assert_eq!(names, again.names());
    }
}
