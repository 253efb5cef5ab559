//! CSV ingestion shim: one row per day, ISO dates, blank cells allowed.

use std::path::Path;

use agroclim_features::WeatherRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Raw CSV row; every cell except the date may be blank.
#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    #[serde(default)]
    temp_mean: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    rain_mm: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    wind_speed: Option<f64>,
    #[serde(default)]
    clouds: Option<f64>,
    #[serde(default)]
    pop: Option<f64>,
    #[serde(default)]
    uvi: Option<f64>,
    #[serde(default)]
    crop_type: Option<String>,
}

/// Read daily weather records from a headered CSV file.
///
/// Parse failures carry the row index and field so malformed input is
/// attributable.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<WeatherRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<RawRow>().enumerate() {
        let row = row.with_context(|| format!("row {index}: malformed record"))?;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .with_context(|| format!("row {index}: invalid date '{}'", row.date))?;
        records.push(WeatherRecord {
            date,
            temp_min: row.temp_min,
            temp_max: row.temp_max,
            temp_mean: row.temp_mean,
            humidity: row.humidity,
            rain_mm: row.rain_mm,
            pressure: row.pressure,
            wind_speed: row.wind_speed,
            clouds: row.clouds,
            pop: row.pop,
            uvi: row.uvi,
            crop_type: row.crop_type.filter(|c| !c.is_empty()),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_full_and_sparse_rows() {
        let file = write_csv(
            "date,temp_min,temp_max,temp_mean,humidity,rain_mm,pressure,wind_speed,clouds,pop,uvi,crop_type\n\
             2024-05-01,18,31,24.5,72,1.2,1012,3.4,55,0.4,6,maize\n\
             2024-05-02,,,,,,,,,,,\n",
        );
        let records = read_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].humidity, Some(72.0));
        assert_eq!(records[0].crop_type.as_deref(), Some("maize"));
        assert_eq!(records[1].temp_mean, None);
        assert_eq!(records[1].crop_type, None);
    }

    #[test]
    fn bad_date_reports_row_index() {
        let file = write_csv(
            "date,temp_min,temp_max,temp_mean,humidity,rain_mm,pressure,wind_speed,clouds,pop,uvi,crop_type\n\
             2024-05-01,,,,,,,,,,,\n\
             not-a-date,,,,,,,,,,,\n",
        );
        let err = read_records(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("row 1"));
    }
}
