use chrono::NaiveDate;
use tracing::debug;

use crate::error::FeatureError;

/// An ordered, named table of derived feature values.
///
/// Column names keep the order they were pushed in; that order is what a
/// model records at fit time and replays at prediction time. Rows carry
/// the source date and raw crop label alongside the numeric values.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FeatureFrame {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    dates: Vec<NaiveDate>,
    crops: Vec<Option<String>>,
}

impl FeatureFrame {
    /// An empty frame with one (still column-less) row per input record.
    #[must_use]
    pub fn new(dates: Vec<NaiveDate>, crops: Vec<Option<String>>) -> Self {
        let n = dates.len();
        Self {
            names: Vec::new(),
            rows: vec![Vec::new(); n],
            dates,
            crops,
        }
    }

    /// Append a named column.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::ColumnLengthMismatch`] when `values` does not
    /// have one entry per row.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), FeatureError> {
        if values.len() != self.rows.len() {
            return Err(FeatureError::ColumnLengthMismatch {
                name: name.to_string(),
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        self.names.push(name.to_string());
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        Ok(())
    }

    /// Values of a single column, or `None` if the name is unknown.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Row-major matrix in exactly the requested column order.
    ///
    /// Columns this frame does not have are filled with 0.0, so a model can
    /// always replay the column list it recorded at fit time.
    #[must_use]
    pub fn select(&self, names: &[String]) -> Vec<Vec<f64>> {
        let indices: Vec<Option<usize>> = names
            .iter()
            .map(|want| self.names.iter().position(|n| n == want))
            .collect();
        if indices.iter().any(Option::is_none) {
            let missing: Vec<&String> = names
                .iter()
                .zip(&indices)
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name)
                .collect();
            debug!(?missing, "absent columns filled with 0.0");
        }
        self.rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.map_or(0.0, |i| row[i]))
                    .collect()
            })
            .collect()
    }

    /// Drop every row containing a non-finite value. Returns the number of
    /// rows removed.
    pub fn retain_finite(&mut self) -> usize {
        let before = self.rows.len();
        let keep: Vec<bool> = self
            .rows
            .iter()
            .map(|row| row.iter().all(|v| v.is_finite()))
            .collect();
        let mut it = keep.iter();
        self.rows.retain(|_| *it.next().unwrap());
        let mut it = keep.iter();
        self.dates.retain(|_| *it.next().unwrap());
        let mut it = keep.iter();
        self.crops.retain(|_| *it.next().unwrap());
        let dropped = before - self.rows.len();
        if dropped > 0 {
            debug!(dropped, "dropped rows with non-finite derived values");
        }
        dropped
    }

    /// Column names in push order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Row-major feature values.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Per-row observation dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Per-row raw crop labels.
    #[must_use]
    pub fn crops(&self) -> &[Option<String>] {
        &self.crops
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// True when the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
