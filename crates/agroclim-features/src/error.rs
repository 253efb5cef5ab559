/// Errors from feature-frame construction.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Returned when a derived column does not match the frame's row count.
    #[error("column '{name}' has {got} values, frame has {expected} rows")]
    ColumnLengthMismatch {
        /// Name of the offending column.
        name: String,
        /// The frame's row count.
        expected: usize,
        /// The column's value count.
        got: usize,
    },
}
