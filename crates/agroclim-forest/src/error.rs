/// Errors from ensemble training and prediction.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got 0")]
    InvalidMaxDepth,

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got 0")]
    InvalidMinSamplesLeaf,

    /// Returned when max_features resolves to 0 or exceeds the column count.
    #[error("max_features resolved to {resolved}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved candidate count.
        resolved: usize,
        /// The number of feature columns in the dataset.
        n_features: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample row has an unexpected number of columns.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected column count.
        expected: usize,
        /// The actual column count of the sample.
        got: usize,
        /// Zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a regression target is NaN or infinite.
    #[error("non-finite regression target at sample {sample_index}")]
    NonFiniteTarget {
        /// Zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a class label is outside the declared class range.
    #[error("label {label} at sample {sample_index} exceeds class count {n_classes}")]
    LabelOutOfRange {
        /// The offending label value.
        label: usize,
        /// The declared class count.
        n_classes: usize,
        /// Zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the class-weight table does not cover every class.
    #[error("class-weight table has {got} entries, expected {expected}")]
    ClassWeightMismatch {
        /// The expected entry count (one per class).
        expected: usize,
        /// The actual entry count.
        got: usize,
    },

    /// Returned when a prediction input has the wrong column count.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected column count.
        expected: usize,
        /// The actual column count of the input.
        got: usize,
    },

    /// Returned when the target vector does not match the sample count.
    #[error("got {targets} targets for {samples} samples")]
    TargetLengthMismatch {
        /// Number of samples in the feature matrix.
        samples: usize,
        /// Number of entries in the target vector.
        targets: usize,
    },

    /// Returned when true and predicted label vectors differ in length.
    #[error("label vectors differ in length: {truth} true vs {predicted} predicted")]
    LabelLengthMismatch {
        /// Length of the true-label vector.
        truth: usize,
        /// Length of the predicted-label vector.
        predicted: usize,
    },
}
