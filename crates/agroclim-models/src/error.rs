use std::path::PathBuf;

/// Errors from training, prediction, and bundle persistence.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when predict() is called on an untrained predictor.
    #[error("predictor is not trained; call train() or load a bundle first")]
    NotTrained,

    /// Returned when the training set is too small after cleaning.
    #[error("training set has {rows} usable rows, at least {required} required")]
    InsufficientData {
        /// Usable rows after feature derivation and cleaning.
        rows: usize,
        /// The minimum row count.
        required: usize,
    },

    /// Returned when bincode encoding of a bundle failed.
    #[error("failed to serialize model bundle")]
    SerializeBundle {
        /// The underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when bincode decoding of a bundle failed.
    #[error("failed to deserialize model bundle")]
    DeserializeBundle {
        /// The underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when a bundle was saved by a different predictor type.
    #[error("bundle kind mismatch: expected '{expected}', found '{found}'")]
    BundleKindMismatch {
        /// The kind this predictor expects.
        expected: String,
        /// The kind recorded in the bundle.
        found: String,
    },

    /// Returned when the bundle format version is unsupported.
    #[error("incompatible bundle format version: expected {expected}, found {found}")]
    IncompatibleBundleVersion {
        /// The supported format version.
        expected: u32,
        /// The version recorded in the bundle.
        found: u32,
    },

    /// Returned when writing a bundle file failed.
    #[error("failed to write bundle to {path}")]
    WriteBundle {
        /// The destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading a bundle file failed.
    #[error("failed to read bundle from {path}")]
    ReadBundle {
        /// The source path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An ensemble training or prediction error.
    #[error(transparent)]
    Forest(#[from] agroclim_forest::ForestError),

    /// A feature-frame construction error.
    #[error(transparent)]
    Feature(#[from] agroclim_features::FeatureError),
}
