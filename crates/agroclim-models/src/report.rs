use agroclim_forest::{ClassMetrics, ConfusionMatrix, FeatureImportance};

/// Evaluation metrics returned by a classifier's `train()`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainingReport {
    /// Accuracy on the training partition.
    pub train_accuracy: f64,
    /// Accuracy on the held-out partition.
    pub test_accuracy: f64,
    /// Per-class precision/recall/F1/support on the held-out partition.
    pub class_metrics: Vec<ClassMetrics>,
    /// Held-out confusion matrix.
    pub confusion: ConfusionMatrix,
    /// Normalized feature importances, descending.
    pub importances: Vec<FeatureImportance>,
    /// Rows whose synthesized label was reassigned for class balance.
    pub adjusted_labels: usize,
    /// Training partition size.
    pub n_train: usize,
    /// Held-out partition size.
    pub n_test: usize,
}
