//! Arena node types for classification and regression trees.
//!
//! Trees are stored as `Vec<_>` arenas with children referenced by index,
//! which keeps traversal cache-friendly and serialization trivial.

/// A node in a classification tree arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum ClassNode {
    /// An interior split node.
    Split {
        /// Feature column used for the split.
        feature: usize,
        /// Samples with `value <= threshold` go left.
        threshold: f64,
        /// Arena index of the left child.
        left: usize,
        /// Arena index of the right child.
        right: usize,
        /// Weighted impurity decrease achieved by this split (MDI).
        decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Weight-normalized class distribution, length `n_classes`.
        distribution: Vec<f64>,
    },
}

/// A node in a regression tree arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) enum ValueNode {
    /// An interior split node.
    Split {
        /// Feature column used for the split.
        feature: usize,
        /// Samples with `value <= threshold` go left.
        threshold: f64,
        /// Arena index of the left child.
        left: usize,
        /// Arena index of the right child.
        right: usize,
        /// Sum-of-squared-error decrease achieved by this split.
        decrease: f64,
    },
    /// A terminal leaf holding the mean target of its training samples.
    Leaf {
        /// Mean target value of the samples that reached this leaf.
        value: f64,
    },
}
