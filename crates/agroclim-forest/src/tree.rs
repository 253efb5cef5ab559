//! Weighted CART classification trees.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::node::ClassNode;
use crate::split::{SplitCriterion, best_class_split};

/// Growth parameters for one tree. Inputs are pre-validated by the forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
    pub(crate) seed: u64,
}

/// A fitted classification tree over an arena of [`ClassNode`]s.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct ClassTree {
    nodes: Vec<ClassNode>,
    n_features: usize,
    n_classes: usize,
}

/// Grow a classification tree on column-major features with per-sample
/// weights. The caller guarantees finite values, consistent widths, and
/// labels `< n_classes`.
pub(crate) fn grow_class_tree(
    cols: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
    n_classes: usize,
    params: &TreeParams,
) -> ClassTree {
    let n_samples = labels.len();
    let indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut arena = Vec::new();

    grow_node(
        cols,
        labels,
        sample_weights,
        &indices,
        n_classes,
        params,
        0,
        &mut rng,
        &mut arena,
    );

    ClassTree {
        nodes: arena,
        n_features: cols.len(),
        n_classes,
    }
}

/// Recursively grow one node, returning its arena index.
#[allow(clippy::too_many_arguments)]
fn grow_node(
    cols: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
    indices: &[usize],
    n_classes: usize,
    params: &TreeParams,
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<ClassNode>,
) -> usize {
    let mut class_weights = vec![0.0f64; n_classes];
    for &si in indices {
        class_weights[labels[si]] += sample_weights[si];
    }
    let total: f64 = class_weights.iter().sum();

    let make_leaf = |arena: &mut Vec<ClassNode>| -> usize {
        let distribution: Vec<f64> = if total > 0.0 {
            class_weights.iter().map(|&w| w / total).collect()
        } else {
            vec![0.0; n_classes]
        };
        let idx = arena.len();
        arena.push(ClassNode::Leaf { distribution });
        idx
    };

    let pure = class_weights.iter().filter(|&&w| w > 0.0).count() <= 1;
    let depth_exceeded = params.max_depth.is_some_and(|d| depth >= d);
    if pure || depth_exceeded || indices.len() < params.min_samples_split {
        return make_leaf(arena);
    }

    let split = match best_class_split(
        cols,
        labels,
        sample_weights,
        indices,
        n_classes,
        params.criterion,
        params.max_features,
        params.min_samples_leaf,
        rng,
    ) {
        Some(s) => s,
        None => return make_leaf(arena),
    };

    // Reserve the index before recursing so children land after it.
    let node_idx = arena.len();
    arena.push(ClassNode::Leaf {
        distribution: vec![0.0; n_classes],
    });

    let left = grow_node(
        cols,
        labels,
        sample_weights,
        &split.left,
        n_classes,
        params,
        depth + 1,
        rng,
        arena,
    );
    let right = grow_node(
        cols,
        labels,
        sample_weights,
        &split.right,
        n_classes,
        params,
        depth + 1,
        rng,
        arena,
    );

    arena[node_idx] = ClassNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        decrease: split.decrease,
    };
    node_idx
}

impl ClassTree {
    /// Leaf class distribution for one sample. The sample width is checked
    /// by the forest before dispatching to trees.
    pub(crate) fn predict_proba(&self, sample: &[f64]) -> &[f64] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                ClassNode::Leaf { distribution } => return distribution,
                ClassNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Per-feature impurity decreases, normalized to sum to 1.0 (all zeros
    /// for a single-leaf tree).
    pub(crate) fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let ClassNode::Split {
                feature, decrease, ..
            } = node
            {
                totals[*feature] += decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    pub(crate) fn n_classes(&self) -> usize {
        self.n_classes
    }
}
