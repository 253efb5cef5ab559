//! Regression trees with SSE-reduction splits and mean-value leaves.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::node::ValueNode;
use crate::split::best_value_split;
use crate::tree::TreeParams;

/// A fitted regression tree over an arena of [`ValueNode`]s.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct ValueTree {
    nodes: Vec<ValueNode>,
    n_features: usize,
}

/// Grow a regression tree on column-major features. The caller guarantees
/// finite values and consistent widths. The `criterion` field of `params`
/// is ignored (regression always minimizes SSE).
pub(crate) fn grow_value_tree(cols: &[Vec<f64>], targets: &[f64], params: &TreeParams) -> ValueTree {
    let indices: Vec<usize> = (0..targets.len()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut arena = Vec::new();

    grow_node(cols, targets, &indices, params, 0, &mut rng, &mut arena);

    ValueTree {
        nodes: arena,
        n_features: cols.len(),
    }
}

fn grow_node(
    cols: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    params: &TreeParams,
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<ValueNode>,
) -> usize {
    let n = indices.len();
    let mean = indices.iter().map(|&si| targets[si]).sum::<f64>() / n as f64;

    let make_leaf = |arena: &mut Vec<ValueNode>| -> usize {
        let idx = arena.len();
        arena.push(ValueNode::Leaf { value: mean });
        idx
    };

    let depth_exceeded = params.max_depth.is_some_and(|d| depth >= d);
    if depth_exceeded || n < params.min_samples_split {
        return make_leaf(arena);
    }

    let split = match best_value_split(
        cols,
        targets,
        indices,
        params.max_features,
        params.min_samples_leaf,
        rng,
    ) {
        // A zero-decrease split cannot improve the fit.
        Some(s) if s.decrease > 0.0 => s,
        _ => return make_leaf(arena),
    };

    let node_idx = arena.len();
    arena.push(ValueNode::Leaf { value: mean });

    let left = grow_node(cols, targets, &split.left, params, depth + 1, rng, arena);
    let right = grow_node(cols, targets, &split.right, params, depth + 1, rng, arena);

    arena[node_idx] = ValueNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        decrease: split.decrease,
    };
    node_idx
}

impl ValueTree {
    /// Mean-value prediction for one sample.
    pub(crate) fn predict(&self, sample: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                ValueNode::Leaf { value } => return *value,
                ValueNode::Split {
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

    /// Per-feature SSE decreases, normalized to sum to 1.0.
    pub(crate) fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let ValueNode::Split {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::SplitCriterion;

    fn params() -> TreeParams {
        TreeParams {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1,
            seed: 42,
        }
    }

    fn to_cols(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n_features = rows[0].len();
        (0..n_features)
            .map(|f| rows.iter().map(|r| r[f]).collect())
            .collect()
    }

    #[test]
    fn constant_targets_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![4.2, 4.2, 4.2];
        let tree = grow_value_tree(&to_cols(&rows), &targets, &params());
        assert_eq!(tree.nodes.len(), 1);
        assert!((tree.predict(&[9.0]) - 4.2).abs() < 1e-12);
    }

    #[test]
    fn step_function_recovered() {
        let rows = vec![
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ];
        let targets = vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];
        let tree = grow_value_tree(&to_cols(&rows), &targets, &params());
        assert!((tree.predict(&[2.0]) - 0.0).abs() < 1e-12);
        assert!((tree.predict(&[11.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn max_depth_limits_resolution() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let mut p = params();
        p.max_depth = Some(1);
        let tree = grow_value_tree(&to_cols(&rows), &targets, &p);
        assert!(tree.nodes.len() <= 3);
    }

    #[test]
    fn importances_normalized() {
        let rows = vec![
            vec![1.0, 7.0],
            vec![2.0, 7.0],
            vec![10.0, 7.0],
            vec![11.0, 7.0],
        ];
        let targets = vec![0.0, 0.0, 3.0, 3.0];
        let mut p = params();
        p.max_features = 2;
        let tree = grow_value_tree(&to_cols(&rows), &targets, &p);
        let imps = tree.feature_importances();
        let total: f64 = imps.iter().sum();
        assert!((total - 1.0).abs() < 1e-10);
        // The constant column cannot carry importance.
        assert!(imps[1].abs() < 1e-12);
    }
}
