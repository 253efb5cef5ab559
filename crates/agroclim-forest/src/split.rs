//! Split finding for weighted classification and regression trees.

use rand::Rng;

/// Criterion for measuring the quality of a classification split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²).
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i)).
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node from its per-class weight sums.
    ///
    /// `class_weights[c]` is the total sample weight of class `c` in the
    /// node; `total` is their sum. Returns 0.0 for an empty node.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_weights
                .iter()
                .filter(|&&w| w > 0.0)
                .map(|&w| {
                    let p = w / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Best split found for a classification node.
#[derive(Debug)]
pub(crate) struct ClassSplit {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease: `W·i(parent) - W_l·i(left) - W_r·i(right)`.
    pub(crate) decrease: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Best split found for a regression node.
#[derive(Debug)]
pub(crate) struct ValueSplit {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    /// SSE decrease: `sse(parent) - sse(left) - sse(right)`.
    pub(crate) decrease: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Shuffle the first `take` positions of `0..n_features` (partial
/// Fisher-Yates) and return the selected candidate columns.
fn candidate_features(n_features: usize, take: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_features).collect();
    let take = take.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order.truncate(take);
    order
}

/// Partition `indices` by the chosen feature and threshold.
fn partition(col: &[f64], indices: &[usize], threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let mut left = Vec::with_capacity(indices.len() / 2);
    let mut right = Vec::with_capacity(indices.len() / 2);
    for &si in indices {
        if col[si] <= threshold {
            left.push(si);
        } else {
            right.push(si);
        }
    }
    (left, right)
}

/// Find the best weighted classification split among a random feature subset.
///
/// `cols` is column-major: `cols[feature][sample]`. For each candidate
/// feature the `(value, sample)` pairs are sorted and scanned once with
/// incremental class-weight updates. Returns `None` when no boundary
/// satisfies `min_samples_leaf` or all candidate columns are constant.
#[allow(clippy::too_many_arguments)]
pub(crate) fn best_class_split(
    cols: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
    indices: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<ClassSplit> {
    let n = indices.len();
    if n < 2 || cols.is_empty() {
        return None;
    }

    let mut parent = vec![0.0f64; n_classes];
    for &si in indices {
        parent[labels[si]] += sample_weights[si];
    }
    let total: f64 = parent.iter().sum();
    let parent_impurity = criterion.impurity(&parent, total);

    let mut best: Option<(usize, f64, f64)> = None;

    for feat in candidate_features(cols.len(), max_features, rng) {
        let col = &cols[feat];
        let mut sorted: Vec<(f64, usize)> = indices.iter().map(|&si| (col[si], si)).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = vec![0.0f64; n_classes];
        let mut right = parent.clone();
        let mut left_total = 0.0;

        for i in 0..(n - 1) {
            let (val, si) = sorted[i];
            let w = sample_weights[si];
            left[labels[si]] += w;
            right[labels[si]] -= w;
            left_total += w;

            // No boundary between identical values.
            if val == sorted[i + 1].0 {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_total = total - left_total;
            let decrease = total * parent_impurity
                - left_total * criterion.impurity(&left, left_total)
                - right_total * criterion.impurity(&right, right_total);

            if best.is_none_or(|(_, _, d)| decrease > d) {
                let threshold = (val + sorted[i + 1].0) / 2.0;
                best = Some((feat, threshold, decrease));
            }
        }
    }

    let (feature, threshold, decrease) = best?;
    let (left, right) = partition(&cols[feature], indices, threshold);
    Some(ClassSplit {
        feature,
        threshold,
        decrease,
        left,
        right,
    })
}

/// Find the best SSE-reduction split among a random feature subset.
///
/// Uses incremental running sums of targets and squared targets so the
/// per-feature scan is O(n log n) in the sort.
pub(crate) fn best_value_split(
    cols: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<ValueSplit> {
    let n = indices.len();
    if n < 2 || cols.is_empty() {
        return None;
    }

    let sum: f64 = indices.iter().map(|&si| targets[si]).sum();
    let sum_sq: f64 = indices.iter().map(|&si| targets[si] * targets[si]).sum();
    let sse = |s: f64, sq: f64, count: usize| -> f64 {
        if count == 0 {
            0.0
        } else {
            sq - s * s / count as f64
        }
    };
    let parent_sse = sse(sum, sum_sq, n);

    let mut best: Option<(usize, f64, f64)> = None;

    for feat in candidate_features(cols.len(), max_features, rng) {
        let col = &cols[feat];
        let mut sorted: Vec<(f64, usize)> = indices.iter().map(|&si| (col[si], si)).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for i in 0..(n - 1) {
            let (val, si) = sorted[i];
            let t = targets[si];
            left_sum += t;
            left_sq += t * t;

            if val == sorted[i + 1].0 {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let decrease = parent_sse
                - sse(left_sum, left_sq, n_left)
                - sse(sum - left_sum, sum_sq - left_sq, n_right);

            if best.is_none_or(|(_, _, d)| decrease > d) {
                let threshold = (val + sorted[i + 1].0) / 2.0;
                best = Some((feat, threshold, decrease));
            }
        }
    }

    let (feature, threshold, decrease) = best?;
    let (left, right) = partition(&cols[feature], indices, threshold);
    Some(ValueSplit {
        feature,
        threshold,
        decrease,
        left,
        right,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitCriterion, best_class_split, best_value_split};

    #[test]
    fn gini_pure_node() {
        let imp = SplitCriterion::Gini.impurity(&[10.0, 0.0], 10.0);
        assert!(imp.abs() < f64::EPSILON);
    }

    #[test]
    fn gini_balanced_binary() {
        let imp = SplitCriterion::Gini.impurity(&[5.0, 5.0], 10.0);
        assert!((imp - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_balanced_binary() {
        let imp = SplitCriterion::Entropy.impurity(&[5.0, 5.0], 10.0);
        assert!((imp - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn weighted_impurity_shifts_with_class_weight() {
        // Upweighting class 1 moves the distribution away from 50/50.
        let imp = SplitCriterion::Gini.impurity(&[5.0, 15.0], 20.0);
        assert!(imp < 0.5);
    }

    #[test]
    fn separable_data_split_between_groups() {
        let cols = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let weights = vec![1.0; 6];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = best_class_split(
            &cols,
            &labels,
            &weights,
            &indices,
            2,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        )
        .expect("split must exist");
        assert_eq!(split.feature, 0);
        assert!(split.threshold > 3.0 && split.threshold < 10.0);
        assert_eq!(split.left.len(), 3);
        assert_eq!(split.right.len(), 3);
    }

    #[test]
    fn constant_column_no_split() {
        let cols = vec![vec![5.0; 4]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = best_class_split(
            &cols,
            &labels,
            &weights,
            &indices,
            2,
            SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        );
        assert!(split.is_none());
    }

    #[test]
    fn min_samples_leaf_blocks_split() {
        let cols = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let weights = vec![1.0; 2];
        let indices: Vec<usize> = (0..2).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = best_class_split(
            &cols,
            &labels,
            &weights,
            &indices,
            2,
            SplitCriterion::Gini,
            1,
            2,
            &mut rng,
        );
        assert!(split.is_none());
    }

    #[test]
    fn value_split_between_target_groups() {
        let cols = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let targets = vec![0.0, 0.1, 0.2, 5.0, 5.1, 5.2];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split =
            best_value_split(&cols, &targets, &indices, 1, 1, &mut rng).expect("split must exist");
        assert!(split.threshold > 3.0 && split.threshold < 10.0);
        assert!(split.decrease > 0.0);
    }

    #[test]
    fn value_split_constant_targets_still_splits_or_none() {
        // Constant targets: no decrease possible anywhere, best decrease 0.
        let cols = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let targets = vec![2.0; 4];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        if let Some(split) = best_value_split(&cols, &targets, &indices, 1, 1, &mut rng) {
            assert!(split.decrease.abs() < 1e-9);
        }
    }
}
