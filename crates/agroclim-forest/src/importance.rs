//! Feature-importance aggregation across the trees of an ensemble.

/// A named, normalized importance weight.
///
/// Weights across a fitted ensemble sum to 1.0 (all zeros when every tree
/// degenerated to a single leaf).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FeatureImportance {
    /// Feature column name.
    pub name: String,
    /// Normalized mean-decrease-in-impurity weight.
    pub weight: f64,
}

/// Sum per-tree importances, renormalize, and pair with column names,
/// sorted by descending weight.
pub(crate) fn aggregate(per_tree: &[Vec<f64>], names: &[String]) -> Vec<FeatureImportance> {
    let mut totals = vec![0.0f64; names.len()];
    for tree_imp in per_tree {
        for (i, &v) in tree_imp.iter().enumerate() {
            totals[i] += v;
        }
    }
    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut out: Vec<FeatureImportance> = names
        .iter()
        .zip(&totals)
        .map(|(name, &weight)| FeatureImportance {
            name: name.clone(),
            weight,
        })
        .collect();
    out.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    out
}
