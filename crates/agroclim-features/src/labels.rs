//! Weak-supervision label heuristics for training without ground truth.

use tracing::{info, warn};

use crate::frame::FeatureFrame;

/// Three-tier risk label with a fixed integer encoding.
///
/// The encoding is part of the persisted model contract and never drifts:
/// Low = 0, Medium = 1, High = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Stable class index.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
        }
    }

    /// Tier for a class index; out-of-range values clamp to `High`.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => RiskTier::Low,
            1 => RiskTier::Medium,
            _ => RiskTier::High,
        }
    }

    /// Lower-case tier name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }

    /// Number of tiers.
    pub const COUNT: usize = 3;
}

/// How many drought-heuristic conditions must hold for a row to be
/// flagged as drought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DroughtRule {
    /// Any single condition flags the row.
    AnyCondition,
    /// At least two conditions must hold.
    AtLeastTwo,
}

impl Default for DroughtRule {
    fn default() -> Self {
        DroughtRule::AnyCondition
    }
}

/// What was changed to keep a synthesized label vector trainable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BalanceAdjustment {
    /// Number of rows whose label was reassigned.
    pub adjusted_labels: usize,
    /// The class the reassigned rows were moved to.
    pub injected_class: usize,
}

/// Guarantees a label vector contains at least two classes before fitting.
///
/// When every row carries the same label, the leading ~10% of rows
/// (at least one) are deterministically reassigned to the missing class
/// and the adjustment is reported rather than hidden.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancePolicy;

impl BalancePolicy {
    /// Reassign leading rows if `labels` is single-class. `n_classes` is
    /// the full label space; the injected class is the smallest index not
    /// present.
    pub fn apply(self, labels: &mut [usize], n_classes: usize) -> BalanceAdjustment {
        let none = BalanceAdjustment {
            adjusted_labels: 0,
            injected_class: 0,
        };
        if labels.is_empty() {
            return none;
        }
        let first = labels[0];
        if labels.iter().any(|&l| l != first) {
            return none;
        }
        let injected = (0..n_classes).find(|&c| c != first).unwrap_or(first);
        if injected == first {
            return none;
        }
        let count = (labels.len() as f64 * 0.1).ceil() as usize;
        let count = count.max(1).min(labels.len());
        for label in labels.iter_mut().take(count) {
            *label = injected;
        }
        warn!(
            adjusted = count,
            injected_class = injected,
            "single-class label vector, reassigned leading rows"
        );
        BalanceAdjustment {
            adjusted_labels: count,
            injected_class: injected,
        }
    }
}

/// Produces heuristic training targets from derived feature columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelSynthesizer {
    rule: DroughtRule,
}

impl LabelSynthesizer {
    /// Synthesizer with the given drought rule.
    #[must_use]
    pub fn new(rule: DroughtRule) -> Self {
        Self { rule }
    }

    /// The configured drought rule.
    #[must_use]
    pub fn rule(&self) -> DroughtRule {
        self.rule
    }

    /// Disease tier per row from `combined_risk_factor`:
    /// ≥ 4 high, ≥ 2 medium, else low. Rows without the column are low.
    #[must_use]
    pub fn disease_tiers(&self, frame: &FeatureFrame) -> Vec<RiskTier> {
        let factors = frame.column("combined_risk_factor").unwrap_or_default();
        (0..frame.n_rows())
            .map(|i| {
                let factor = factors.get(i).copied().unwrap_or(0.0);
                if factor >= 4.0 {
                    RiskTier::High
                } else if factor >= 2.0 {
                    RiskTier::Medium
                } else {
                    RiskTier::Low
                }
            })
            .collect()
    }

    /// Drought flag per row from the indicator heuristics:
    /// `drought_indicator_7d < 0.5`, `drought_indicator_30d < 0.8`,
    /// `humidity_mean_14d < 40`, combined per the configured rule.
    /// A missing indicator column contributes no hits.
    #[must_use]
    pub fn drought_flags(&self, frame: &FeatureFrame) -> Vec<bool> {
        let ind7 = frame.column("drought_indicator_7d").unwrap_or_default();
        let ind30 = frame.column("drought_indicator_30d").unwrap_or_default();
        let hum14 = frame.column("humidity_mean_14d").unwrap_or_default();

        let below = |col: &[f64], i: usize, limit: f64| col.get(i).is_some_and(|&v| v < limit);
        let flags: Vec<bool> = (0..frame.n_rows())
            .map(|i| {
                let hits = usize::from(below(&ind7, i, 0.5))
                    + usize::from(below(&ind30, i, 0.8))
                    + usize::from(below(&hum14, i, 40.0));
                match self.rule {
                    DroughtRule::AnyCondition => hits >= 1,
                    DroughtRule::AtLeastTwo => hits >= 2,
                }
            })
            .collect();
        info!(
            rule = ?self.rule,
            flagged = flags.iter().filter(|&&f| f).count(),
            total = flags.len(),
            "synthesized drought flags"
        );
        flags
    }
}
