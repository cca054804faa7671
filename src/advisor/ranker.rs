use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;

use super::{BandBreakdown, PolicyKind, RiskBand, RiskClassifier, TransferPlan};
use crate::domain::FeederId;

/// Summary of one partner's what-if transfer scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecommendation {
    pub partner: FeederId,
    pub policy: PolicyKind,
    pub risk_band: RiskBand,
    /// Highest primary + partner load before any transfer (A)
    pub peak_combined_load_a: f64,
    /// Highest single-feeder load after the transfer (A)
    pub peak_post_transfer_load_a: f64,
    pub total_transferred_a: f64,
    pub safe_hours_fraction: f64,
    pub breakdown: BandBreakdown,
    pub aligned_hours: usize,
}

impl PairRecommendation {
    /// Fold a transfer plan into a recommendation under the given policy.
    pub fn from_plan(plan: &TransferPlan, policy: PolicyKind, classifier: &RiskClassifier) -> Self {
        Self {
            partner: plan.partner.clone(),
            policy,
            risk_band: classifier.classify_plan(policy, plan),
            peak_combined_load_a: plan.peak_combined_load_a(),
            peak_post_transfer_load_a: plan.peak_post_transfer_load_a(),
            total_transferred_a: plan.total_transferred_a(),
            safe_hours_fraction: plan.safe_hours_fraction(),
            breakdown: classifier.breakdown(plan),
            aligned_hours: plan.steps.len(),
        }
    }
}

/// Orders recommendations from safest to riskiest.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationRanker;

impl RecommendationRanker {
    /// Sorts by the active policy's metric: lowest peak combined load first for
    /// threshold bands, highest safe-hours fraction first for safe hours.
    /// Ties fall back to peak post-transfer load, then partner name.
    pub fn rank<T: Borrow<PairRecommendation>>(&self, policy: PolicyKind, mut items: Vec<T>) -> Vec<T> {
        items.sort_by(|a, b| Self::compare(policy, a.borrow(), b.borrow()));
        items
    }

    fn compare(policy: PolicyKind, a: &PairRecommendation, b: &PairRecommendation) -> Ordering {
        let primary = match policy {
            PolicyKind::ThresholdBand => {
                OrderedFloat(a.peak_combined_load_a).cmp(&OrderedFloat(b.peak_combined_load_a))
            }
            PolicyKind::SafeHours => {
                OrderedFloat(b.safe_hours_fraction).cmp(&OrderedFloat(a.safe_hours_fraction))
            }
        };
        primary
            .then_with(|| {
                OrderedFloat(a.peak_post_transfer_load_a)
                    .cmp(&OrderedFloat(b.peak_post_transfer_load_a))
            })
            .then_with(|| a.partner.cmp(&b.partner))
    }
}
