use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use super::{AdvisoryRequest, AlignedPair, PairRecommendation, RiskBand, ThresholdBands, TransferPlan};
use crate::domain::{FeederId, ForecastSeries};

/// A ranked partner with the data behind its recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerAdvice {
    pub recommendation: PairRecommendation,
    pub plan: TransferPlan,
    pub aligned: AlignedPair,
}

impl Borrow<PairRecommendation> for PartnerAdvice {
    fn borrow(&self) -> &PairRecommendation {
        &self.recommendation
    }
}

/// A partner that produced no recommendation, and why.
///
/// Exclusion means "not evaluated", never "unsafe".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedPartner {
    pub partner: FeederId,
    pub reason: String,
    pub message: String,
}

/// Everything one advisory run produced. Owned by the caller; nothing is cached
/// inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub request: AdvisoryRequest,
    pub generated_at: DateTime<Utc>,
    pub primary_capacity_a: f64,
    /// Primary forecast on the aligned grid, restricted to the work window
    pub primary_forecast: ForecastSeries,
    pub thresholds: ThresholdBands,
    pub ranked: Vec<PartnerAdvice>,
    pub excluded: Vec<ExcludedPartner>,
}

/// Display row for one ranked partner, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub rank: usize,
    pub partner: FeederId,
    pub risk_band: RiskBand,
    pub peak_combined_load_a: f64,
    pub peak_post_transfer_load_a: f64,
    pub total_transferred_a: f64,
    pub safe_hours_pct: f64,
    pub warning_hours_pct: f64,
    pub danger_hours_pct: f64,
}

/// Display row for the primary's hourly forecast table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRow {
    pub timestamp: DateTime<Utc>,
    pub load_a: f64,
    pub band: RiskBand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub primary: FeederId,
    pub policy: super::PolicyKind,
    pub generated_at: DateTime<Utc>,
    pub recommendations: Vec<SummaryRow>,
    pub excluded: Vec<ExcludedPartner>,
}

impl AdvisoryReport {
    pub fn recommendations(&self) -> impl Iterator<Item = &PairRecommendation> {
        self.ranked.iter().map(|a| &a.recommendation)
    }

    pub fn advice_for(&self, partner: &FeederId) -> Option<&PartnerAdvice> {
        self.ranked
            .iter()
            .find(|a| &a.recommendation.partner == partner)
    }

    pub fn is_excluded(&self, partner: &FeederId) -> bool {
        self.excluded.iter().any(|e| &e.partner == partner)
    }

    pub fn best(&self) -> Option<&PairRecommendation> {
        self.recommendations().next()
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.ranked
            .iter()
            .enumerate()
            .map(|(idx, advice)| {
                let r = &advice.recommendation;
                SummaryRow {
                    rank: idx + 1,
                    partner: r.partner.clone(),
                    risk_band: r.risk_band,
                    peak_combined_load_a: round2(r.peak_combined_load_a),
                    peak_post_transfer_load_a: round2(r.peak_post_transfer_load_a),
                    total_transferred_a: round2(r.total_transferred_a),
                    safe_hours_pct: round2(r.safe_hours_fraction * 100.0),
                    warning_hours_pct: round2(r.breakdown.warning_fraction * 100.0),
                    danger_hours_pct: round2(r.breakdown.danger_fraction * 100.0),
                }
            })
            .collect()
    }

    pub fn primary_hourly_rows(&self) -> Vec<HourlyRow> {
        self.primary_forecast
            .points()
            .iter()
            .map(|p| HourlyRow {
                timestamp: p.timestamp,
                load_a: round2(p.load_a),
                band: self.thresholds.classify(p.load_a),
            })
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            primary: self.request.primary.clone(),
            policy: self.request.policy,
            generated_at: self.generated_at,
            recommendations: self.summary_rows(),
            excluded: self.excluded.clone(),
        }
    }
}

/// Round for display only
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
