use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::TransferPlan;
use crate::error::{AdvisorError, AdvisorResult};

/// Categorical risk label.
///
/// `Safe`/`Warning`/`Danger` come from the threshold-band policy,
/// `Approved`/`SoftApproval`/`Rejected` from the safe-hours policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RiskBand {
    Safe,
    Warning,
    Danger,
    Approved,
    SoftApproval,
    Rejected,
}

/// Which classification drives the labels and the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyKind {
    /// Peak combined load against warning/max thresholds
    ThresholdBand,
    /// Share of hours where both feeders end within rating
    SafeHours,
}

/// `V < warning` is safe, `warning <= V < max` is warning, `V >= max` is danger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBands {
    pub warning_a: f64,
    pub max_a: f64,
}

impl ThresholdBands {
    pub fn new(warning_a: f64, max_a: f64) -> AdvisorResult<Self> {
        if !warning_a.is_finite() || !max_a.is_finite() || warning_a <= 0.0 {
            return Err(AdvisorError::invalid(format!(
                "thresholds must be positive, got warning={warning_a} max={max_a}"
            )));
        }
        if warning_a >= max_a {
            return Err(AdvisorError::invalid(format!(
                "warning threshold {warning_a} must be below max {max_a}"
            )));
        }
        Ok(Self { warning_a, max_a })
    }

    pub fn classify(&self, value_a: f64) -> RiskBand {
        if value_a < self.warning_a {
            RiskBand::Safe
        } else if value_a < self.max_a {
            RiskBand::Warning
        } else {
            RiskBand::Danger
        }
    }
}

/// Approval from the fraction of hours that stay within rating after transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeHoursPolicy {
    /// Minimum fraction for a soft approval
    pub soft_approval_fraction: f64,
}

impl Default for SafeHoursPolicy {
    fn default() -> Self {
        Self {
            soft_approval_fraction: 0.90,
        }
    }
}

impl SafeHoursPolicy {
    pub fn new(soft_approval_fraction: f64) -> AdvisorResult<Self> {
        if !(soft_approval_fraction > 0.0 && soft_approval_fraction <= 1.0) {
            return Err(AdvisorError::invalid(format!(
                "soft approval fraction must be in (0, 1], got {soft_approval_fraction}"
            )));
        }
        Ok(Self {
            soft_approval_fraction,
        })
    }

    pub fn classify(&self, safe_fraction: f64) -> RiskBand {
        if safe_fraction >= 1.0 {
            RiskBand::Approved
        } else if safe_fraction >= self.soft_approval_fraction {
            RiskBand::SoftApproval
        } else {
            RiskBand::Rejected
        }
    }
}

/// Share of aligned hours in each threshold band, by combined load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandBreakdown {
    pub safe_fraction: f64,
    pub warning_fraction: f64,
    pub danger_fraction: f64,
}

/// Holds both policies' parameters; the active one is chosen per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskClassifier {
    pub bands: ThresholdBands,
    pub safe_hours: SafeHoursPolicy,
}

impl RiskClassifier {
    pub fn new(bands: ThresholdBands, safe_hours: SafeHoursPolicy) -> Self {
        Self { bands, safe_hours }
    }

    pub fn classify_plan(&self, policy: PolicyKind, plan: &TransferPlan) -> RiskBand {
        match policy {
            PolicyKind::ThresholdBand => self.bands.classify(plan.peak_combined_load_a()),
            PolicyKind::SafeHours => self.safe_hours.classify(plan.safe_hours_fraction()),
        }
    }

    pub fn breakdown(&self, plan: &TransferPlan) -> BandBreakdown {
        if plan.steps.is_empty() {
            return BandBreakdown::default();
        }
        let (mut safe, mut warning, mut danger) = (0usize, 0usize, 0usize);
        for step in &plan.steps {
            match self.bands.classify(step.combined_load_a()) {
                RiskBand::Safe => safe += 1,
                RiskBand::Warning => warning += 1,
                _ => danger += 1,
            }
        }
        let n = plan.steps.len() as f64;
        BandBreakdown {
            safe_fraction: safe as f64 / n,
            warning_fraction: warning as f64 / n,
            danger_fraction: danger as f64 / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{AlignedPair, AlignedRow, PairCapacity, TransferAllocator};
    use crate::domain::FeederId;
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;
    use std::str::FromStr;

    fn bands() -> ThresholdBands {
        ThresholdBands::new(320.0, 400.0).unwrap()
    }

    #[rstest]
    #[case(0.0, RiskBand::Safe)]
    #[case(319.99, RiskBand::Safe)]
    #[case(320.0, RiskBand::Warning)]
    #[case(399.99, RiskBand::Warning)]
    #[case(400.0, RiskBand::Danger)]
    #[case(845.0, RiskBand::Danger)]
    fn test_threshold_band_boundaries(#[case] value: f64, #[case] expected: RiskBand) {
        assert_eq!(bands().classify(value), expected);
    }

    #[test]
    fn test_threshold_variant_300_320() {
        let variant = ThresholdBands::new(300.0, 320.0).unwrap();
        assert_eq!(variant.classify(299.0), RiskBand::Safe);
        assert_eq!(variant.classify(300.0), RiskBand::Warning);
        assert_eq!(variant.classify(320.0), RiskBand::Danger);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(ThresholdBands::new(400.0, 400.0).is_err());
        assert!(ThresholdBands::new(450.0, 400.0).is_err());
        assert!(ThresholdBands::new(0.0, 400.0).is_err());
    }

    #[rstest]
    #[case(1.0, RiskBand::Approved)]
    #[case(0.99, RiskBand::SoftApproval)]
    #[case(0.90, RiskBand::SoftApproval)]
    #[case(0.8999, RiskBand::Rejected)]
    #[case(0.0, RiskBand::Rejected)]
    fn test_safe_hours_policy(#[case] fraction: f64, #[case] expected: RiskBand) {
        assert_eq!(SafeHoursPolicy::default().classify(fraction), expected);
    }

    #[test]
    fn test_safe_hours_validation() {
        assert!(SafeHoursPolicy::new(0.0).is_err());
        assert!(SafeHoursPolicy::new(1.2).is_err());
        assert!(SafeHoursPolicy::new(1.0).is_ok());
    }

    #[test]
    fn test_band_labels_round_trip_through_strings() {
        assert_eq!(RiskBand::SoftApproval.to_string(), "soft-approval");
        assert_eq!(RiskBand::from_str("danger").unwrap(), RiskBand::Danger);
        assert_eq!(PolicyKind::from_str("safe_hours").unwrap(), PolicyKind::SafeHours);
        assert_eq!(
            serde_json::to_string(&RiskBand::SoftApproval).unwrap(),
            "\"soft-approval\""
        );
    }

    #[test]
    fn test_classify_plan_and_breakdown() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let pair = AlignedPair {
            primary: FeederId::new("labang"),
            partner: FeederId::new("galis"),
            rows: [(200.0, 100.0), (250.0, 100.0), (300.0, 50.0), (450.0, 100.0)]
                .iter()
                .enumerate()
                .map(|(h, (p, q))| AlignedRow {
                    timestamp: t0 + Duration::hours(h as i64),
                    primary_load_a: *p,
                    partner_load_a: *q,
                })
                .collect(),
        };
        let plan = TransferAllocator::new(PairCapacity::uniform(400.0).unwrap()).plan(&pair);
        let classifier = RiskClassifier::new(bands(), SafeHoursPolicy::default());

        assert_eq!(classifier.classify_plan(PolicyKind::ThresholdBand, &plan), RiskBand::Danger);
        assert_eq!(classifier.classify_plan(PolicyKind::SafeHours, &plan), RiskBand::Approved);

        let breakdown = classifier.breakdown(&plan);
        assert_eq!(breakdown.safe_fraction, 0.25);
        assert_eq!(breakdown.warning_fraction, 0.5);
        assert_eq!(breakdown.danger_fraction, 0.25);
    }
}
