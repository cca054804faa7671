use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlignedPair, AlignedRow};
use crate::domain::{Feeder, FeederId};
use crate::error::{AdvisorError, AdvisorResult};

/// Ratings used for one primary/partner evaluation (A).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairCapacity {
    pub primary_a: f64,
    pub partner_a: f64,
}

impl PairCapacity {
    pub fn new(primary_a: f64, partner_a: f64) -> AdvisorResult<Self> {
        for (label, value) in [("primary", primary_a), ("partner", partner_a)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AdvisorError::invalid(format!(
                    "{label} capacity must be positive, got {value}"
                )));
            }
        }
        Ok(Self {
            primary_a,
            partner_a,
        })
    }

    pub fn between(primary: &Feeder, partner: &Feeder) -> AdvisorResult<Self> {
        Self::new(primary.rated_capacity_a, partner.rated_capacity_a)
    }

    /// Same rating on both sides
    pub fn uniform(capacity_a: f64) -> AdvisorResult<Self> {
        Self::new(capacity_a, capacity_a)
    }
}

/// Outcome of the transfer at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferStep {
    pub timestamp: DateTime<Utc>,
    pub primary_load_before_a: f64,
    pub partner_load_before_a: f64,
    pub transferred_a: f64,
    pub primary_load_after_a: f64,
    pub partner_load_after_a: f64,
}

impl TransferStep {
    /// Shift as much of the primary's excess as the partner has room for.
    pub fn compute(row: &AlignedRow, capacity: PairCapacity) -> Self {
        let over = (row.primary_load_a - capacity.primary_a).max(0.0);
        let headroom = (capacity.partner_a - row.partner_load_a).max(0.0);
        let transferred_a = over.min(headroom);

        Self {
            timestamp: row.timestamp,
            primary_load_before_a: row.primary_load_a,
            partner_load_before_a: row.partner_load_a,
            transferred_a,
            primary_load_after_a: row.primary_load_a - transferred_a,
            partner_load_after_a: row.partner_load_a + transferred_a,
        }
    }

    pub fn combined_load_a(&self) -> f64 {
        self.primary_load_before_a + self.partner_load_before_a
    }

    /// Higher of the two post-transfer loads
    pub fn peak_after_a(&self) -> f64 {
        self.primary_load_after_a.max(self.partner_load_after_a)
    }

    pub fn is_safe_after(&self, capacity: PairCapacity) -> bool {
        self.primary_load_after_a <= capacity.primary_a
            && self.partner_load_after_a <= capacity.partner_a
    }
}

/// Per-hour transfer plan for one primary/partner pair.
///
/// The partner is evaluated against the primary's unmodified forecast; plans
/// for different partners are independent what-if scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub primary: FeederId,
    pub partner: FeederId,
    pub capacity: PairCapacity,
    pub steps: Vec<TransferStep>,
}

impl TransferPlan {
    pub fn total_transferred_a(&self) -> f64 {
        self.steps.iter().map(|s| s.transferred_a).sum()
    }

    pub fn peak_combined_load_a(&self) -> f64 {
        self.steps
            .iter()
            .map(TransferStep::combined_load_a)
            .fold(0.0, f64::max)
    }

    pub fn peak_post_transfer_load_a(&self) -> f64 {
        self.steps
            .iter()
            .map(TransferStep::peak_after_a)
            .fold(0.0, f64::max)
    }

    /// Share of steps where both feeders end within their rating. Zero for an empty plan.
    pub fn safe_hours_fraction(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let safe = self
            .steps
            .iter()
            .filter(|s| s.is_safe_after(self.capacity))
            .count();
        safe as f64 / self.steps.len() as f64
    }

    /// Steps where the primary stays above its rating after the transfer
    pub fn residual_overload_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.primary_load_after_a > self.capacity.primary_a)
            .count()
    }

    /// True when the primary never exceeds its rating, so nothing moves.
    pub fn is_trivially_safe(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.primary_load_before_a <= self.capacity.primary_a)
    }
}

/// Greedy single-partner allocation over an aligned pair.
#[derive(Debug, Clone, Copy)]
pub struct TransferAllocator {
    capacity: PairCapacity,
}

impl TransferAllocator {
    pub fn new(capacity: PairCapacity) -> Self {
        Self { capacity }
    }

    pub fn plan(&self, pair: &AlignedPair) -> TransferPlan {
        let steps = pair
            .rows
            .iter()
            .map(|row| TransferStep::compute(row, self.capacity))
            .collect();

        TransferPlan {
            primary: pair.primary.clone(),
            partner: pair.partner.clone(),
            capacity: self.capacity,
            steps,
        }
    }
}
