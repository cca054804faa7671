use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{FeederId, ForecastPoint, ForecastSeries};
use crate::error::{AdvisorError, AdvisorResult};

/// Both feeders' loads at one shared timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub timestamp: DateTime<Utc>,
    pub primary_load_a: f64,
    pub partner_load_a: f64,
}

impl AlignedRow {
    pub fn combined_load_a(&self) -> f64 {
        self.primary_load_a + self.partner_load_a
    }
}

/// Two forecasts reduced to the timestamps they have in common.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub primary: FeederId,
    pub partner: FeederId,
    pub rows: Vec<AlignedRow>,
}

impl AlignedPair {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Default)]
struct Bucket {
    sum: f64,
    count: u32,
}

/// Puts forecasts on a common fixed-cadence timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesAligner {
    cadence_secs: i64,
}

impl Default for SeriesAligner {
    fn default() -> Self {
        Self { cadence_secs: 3600 }
    }
}

impl SeriesAligner {
    pub fn new(cadence: Duration) -> AdvisorResult<Self> {
        let cadence_secs = cadence.num_seconds();
        if cadence_secs <= 0 {
            return Err(AdvisorError::invalid(format!(
                "resample cadence must be at least one second, got {cadence}"
            )));
        }
        Ok(Self { cadence_secs })
    }

    pub fn cadence(&self) -> Duration {
        Duration::seconds(self.cadence_secs)
    }

    /// Mean of all samples in each cadence bucket, keyed by bucket start.
    /// Buckets without samples are left out.
    pub fn resample(&self, series: &ForecastSeries) -> ForecastSeries {
        let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
        for point in series.points() {
            let bucket = floor_bucket(point.timestamp.timestamp(), self.cadence_secs);
            let entry = buckets.entry(bucket).or_default();
            entry.sum += point.load_a;
            entry.count += 1;
        }

        let points = buckets
            .into_iter()
            .filter_map(|(start, stats)| {
                DateTime::<Utc>::from_timestamp(start, 0)
                    .map(|ts| ForecastPoint::new(ts, stats.sum / f64::from(stats.count)))
            })
            .collect();
        ForecastSeries::from_sorted(series.feeder().clone(), points)
    }

    /// Resample both series, then inner-join on timestamp.
    pub fn align(&self, primary: &ForecastSeries, partner: &ForecastSeries) -> AlignedPair {
        let primary_rs = self.resample(primary);
        let partner_rs = self.resample(partner);
        Self::join(&primary_rs, &partner_rs)
    }

    /// Inner join of two series already on the grid.
    pub fn join(primary: &ForecastSeries, partner: &ForecastSeries) -> AlignedPair {
        let mut rows = Vec::with_capacity(primary.len().min(partner.len()));
        let (mut i, mut j) = (0, 0);
        let (a, b) = (primary.points(), partner.points());
        while i < a.len() && j < b.len() {
            match a[i].timestamp.cmp(&b[j].timestamp) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    rows.push(AlignedRow {
                        timestamp: a[i].timestamp,
                        primary_load_a: a[i].load_a,
                        partner_load_a: b[j].load_a,
                    });
                    i += 1;
                    j += 1;
                }
            }
        }

        AlignedPair {
            primary: primary.feeder().clone(),
            partner: partner.feeder().clone(),
            rows,
        }
    }
}

fn floor_bucket(ts: i64, period: i64) -> i64 {
    ts.div_euclid(period) * period
}
