use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::FeederId;
use crate::error::{AdvisorError, AdvisorResult};

/// One measured load value from the history store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    pub timestamp: DateTime<Utc>,
    pub load_a: f64,
}

/// Measured load for a feeder, ordered by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    samples: Vec<LoadSample>,
}

impl HistoricalSeries {
    /// Rows without a usable load are dropped, the rest sorted by timestamp.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, Option<f64>)>,
    {
        let mut samples: Vec<LoadSample> = rows
            .into_iter()
            .filter_map(|(timestamp, load)| match load {
                Some(load_a) if load_a.is_finite() => Some(LoadSample { timestamp, load_a }),
                _ => None,
            })
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    pub fn from_samples(samples: Vec<LoadSample>) -> Self {
        Self::from_rows(samples.into_iter().map(|s| (s.timestamp, Some(s.load_a))))
    }

    pub fn samples(&self) -> &[LoadSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Samples at or after `cutoff`
    pub fn since(&self, cutoff: DateTime<Utc>) -> &[LoadSample] {
        let idx = self.samples.partition_point(|s| s.timestamp < cutoff);
        &self.samples[idx..]
    }
}

/// Predicted load at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub load_a: f64,
}

impl ForecastPoint {
    pub fn new(timestamp: DateTime<Utc>, load_a: f64) -> Self {
        Self { timestamp, load_a }
    }
}

/// Forecast for one feeder: ordered, one point per timestamp, loads >= 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    feeder: FeederId,
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Normalize raw provider output.
    ///
    /// Non-finite loads are rejected. Negative loads are clamped to zero.
    /// Duplicate timestamps keep the last value supplied.
    pub fn new(feeder: FeederId, points: Vec<ForecastPoint>) -> AdvisorResult<Self> {
        let mut by_time = BTreeMap::new();
        let mut clamped = 0usize;
        for point in points {
            if !point.load_a.is_finite() {
                return Err(AdvisorError::invalid(format!(
                    "forecast for '{feeder}' has a non-finite load at {}",
                    point.timestamp
                )));
            }
            let load_a = if point.load_a < 0.0 {
                clamped += 1;
                0.0
            } else {
                point.load_a
            };
            by_time.insert(point.timestamp, load_a);
        }

        if clamped > 0 {
            warn!(feeder = %feeder, clamped, "negative forecast loads clamped to zero");
        }

        let points = by_time
            .into_iter()
            .map(|(timestamp, load_a)| ForecastPoint { timestamp, load_a })
            .collect();
        Ok(Self { feeder, points })
    }

    /// Caller guarantees strictly increasing timestamps and finite, non-negative loads.
    pub(crate) fn from_sorted(feeder: FeederId, points: Vec<ForecastPoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { feeder, points }
    }

    pub fn empty(feeder: FeederId) -> Self {
        Self {
            feeder,
            points: Vec::new(),
        }
    }

    pub fn feeder(&self) -> &FeederId {
        &self.feeder
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }

    pub fn peak_load_a(&self) -> Option<f64> {
        self.points.iter().map(|p| p.load_a).reduce(f64::max)
    }

    /// Points inside the window, bounds inclusive.
    pub fn within(&self, window: &WorkWindow) -> Self {
        Self {
            feeder: self.feeder.clone(),
            points: self
                .points
                .iter()
                .filter(|p| window.contains(p.timestamp))
                .copied()
                .collect(),
        }
    }
}

/// Period of planned work the comparison is restricted to, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AdvisorResult<Self> {
        if end <= start {
            return Err(AdvisorError::invalid(format!(
                "work window end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn test_history_drops_missing_and_sorts() {
        let history = HistoricalSeries::from_rows(vec![
            (t(2), Some(120.0)),
            (t(0), Some(100.0)),
            (t(1), None),
            (t(3), Some(f64::NAN)),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.samples()[0].timestamp, t(0));
        assert_eq!(history.last_timestamp(), Some(t(2)));
    }

    #[test]
    fn test_history_since() {
        let history = HistoricalSeries::from_rows((0..10).map(|h| (t(h), Some(h as f64))));
        assert_eq!(history.since(t(7)).len(), 3);
        assert!(history.since(t(20)).is_empty());
    }

    #[test]
    fn test_forecast_clamps_negative_and_dedupes() {
        let series = ForecastSeries::new(
            FeederId::new("birem"),
            vec![
                ForecastPoint::new(t(1), 50.0),
                ForecastPoint::new(t(0), -3.0),
                ForecastPoint::new(t(1), 55.0),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].load_a, 0.0);
        assert_eq!(series.points()[1].load_a, 55.0);
        assert_eq!(series.peak_load_a(), Some(55.0));
    }

    #[test]
    fn test_forecast_rejects_non_finite() {
        let err = ForecastSeries::new(
            FeederId::new("birem"),
            vec![ForecastPoint::new(t(0), f64::INFINITY)],
        )
        .unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidInput(_)));
    }

    #[test]
    fn test_work_window_bounds_inclusive() {
        let window = WorkWindow::new(t(2), t(4)).unwrap();
        assert!(window.contains(t(2)));
        assert!(window.contains(t(4)));
        assert!(!window.contains(t(5)));

        let series = ForecastSeries::new(
            FeederId::new("gegger"),
            (0..8).map(|h| ForecastPoint::new(t(h), 10.0)).collect(),
        )
        .unwrap();
        assert_eq!(series.within(&window).len(), 3);
    }

    #[test]
    fn test_work_window_rejects_inverted_range() {
        assert!(WorkWindow::new(t(4), t(4)).is_err());
        assert!(WorkWindow::new(t(5), t(4)).is_err());
    }
}
