use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};

use super::ForecastProvider;
use crate::domain::{FeederId, ForecastPoint, ForecastSeries, HistoricalSeries};

/// Baseline model for feeders without a trained one: the mean load for each
/// hour of the day over a recent lookback, repeated across the horizon.
pub struct HourOfDayProfileForecaster {
    pub lookback_days: u32,
}

impl Default for HourOfDayProfileForecaster {
    fn default() -> Self {
        Self { lookback_days: 30 }
    }
}

impl HourOfDayProfileForecaster {
    pub fn new(lookback_days: u32) -> Self {
        Self { lookback_days }
    }

    /// Mean load per hour of day; `None` where the lookback has no sample.
    fn hourly_profile(&self, history: &HistoricalSeries) -> ([Option<f64>; 24], Option<f64>) {
        let Some(last) = history.last_timestamp() else {
            return ([None; 24], None);
        };
        // A lookback reaching past the representable range covers everything.
        let recent = Duration::try_days(i64::from(self.lookback_days))
            .and_then(|span| last.checked_sub_signed(span))
            .map_or(history.samples(), |cutoff| history.since(cutoff));

        let mut sums = [0.0_f64; 24];
        let mut counts = [0_u32; 24];
        for sample in recent {
            let h = sample.timestamp.hour() as usize;
            sums[h] += sample.load_a;
            counts[h] += 1;
        }

        let mut profile = [None; 24];
        for h in 0..24 {
            if counts[h] > 0 {
                profile[h] = Some(sums[h] / f64::from(counts[h]));
            }
        }

        let total: u32 = counts.iter().sum();
        let overall = (total > 0).then(|| sums.iter().sum::<f64>() / f64::from(total));
        (profile, overall)
    }
}

#[async_trait]
impl ForecastProvider for HourOfDayProfileForecaster {
    async fn forecast(
        &self,
        feeder: &FeederId,
        history: &HistoricalSeries,
        horizon_hours: u32,
        start: DateTime<Utc>,
    ) -> Result<ForecastSeries> {
        let (profile, overall) = self.hourly_profile(history);
        let Some(overall) = overall else {
            anyhow::bail!("no history within {} days to build a profile", self.lookback_days);
        };

        let points = (0..i64::from(horizon_hours))
            .map(|h| {
                let ts = start + Duration::hours(h);
                let load = profile[ts.hour() as usize].unwrap_or(overall);
                ForecastPoint::new(ts, load)
            })
            .collect();

        Ok(ForecastSeries::new(feeder.clone(), points)?)
    }

    fn name(&self) -> &str {
        "hour_of_day_profile"
    }
}
