use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::advisor::{AdvisoryRequest, PolicyKind, MAX_HORIZON_HOURS};
use crate::domain::{RelationTable, WorkWindow};
use crate::error::AdvisorError;

/// Ten years of history is more than any profile needs
const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feeders: FeedersConfig,
    pub thresholds: ThresholdsConfig,
    pub advisor: AdvisorConfig,
    pub forecast: ForecastConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedersConfig {
    pub default_capacity_a: f64,
    /// Per-feeder rating overrides
    #[serde(default)]
    pub capacity_a: BTreeMap<String, f64>,
    /// Base transfer relation; symmetrized when the graph is built
    #[serde(default)]
    pub relations: RelationTable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    pub warning_a: f64,
    pub max_a: f64,
    pub soft_approval_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    pub policy: PolicyKind,
    pub horizon_hours: u32,
    pub resample_minutes: u32,
    pub max_concurrency: usize,
    pub provider_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    pub profile_lookback_days: u32,
    /// Feeders with a registered model
    #[serde(default)]
    pub modelled_feeders: Vec<String>,
    /// Use the profile model for feeders without one
    #[serde(default)]
    pub profile_fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub history_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub primary_feeder: String,
    pub policy: Option<PolicyKind>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

impl RequestConfig {
    pub fn to_request(&self, default_policy: PolicyKind) -> Result<AdvisoryRequest, AdvisorError> {
        let mut request =
            AdvisoryRequest::new(&*self.primary_feeder, self.policy.unwrap_or(default_policy));
        match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => request = request.with_window(WorkWindow::new(start, end)?),
            (None, None) => {}
            _ => {
                return Err(AdvisorError::invalid(
                    "work window needs both window_start and window_end",
                ))
            }
        }
        Ok(request)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from("config/default.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FTA__").split("__"));
        let cfg: Self = figment.extract().context("invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AdvisorError> {
        if !(self.feeders.default_capacity_a > 0.0) {
            return Err(AdvisorError::invalid("feeders.default_capacity_a must be positive"));
        }
        if let Some((name, cap)) = self.feeders.capacity_a.iter().find(|(_, c)| !(**c > 0.0)) {
            return Err(AdvisorError::invalid(format!(
                "feeders.capacity_a.{name} must be positive, got {cap}"
            )));
        }
        let t = &self.thresholds;
        if !(t.warning_a > 0.0 && t.warning_a < t.max_a) {
            return Err(AdvisorError::invalid(format!(
                "thresholds need 0 < warning_a < max_a, got {} / {}",
                t.warning_a, t.max_a
            )));
        }
        if !(t.soft_approval_fraction > 0.0 && t.soft_approval_fraction <= 1.0) {
            return Err(AdvisorError::invalid("thresholds.soft_approval_fraction must be in (0, 1]"));
        }
        let a = &self.advisor;
        if a.horizon_hours == 0 || a.resample_minutes == 0 || a.max_concurrency == 0 {
            return Err(AdvisorError::invalid(
                "advisor.horizon_hours, resample_minutes and max_concurrency must be non-zero",
            ));
        }
        if a.horizon_hours > MAX_HORIZON_HOURS {
            return Err(AdvisorError::invalid(format!(
                "advisor.horizon_hours must be at most {MAX_HORIZON_HOURS}, got {}",
                a.horizon_hours
            )));
        }
        let lookback = self.forecast.profile_lookback_days;
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback) {
            return Err(AdvisorError::invalid(format!(
                "forecast.profile_lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {lookback}"
            )));
        }
        Ok(())
    }
}
