use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::HourOfDayProfileForecaster;
use crate::config::ForecastConfig;
use crate::domain::{FeederId, ForecastSeries, HistoricalSeries};
use crate::error::{AdvisorError, AdvisorResult};

/// A per-feeder load model. How it predicts is its own business.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(
        &self,
        feeder: &FeederId,
        history: &HistoricalSeries,
        horizon_hours: u32,
        start: DateTime<Utc>,
    ) -> Result<ForecastSeries>;

    /// Label used in logs
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Feeder -> forecast model mapping, resolved once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<FeederId, Arc<dyn ForecastProvider>>,
    fallback: Option<Arc<dyn ForecastProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the profile model for every configured feeder, plus the
    /// fallback when enabled.
    pub fn from_config(cfg: &ForecastConfig) -> Self {
        let profile: Arc<dyn ForecastProvider> =
            Arc::new(HourOfDayProfileForecaster::new(cfg.profile_lookback_days));

        let mut registry = Self::new();
        for name in &cfg.modelled_feeders {
            registry.register(FeederId::new(name), profile.clone());
        }
        if cfg.profile_fallback {
            registry = registry.with_fallback(profile);
        }
        registry
    }

    pub fn register(
        &mut self,
        feeder: impl Into<FeederId>,
        provider: Arc<dyn ForecastProvider>,
    ) -> &mut Self {
        self.providers.insert(feeder.into(), provider);
        self
    }

    pub fn with_fallback(mut self, provider: Arc<dyn ForecastProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Model for a feeder, or `MissingModel` when neither a dedicated model
    /// nor a fallback exists.
    pub fn resolve(&self, feeder: &FeederId) -> AdvisorResult<Arc<dyn ForecastProvider>> {
        self.providers
            .get(feeder)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| AdvisorError::MissingModel(feeder.clone()))
    }

    pub fn has_model(&self, feeder: &FeederId) -> bool {
        self.providers.contains_key(feeder) || self.fallback.is_some()
    }

    pub fn registered(&self) -> impl Iterator<Item = &FeederId> {
        self.providers.keys()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.providers.keys().map(FeederId::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .field("fallback", &self.fallback.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}
