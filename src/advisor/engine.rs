use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::{
    AdvisoryReport, ExcludedPartner, PairCapacity, PairRecommendation, PartnerAdvice, PolicyKind,
    RecommendationRanker, RiskClassifier, SafeHoursPolicy, SeriesAligner, ThresholdBands,
    TransferAllocator,
};
use crate::config::Config;
use crate::domain::{FeederGraph, FeederId, ForecastSeries, WorkWindow};
use crate::error::{AdvisorError, AdvisorResult};
use crate::forecast::ProviderRegistry;
use crate::repo::HistoryStore;

/// What the caller wants advice on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub primary: FeederId,
    pub policy: PolicyKind,
    /// Restrict the comparison to this period; the whole horizon when absent
    pub window: Option<WorkWindow>,
}

impl AdvisoryRequest {
    pub fn new(primary: impl Into<FeederId>, policy: PolicyKind) -> Self {
        Self {
            primary: primary.into(),
            policy,
            window: None,
        }
    }

    pub fn with_window(mut self, window: WorkWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// Longest forecast horizon the engine will request (31 days)
pub const MAX_HORIZON_HOURS: u32 = 24 * 31;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub horizon_hours: u32,
    /// Partner evaluations allowed in flight at once
    pub max_concurrency: usize,
    /// Per-feeder limit on each history load and forecast provider call
    pub provider_timeout: std::time::Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            horizon_hours: 72,
            max_concurrency: 4,
            provider_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// A feeder's forecast and the last observation it was built from
struct FeederForecast {
    last_observed: DateTime<Utc>,
    series: ForecastSeries,
}

/// Runs the forecast -> align -> allocate -> classify -> rank pipeline.
///
/// Stateless between calls: every run reads history and forecasts afresh and
/// returns an owned [`AdvisoryReport`].
#[derive(Clone)]
pub struct AdvisoryEngine {
    graph: Arc<FeederGraph>,
    registry: Arc<ProviderRegistry>,
    history: Arc<dyn HistoryStore>,
    aligner: SeriesAligner,
    classifier: RiskClassifier,
    settings: EngineSettings,
}

impl AdvisoryEngine {
    pub fn new(
        graph: FeederGraph,
        registry: ProviderRegistry,
        history: Arc<dyn HistoryStore>,
        aligner: SeriesAligner,
        classifier: RiskClassifier,
        settings: EngineSettings,
    ) -> AdvisorResult<Self> {
        if !(1..=MAX_HORIZON_HOURS).contains(&settings.horizon_hours) {
            return Err(AdvisorError::invalid(format!(
                "forecast horizon must be between 1 and {MAX_HORIZON_HOURS} hours, got {}",
                settings.horizon_hours
            )));
        }
        if settings.max_concurrency == 0 {
            return Err(AdvisorError::invalid("max_concurrency must be at least 1"));
        }
        Ok(Self {
            graph: Arc::new(graph),
            registry: Arc::new(registry),
            history,
            aligner,
            classifier,
            settings,
        })
    }

    pub fn from_config(
        cfg: &Config,
        graph: FeederGraph,
        registry: ProviderRegistry,
        history: Arc<dyn HistoryStore>,
    ) -> AdvisorResult<Self> {
        let aligner =
            SeriesAligner::new(Duration::minutes(i64::from(cfg.advisor.resample_minutes)))?;
        let classifier = RiskClassifier::new(
            ThresholdBands::new(cfg.thresholds.warning_a, cfg.thresholds.max_a)?,
            SafeHoursPolicy::new(cfg.thresholds.soft_approval_fraction)?,
        );
        let settings = EngineSettings {
            horizon_hours: cfg.advisor.horizon_hours,
            max_concurrency: cfg.advisor.max_concurrency,
            provider_timeout: std::time::Duration::from_secs(cfg.advisor.provider_timeout_seconds),
        };
        Self::new(graph, registry, history, aligner, classifier, settings)
    }

    pub fn graph(&self) -> &FeederGraph {
        &self.graph
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Evaluate every partner of the primary feeder and rank the results.
    ///
    /// Fails only on invalid input or when the primary itself cannot be
    /// forecast; partner failures are reported in `excluded`.
    pub async fn advise(&self, request: &AdvisoryRequest) -> AdvisorResult<AdvisoryReport> {
        let primary = &request.primary;
        if primary.is_empty() {
            return Err(AdvisorError::invalid("primary feeder name is empty"));
        }

        let primary_fc = self.forecast_feeder(primary).await.map_err(|err| match err {
            AdvisorError::InvalidInput(_) => err,
            other => AdvisorError::PrimaryUnavailable {
                feeder: primary.clone(),
                source: Box::new(other),
            },
        })?;

        if let Some(window) = &request.window {
            let reach = primary_fc.last_observed
                + Duration::hours(i64::from(self.settings.horizon_hours));
            if window.end > reach {
                return Err(AdvisorError::invalid(format!(
                    "work window ends at {} but forecasts for '{primary}' only reach {reach}",
                    window.end
                )));
            }
        }

        let primary_grid = self.on_grid(&primary_fc.series, request.window.as_ref());
        let partners = self.graph.partners(primary);
        info!(
            feeder = %primary,
            partners = partners.len(),
            policy = %request.policy,
            forecast_hours = primary_grid.len(),
            "evaluating transfer partners"
        );

        let limiter = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let primary_grid = Arc::new(primary_grid);
        // Dropping the set aborts in-flight evaluations with the request.
        let mut tasks = JoinSet::new();
        for partner in &partners {
            let engine = self.clone();
            let limiter = limiter.clone();
            let primary_grid = primary_grid.clone();
            let window = request.window;
            let policy = request.policy;
            let id = partner.clone();
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                let outcome = engine
                    .evaluate_partner(&primary_grid, &id, window.as_ref(), policy)
                    .await;
                (id, outcome)
            });
        }

        let mut pending = partners;
        let mut advices = Vec::with_capacity(pending.len());
        let mut excluded = Vec::new();
        let mut task_failure = None;
        while let Some(joined) = tasks.join_next().await {
            let (partner, outcome) = match joined {
                Ok(done) => done,
                Err(join_err) => {
                    error!(feeder = %primary, "partner evaluation task failed: {join_err}");
                    task_failure = Some(join_err.to_string());
                    continue;
                }
            };
            pending.remove(&partner);
            match outcome {
                Ok(advice) => advices.push(advice),
                Err(err) => excluded.push(exclusion(primary, partner, err)),
            }
        }
        for partner in pending {
            let err = AdvisorError::ForecastFailure {
                feeder: partner.clone(),
                reason: format!(
                    "evaluation task failed: {}",
                    task_failure.as_deref().unwrap_or("unknown")
                ),
            };
            excluded.push(exclusion(primary, partner, err));
        }
        excluded.sort_by(|a, b| a.partner.cmp(&b.partner));

        let ranked = RecommendationRanker.rank(request.policy, advices);
        info!(
            feeder = %primary,
            ranked = ranked.len(),
            excluded = excluded.len(),
            "transfer advisory complete"
        );

        Ok(AdvisoryReport {
            request: request.clone(),
            generated_at: Utc::now(),
            primary_capacity_a: self.graph.capacity(primary),
            primary_forecast: Arc::unwrap_or_clone(primary_grid),
            thresholds: self.classifier.bands,
            ranked,
            excluded,
        })
    }

    async fn evaluate_partner(
        &self,
        primary_grid: &ForecastSeries,
        partner: &FeederId,
        window: Option<&WorkWindow>,
        policy: PolicyKind,
    ) -> AdvisorResult<PartnerAdvice> {
        let partner_fc = self.forecast_feeder(partner).await?;
        let partner_grid = self.on_grid(&partner_fc.series, window);

        let aligned = SeriesAligner::join(primary_grid, &partner_grid);
        if aligned.is_empty() {
            return Err(AdvisorError::EmptyAlignment {
                primary: primary_grid.feeder().clone(),
                partner: partner.clone(),
            });
        }

        let capacity = PairCapacity::between(
            &self.graph.feeder(primary_grid.feeder()),
            &self.graph.feeder(partner),
        )?;
        let plan = TransferAllocator::new(capacity).plan(&aligned);
        let recommendation = PairRecommendation::from_plan(&plan, policy, &self.classifier);
        debug!(
            partner = %partner,
            hours = aligned.len(),
            band = %recommendation.risk_band,
            transferred_a = recommendation.total_transferred_a,
            "partner evaluated"
        );

        Ok(PartnerAdvice {
            recommendation,
            plan,
            aligned,
        })
    }

    async fn forecast_feeder(&self, feeder: &FeederId) -> AdvisorResult<FeederForecast> {
        let provider = self.registry.resolve(feeder)?;

        let history = timeout(self.settings.provider_timeout, self.history.load_history(feeder))
            .await
            .map_err(|_| AdvisorError::HistoryUnavailable {
                feeder: feeder.clone(),
                reason: format!("timed out after {:?}", self.settings.provider_timeout),
            })?
            .map_err(|e| AdvisorError::HistoryUnavailable {
                feeder: feeder.clone(),
                reason: format!("{e:#}"),
            })?;
        let Some(last_observed) = history.last_timestamp() else {
            return Err(AdvisorError::EmptyHistory(feeder.clone()));
        };

        let start = last_observed + self.aligner.cadence();
        let call = provider.forecast(feeder, &history, self.settings.horizon_hours, start);
        let series = timeout(self.settings.provider_timeout, call)
            .await
            .map_err(|_| AdvisorError::ForecastFailure {
                feeder: feeder.clone(),
                reason: format!("timed out after {:?}", self.settings.provider_timeout),
            })?
            .map_err(|e| AdvisorError::ForecastFailure {
                feeder: feeder.clone(),
                reason: format!("{e:#}"),
            })?;

        if series.is_empty() {
            return Err(AdvisorError::ForecastFailure {
                feeder: feeder.clone(),
                reason: "provider returned no forecast points".to_string(),
            });
        }
        debug!(feeder = %feeder, provider = provider.name(), points = series.len(), "forecast ready");

        Ok(FeederForecast {
            last_observed,
            series,
        })
    }

    fn on_grid(&self, series: &ForecastSeries, window: Option<&WorkWindow>) -> ForecastSeries {
        let resampled = self.aligner.resample(series);
        match window {
            Some(w) => resampled.within(w),
            None => resampled,
        }
    }
}

fn exclusion(primary: &FeederId, partner: FeederId, err: AdvisorError) -> ExcludedPartner {
    warn!(feeder = %primary, partner = %partner, reason = err.kind(), "partner excluded: {err}");
    ExcludedPartner {
        partner,
        reason: err.kind().to_string(),
        message: err.to_string(),
    }
}
