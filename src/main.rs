use anyhow::Result;
use feeder_transfer_advisor::{advisor, config, domain, forecast, repo, telemetry};
use std::sync::Arc;
use tracing::{info, warn};

use advisor::AdvisoryEngine;
use config::Config;
use domain::FeederGraph;
use forecast::ProviderRegistry;
use repo::JsonHistoryStore;
use telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let graph = FeederGraph::build(
        &cfg.feeders.relations,
        cfg.feeders.default_capacity_a,
        &cfg.feeders.capacity_a,
    )?;
    let history = JsonHistoryStore::open(&cfg.data.history_path).await?;
    let registry = ProviderRegistry::from_config(&cfg.forecast);
    info!(?registry, feeders = graph.feeders().count(), "advisor initialised");

    let request = cfg.request.to_request(cfg.advisor.policy)?;
    if request.primary.is_empty() {
        anyhow::bail!("request.primary_feeder must be set (or FTA__REQUEST__PRIMARY_FEEDER)");
    }

    let engine = AdvisoryEngine::from_config(&cfg, graph, registry, Arc::new(history))?;
    let report = engine.advise(&request).await?;

    if report.ranked.is_empty() {
        warn!(feeder = %request.primary, "no transfer recommendation could be produced");
    }

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}
