//! History file store.
//!
//! File layout:
//! ```json
//! { "labang": [ { "timestamp": "2024-03-01T01:00:00Z", "load": 212.5 }, ... ] }
//! ```
//! `load` may be a number, a numeric string or null; anything that is not a
//! number is dropped. Timestamps are RFC 3339 or `YYYY-MM-DD HH:MM[:SS]` (UTC).
//! Feeder names are case-insensitive and must be unique.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

use super::HistoryStore;
use crate::domain::{FeederId, HistoricalSeries};
use crate::error::AdvisorError;

#[derive(Debug, Deserialize)]
struct RawRow {
    timestamp: String,
    #[serde(default)]
    load: serde_json::Value,
}

/// History loaded once from a JSON file
#[derive(Debug, Clone, Default)]
pub struct JsonHistoryStore {
    series: HashMap<FeederId, HistoricalSeries>,
}

impl JsonHistoryStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading history file {}", path.display()))?;
        let store = Self::from_json(&body)
            .with_context(|| format!("parsing history file {}", path.display()))?;
        info!(
            path = %path.display(),
            feeders = store.series.len(),
            "history loaded"
        );
        Ok(store)
    }

    pub fn from_json(body: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<RawRow>> =
            serde_json::from_str(body).context("history JSON parse failed")?;

        let mut series = HashMap::new();
        for (name, rows) in raw {
            let feeder = FeederId::new(&name);
            let mut parsed = Vec::with_capacity(rows.len());
            for row in rows {
                let ts = parse_timestamp(&row.timestamp).map_err(|e| {
                    AdvisorError::invalid(format!("feeder '{feeder}': {e}"))
                })?;
                parsed.push((ts, coerce_load(&row.load)));
            }
            let history = HistoricalSeries::from_rows(parsed);
            debug!(feeder = %feeder, samples = history.len(), "history series parsed");
            if series.insert(feeder.clone(), history).is_some() {
                return Err(AdvisorError::invalid(format!(
                    "history file lists feeder '{feeder}' under more than one name"
                ))
                .into());
            }
        }
        Ok(Self { series })
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn load_history(&self, feeder: &FeederId) -> Result<HistoricalSeries> {
        Ok(self.series.get(feeder).cloned().unwrap_or_default())
    }
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("malformed timestamp '{raw}'"))
}

fn coerce_load(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
