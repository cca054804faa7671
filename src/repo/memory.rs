use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::HistoryStore;
use crate::domain::{FeederId, HistoricalSeries};

/// History held in memory, for embedding callers and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryStore {
    series: HashMap<FeederId, HistoricalSeries>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feeder: impl Into<FeederId>, history: HistoricalSeries) {
        self.series.insert(feeder.into(), history);
    }

    pub fn with(mut self, feeder: impl Into<FeederId>, history: HistoricalSeries) -> Self {
        self.insert(feeder, history);
        self
    }

    pub fn feeders(&self) -> impl Iterator<Item = &FeederId> {
        self.series.keys()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load_history(&self, feeder: &FeederId) -> Result<HistoricalSeries> {
        Ok(self.series.get(feeder).cloned().unwrap_or_default())
    }
}
