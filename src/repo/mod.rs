//! Historical load storage

pub mod json;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{FeederId, HistoricalSeries};

pub use json::JsonHistoryStore;
pub use memory::InMemoryHistoryStore;

/// Source of measured load per feeder.
///
/// A feeder the store knows nothing about yields an empty series, not an error.
/// Errors are reserved for the store itself failing.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load_history(&self, feeder: &FeederId) -> Result<HistoricalSeries>;
}
