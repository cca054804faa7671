use thiserror::Error;

use crate::domain::FeederId;

/// Failures raised while building or running a transfer advisory.
///
/// Everything except [`AdvisorError::InvalidInput`] and
/// [`AdvisorError::PrimaryUnavailable`] is recoverable at partner level: the
/// engine drops the partner from the ranking and reports it as excluded.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("no forecast model registered for feeder '{0}'")]
    MissingModel(FeederId),

    #[error("no historical load data for feeder '{0}'")]
    EmptyHistory(FeederId),

    #[error("history store failed for feeder '{feeder}': {reason}")]
    HistoryUnavailable { feeder: FeederId, reason: String },

    #[error("forecast failed for feeder '{feeder}': {reason}")]
    ForecastFailure { feeder: FeederId, reason: String },

    #[error("forecasts for '{primary}' and '{partner}' share no timestamps")]
    EmptyAlignment { primary: FeederId, partner: FeederId },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("primary feeder '{feeder}' has no usable forecast: {source}")]
    PrimaryUnavailable {
        feeder: FeederId,
        #[source]
        source: Box<AdvisorError>,
    },
}

impl AdvisorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this failure only excludes a partner instead of rejecting the request.
    pub fn is_partner_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingModel(_)
                | Self::EmptyHistory(_)
                | Self::HistoryUnavailable { .. }
                | Self::ForecastFailure { .. }
                | Self::EmptyAlignment { .. }
        )
    }

    /// Short machine-readable tag for the exclusion list.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingModel(_) => "missing_model",
            Self::EmptyHistory(_) => "empty_history",
            Self::HistoryUnavailable { .. } => "history_unavailable",
            Self::ForecastFailure { .. } => "forecast_failure",
            Self::EmptyAlignment { .. } => "empty_alignment",
            Self::InvalidInput(_) => "invalid_input",
            Self::PrimaryUnavailable { .. } => "primary_unavailable",
        }
    }
}

pub type AdvisorResult<T> = std::result::Result<T, AdvisorError>;
