use tracing::debug;

use super::{AdvisoryEngine, AdvisoryReport, AdvisoryRequest};
use crate::error::AdvisorResult;

/// Caller-held memo of the last advisory.
///
/// The cached report is reused only for an identical request; any change in
/// the request recomputes, and [`AdvisorySession::invalidate`] forces the next
/// call to recompute (e.g. after new history arrives). A failed recompute
/// leaves the previous report in place.
#[derive(Debug, Default)]
pub struct AdvisorySession {
    last: Option<AdvisoryReport>,
}

impl AdvisorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn advise(
        &mut self,
        engine: &AdvisoryEngine,
        request: &AdvisoryRequest,
    ) -> AdvisorResult<&AdvisoryReport> {
        let fresh = match self.last.take() {
            Some(report) if report.request == *request => {
                debug!(feeder = %request.primary, "reusing cached advisory");
                report
            }
            previous => match engine.advise(request).await {
                Ok(report) => report,
                Err(err) => {
                    self.last = previous;
                    return Err(err);
                }
            },
        };
        Ok(self.last.insert(fresh))
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&AdvisoryReport> {
        self.last.as_ref()
    }
}
