//! Metric recording helpers.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the embedding
//! application installs a recorder.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::errors::VerificationError;

/// Outcome label of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Passed,
    Failed,
    Skipped,
}

impl VerificationOutcome {
    #[must_use]
    pub fn as_metric_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl<T> From<&Result<T, VerificationError>> for VerificationOutcome {
    fn from(result: &Result<T, VerificationError>) -> Self {
        if result.is_ok() {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

#[inline]
pub fn record_gateway_selection(strategy: &'static str) {
    counter!("wayfinder_gateway_selections_total", "strategy" => strategy).increment(1);
}

#[inline]
pub fn record_routing_error(strategy: &'static str) {
    counter!("wayfinder_routing_errors_total", "strategy" => strategy).increment(1);
}

#[inline]
pub fn record_verification(strategy: &str, outcome: VerificationOutcome) {
    counter!(
        "wayfinder_verifications_total",
        "strategy" => strategy.to_string(),
        "outcome" => outcome.as_metric_str()
    )
    .increment(1);
}

#[inline]
pub fn record_ping_latency(latency: Duration) {
    histogram!("wayfinder_ping_latency_seconds").record(latency.as_secs_f64());
}
