use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use url::Url;

use super::{Blocklist, RoutingStrategy};
use crate::{
    errors::RoutingError,
    http::{HttpRequest, HttpTransport},
    metrics,
    types::Gateway,
};

/// Default per-probe timeout.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(500);

/// Default path probed on each gateway.
pub const DEFAULT_PROBE_PATH: &str = "ar-io/info";

#[derive(Debug, Clone)]
pub struct FastestPingConfig {
    /// Upper bound for each individual probe.
    pub timeout: Duration,
    /// Path, relative to the gateway origin, that receives the HEAD probe.
    pub probe_path: String,
    /// Maximum probes in flight. `None` probes every candidate at once.
    pub max_concurrency: Option<usize>,
}

impl Default for FastestPingConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PING_TIMEOUT,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            max_concurrency: None,
        }
    }
}

/// Why a single probe did not count as healthy.
#[derive(Debug)]
pub(crate) enum ProbeFailure {
    Timeout,
    Status(u16),
    Transport(String),
}

/// Sends one HEAD probe and returns its latency if it answered 2xx within `timeout`.
pub(crate) async fn probe(
    transport: &dyn HttpTransport,
    gateway: &Url,
    probe_path: &str,
    timeout: Duration,
) -> Result<Duration, ProbeFailure> {
    let target = format!(
        "{}/{}",
        gateway.origin().ascii_serialization(),
        probe_path.trim_start_matches('/')
    );
    let started = Instant::now();

    let response = tokio::time::timeout(
        timeout,
        transport.execute(HttpRequest::head(target).with_timeout(timeout)),
    )
    .await
    .map_err(|_| ProbeFailure::Timeout)?
    .map_err(|e| ProbeFailure::Transport(e.to_string()))?;

    if response.status.is_success() {
        Ok(started.elapsed())
    } else {
        Err(ProbeFailure::Status(response.status.as_u16()))
    }
}

/// Races HEAD probes against every candidate and selects the first healthy responder.
///
/// Probes complete in latency order, so the first 2xx is the lowest-latency healthy
/// gateway. Remaining probes are cancelled once a winner is known. Failures and
/// timeouts only remove their own gateway from the race.
pub struct FastestPingRoutingStrategy {
    transport: Arc<dyn HttpTransport>,
    config: FastestPingConfig,
    blocklist: Blocklist,
}

impl FastestPingRoutingStrategy {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_config(transport, FastestPingConfig::default())
    }

    #[must_use]
    pub fn with_config(transport: Arc<dyn HttpTransport>, config: FastestPingConfig) -> Self {
        Self { transport, config, blocklist: Blocklist::default() }
    }

    #[must_use]
    pub fn with_blocklist(mut self, blocklist: Blocklist) -> Self {
        self.blocklist = blocklist;
        self
    }
}

#[async_trait]
impl RoutingStrategy for FastestPingRoutingStrategy {
    async fn select_gateway(&self, gateways: &[Gateway]) -> Result<Url, RoutingError> {
        if gateways.is_empty() {
            return Err(RoutingError::NoGatewaysProvided);
        }

        let candidates: Vec<Url> =
            self.blocklist.eligible(gateways).into_iter().map(|g| g.url.clone()).collect();
        if candidates.is_empty() {
            return Err(RoutingError::NoGatewayFound { strategy: self.name() });
        }

        let attempted = candidates.len();
        let limit = self.config.max_concurrency.unwrap_or(attempted).max(1);
        let transport = self.transport.as_ref();
        let config = &self.config;

        let mut probes = stream::iter(candidates)
            .map(move |url| async move {
                let result = probe(transport, &url, &config.probe_path, config.timeout).await;
                (url, result)
            })
            .buffer_unordered(limit);

        while let Some((url, result)) = probes.next().await {
            match result {
                Ok(latency) => {
                    metrics::record_ping_latency(latency);
                    tracing::debug!(
                        gateway = %url,
                        latency_ms = latency.as_millis(),
                        "fastest gateway selected"
                    );
                    return Ok(url);
                }
                Err(failure) => {
                    tracing::debug!(gateway = %url, failure = ?failure, "ping probe failed");
                }
            }
        }

        Err(RoutingError::NoHealthyGateways { attempted })
    }

    fn name(&self) -> &'static str {
        "fastest-ping"
    }
}
