use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use url::Url;

use super::{
    fastest_ping::{probe, DEFAULT_PROBE_PATH},
    FastestPingRoutingStrategy, RoutingStrategy,
};
use crate::{
    errors::RoutingError,
    http::HttpTransport,
    types::{parse_gateway_url, Gateway},
};

/// Default timeout of the preferred gateway probe.
pub const DEFAULT_PREFERRED_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Uses one preferred gateway while it answers, otherwise delegates to a fallback.
pub struct PreferredWithFallbackRoutingStrategy {
    preferred: Url,
    transport: Arc<dyn HttpTransport>,
    fallback: Arc<dyn RoutingStrategy>,
    timeout: Duration,
    probe_path: String,
}

impl PreferredWithFallbackRoutingStrategy {
    /// Creates the strategy with a [`FastestPingRoutingStrategy`] fallback.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfiguration`] if `preferred` is not an http(s)
    /// URL with a host.
    pub fn new(preferred: &str, transport: Arc<dyn HttpTransport>) -> Result<Self, RoutingError> {
        let fallback = Arc::new(FastestPingRoutingStrategy::new(transport.clone()));
        Self::with_fallback(preferred, transport, fallback)
    }

    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfiguration`] if `preferred` is not an http(s)
    /// URL with a host.
    pub fn with_fallback(
        preferred: &str,
        transport: Arc<dyn HttpTransport>,
        fallback: Arc<dyn RoutingStrategy>,
    ) -> Result<Self, RoutingError> {
        let preferred = parse_gateway_url(preferred)
            .map_err(|e| RoutingError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            preferred,
            transport,
            fallback,
            timeout: DEFAULT_PREFERRED_TIMEOUT,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = path.into();
        self
    }
}

#[async_trait]
impl RoutingStrategy for PreferredWithFallbackRoutingStrategy {
    async fn select_gateway(&self, gateways: &[Gateway]) -> Result<Url, RoutingError> {
        match probe(self.transport.as_ref(), &self.preferred, &self.probe_path, self.timeout).await {
            Ok(_) => Ok(self.preferred.clone()),
            Err(failure) => {
                tracing::debug!(
                    preferred = %self.preferred,
                    failure = ?failure,
                    fallback = self.fallback.name(),
                    "preferred gateway unavailable, using fallback"
                );
                self.fallback.select_gateway(gateways).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "preferred-with-fallback"
    }
}
