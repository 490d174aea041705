//! Builder for assembling a [`Wayfinder`] from components or from configuration.

use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;

use super::{Inner, Wayfinder};
use crate::{
    config::{RoutingStrategyKind, VerificationStrategyKind, WayfinderConfig},
    errors::WayfinderError,
    events::{EventEmitter, DEFAULT_EVENT_CAPACITY},
    gateways::{CachedGatewaysProvider, GatewaysProvider, StaticGatewaysProvider},
    http::{HttpTransport, ReqwestTransport, TransportConfig},
    routing::{
        Blocklist, FastestPingConfig, FastestPingRoutingStrategy, FixedRoutingStrategy,
        PreferredWithFallbackRoutingStrategy, PriorityRoutingStrategy, RandomRoutingStrategy,
        RoundRobinRoutingStrategy, RoutingStrategy,
    },
    types::parse_gateway_url,
    verification::{
        composite::DEFAULT_LAG_TIMEOUT, CompositeVerificationStrategy, DataHashProvider,
        DataRootVerificationStrategy, HashVerificationStrategy, TrustedGatewaysConfig,
        TrustedGatewaysDataRootProvider, TrustedGatewaysHashProvider, VerificationStrategy,
    },
};

/// Gateway used when no provider is configured.
pub const DEFAULT_GATEWAY: &str = "https://arweave.net";

/// Builder for [`Wayfinder`].
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use wayfinder_core::{gateways::StaticGatewaysProvider, routing::RandomRoutingStrategy, Wayfinder};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let wayfinder = Wayfinder::builder()
///     .gateways_provider(Arc::new(StaticGatewaysProvider::from_urls(["https://arweave.net"])?))
///     .routing_strategy(Arc::new(RandomRoutingStrategy::new()))
///     .build()?;
///
/// let url = wayfinder.resolve_url("ar://ardrive").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct WayfinderBuilder {
    gateways_provider: Option<Arc<dyn GatewaysProvider>>,
    routing_strategy: Option<Arc<dyn RoutingStrategy>>,
    verification_strategy: Option<Arc<dyn VerificationStrategy>>,
    trusted_hash_provider: Option<Arc<dyn DataHashProvider>>,
    http_client: Option<Arc<dyn HttpTransport>>,
    strict: bool,
    lag_timeout: Option<Duration>,
    event_capacity: Option<usize>,
}

impl WayfinderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gateways_provider(mut self, provider: Arc<dyn GatewaysProvider>) -> Self {
        self.gateways_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn routing_strategy(mut self, strategy: Arc<dyn RoutingStrategy>) -> Self {
        self.routing_strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn verification_strategy(mut self, strategy: Arc<dyn VerificationStrategy>) -> Self {
        self.verification_strategy = Some(strategy);
        self
    }

    /// Enables digest verification against `provider` unless a verification strategy is
    /// set explicitly.
    #[must_use]
    pub fn trusted_hash_provider(mut self, provider: Arc<dyn DataHashProvider>) -> Self {
        self.trusted_hash_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn http_client(mut self, client: Arc<dyn HttpTransport>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Awaits verification before returning responses and fails them on error.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// How long the background verifier may stall a streamed body before it is dropped.
    #[must_use]
    pub fn lag_timeout(mut self, timeout: Duration) -> Self {
        self.lag_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Builds a wayfinder from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WayfinderError::Config`] if validation fails, and transport or routing
    /// errors if a component cannot be constructed.
    pub fn from_config(config: &WayfinderConfig) -> Result<Self, WayfinderError> {
        config.validate().map_err(WayfinderError::Config)?;

        let http: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::with_config(TransportConfig {
            concurrent_limit: config.http.concurrent_limit,
            permit_timeout_ms: config.http.permit_timeout_ms,
            connect_timeout: Duration::from_secs(config.http.connect_timeout_seconds),
            request_timeout: Duration::from_secs(config.http.request_timeout_seconds),
            ..TransportConfig::default()
        })?);

        let mut provider: Arc<dyn GatewaysProvider> =
            Arc::new(StaticGatewaysProvider::from_urls(&config.gateways.urls)?);
        if config.gateways.cache_ttl_seconds > 0 {
            provider = Arc::new(CachedGatewaysProvider::new(
                provider,
                Duration::from_secs(config.gateways.cache_ttl_seconds),
            ));
        }

        let routing = routing_from_config(config, &http)?;

        let mut builder = Self::new()
            .gateways_provider(provider)
            .routing_strategy(routing)
            .http_client(http.clone())
            .strict(config.verification.strict)
            .lag_timeout(config.verification.lag_timeout());

        if config.verification.enabled {
            builder = builder.verification_strategy(verification_from_config(config, &http)?);
        }

        debug!(
            routing = ?config.routing.strategy,
            verification = config.verification.enabled,
            strict = config.verification.strict,
            "wayfinder configured"
        );
        Ok(builder)
    }

    /// # Errors
    ///
    /// Returns a transport error if the default HTTP client cannot be built.
    pub fn build(self) -> Result<Wayfinder, WayfinderError> {
        let http_client: Arc<dyn HttpTransport> = match self.http_client {
            Some(client) => client,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let gateways_provider = match self.gateways_provider {
            Some(provider) => provider,
            None => Arc::new(StaticGatewaysProvider::from_urls([DEFAULT_GATEWAY])?),
        };

        let routing_strategy = self
            .routing_strategy
            .unwrap_or_else(|| Arc::new(FastestPingRoutingStrategy::new(http_client.clone())));

        let verification_strategy = self.verification_strategy.or_else(|| {
            self.trusted_hash_provider.map(|provider| {
                Arc::new(HashVerificationStrategy::new(provider)) as Arc<dyn VerificationStrategy>
            })
        });

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Wayfinder {
            inner: Arc::new(Inner {
                gateways_provider,
                routing_strategy,
                verification_strategy,
                http_client,
                strict: self.strict,
                lag_timeout: self.lag_timeout.unwrap_or(DEFAULT_LAG_TIMEOUT),
                events: EventEmitter::new(self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)),
                shutdown_tx,
                shutdown_initiated: std::sync::atomic::AtomicBool::new(false),
            }),
        })
    }
}

fn parse(raw: &str) -> Result<Url, WayfinderError> {
    Ok(parse_gateway_url(raw)?)
}

fn routing_from_config(
    config: &WayfinderConfig,
    http: &Arc<dyn HttpTransport>,
) -> Result<Arc<dyn RoutingStrategy>, WayfinderError> {
    let routing = &config.routing;
    let blocklist = Blocklist::new(config.gateways.blocklist.iter().cloned());
    let ping = || {
        Arc::new(
            FastestPingRoutingStrategy::with_config(
                http.clone(),
                FastestPingConfig {
                    timeout: routing.ping_timeout(),
                    probe_path: routing.probe_path.clone(),
                    max_concurrency: routing.max_concurrency,
                },
            )
            .with_blocklist(blocklist.clone()),
        )
    };

    let missing = |field: &str| WayfinderError::Config(format!("routing.{field} is required"));

    let strategy: Arc<dyn RoutingStrategy> = match routing.strategy {
        RoutingStrategyKind::Fixed => {
            let gateway = routing.fixed_gateway.as_deref().ok_or_else(|| missing("fixed_gateway"))?;
            Arc::new(FixedRoutingStrategy::new(parse(gateway)?))
        }
        RoutingStrategyKind::Random => {
            Arc::new(RandomRoutingStrategy::new().with_blocklist(blocklist.clone()))
        }
        RoutingStrategyKind::Priority => Arc::new(
            PriorityRoutingStrategy::new(routing.sort_by, routing.sort_order, routing.limit)
                .with_blocklist(blocklist.clone()),
        ),
        RoutingStrategyKind::RoundRobin => {
            let urls =
                config.gateways.urls.iter().map(|u| parse(u)).collect::<Result<Vec<_>, _>>()?;
            Arc::new(RoundRobinRoutingStrategy::new(urls)?)
        }
        RoutingStrategyKind::FastestPing => ping(),
        RoutingStrategyKind::Preferred => {
            let preferred =
                routing.preferred_gateway.as_deref().ok_or_else(|| missing("preferred_gateway"))?;
            Arc::new(
                PreferredWithFallbackRoutingStrategy::with_fallback(preferred, http.clone(), ping())?
                    .with_timeout(routing.ping_timeout())
                    .with_probe_path(routing.probe_path.clone()),
            )
        }
    };

    Ok(strategy)
}

fn verification_from_config(
    config: &WayfinderConfig,
    http: &Arc<dyn HttpTransport>,
) -> Result<Arc<dyn VerificationStrategy>, WayfinderError> {
    let verification = &config.verification;
    let trusted = TrustedGatewaysConfig::new(
        verification.trusted_gateways.iter().map(|u| parse(u)).collect::<Result<Vec<_>, _>>()?,
    )
    .with_timeout(verification.timeout())
    .with_min_responses(verification.min_trusted_responses);

    let mut strategies: Vec<Arc<dyn VerificationStrategy>> = verification
        .strategies
        .iter()
        .map(|kind| -> Arc<dyn VerificationStrategy> {
            match kind {
                VerificationStrategyKind::Hash => Arc::new(HashVerificationStrategy::new(Arc::new(
                    TrustedGatewaysHashProvider::new(http.clone(), trusted.clone()),
                ))),
                VerificationStrategyKind::DataRoot => {
                    Arc::new(DataRootVerificationStrategy::new(Arc::new(
                        TrustedGatewaysDataRootProvider::new(http.clone(), trusted.clone()),
                    )))
                }
            }
        })
        .collect();

    if strategies.len() == 1 {
        if let Some(single) = strategies.pop() {
            return Ok(single);
        }
    }

    Ok(Arc::new(
        CompositeVerificationStrategy::new(strategies)?.with_lag_timeout(verification.lag_timeout()),
    ))
}
