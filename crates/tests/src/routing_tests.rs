//! Integration tests for probing routing strategies over real HTTP.

use crate::mock_infrastructure::GatewayMock;
use std::{sync::Arc, time::Duration};
use wayfinder_core::{
    errors::RoutingError,
    http::{HttpTransport, ReqwestTransport},
    routing::{
        FastestPingConfig, FastestPingRoutingStrategy, FixedRoutingStrategy,
        PreferredWithFallbackRoutingStrategy, RoutingStrategy,
    },
    types::Gateway,
};

fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::new().unwrap())
}

fn ping(transport: Arc<dyn HttpTransport>) -> FastestPingRoutingStrategy {
    FastestPingRoutingStrategy::with_config(
        transport,
        FastestPingConfig { timeout: Duration::from_secs(2), ..FastestPingConfig::default() },
    )
}

#[tokio::test]
async fn test_fastest_ping_skips_unhealthy_gateway() {
    let mut unhealthy = GatewayMock::new().await;
    let mut healthy = GatewayMock::new().await;
    unhealthy.mock_probe(404);
    healthy.mock_probe(200);

    let gateways = vec![Gateway::new(unhealthy.gateway_url()), Gateway::new(healthy.gateway_url())];
    let selected = ping(transport()).select_gateway(&gateways).await.unwrap();

    assert_eq!(selected, healthy.gateway_url());
}

#[tokio::test]
async fn test_fastest_ping_with_no_healthy_gateway() {
    let mut a = GatewayMock::new().await;
    let mut b = GatewayMock::new().await;
    a.mock_probe(500);
    b.mock_probe(503);

    let gateways = vec![Gateway::new(a.gateway_url()), Gateway::new(b.gateway_url())];
    let err = ping(transport()).select_gateway(&gateways).await.unwrap_err();

    assert!(matches!(err, RoutingError::NoHealthyGateways { attempted: 2 }));
}

#[tokio::test]
async fn test_preferred_gateway_falls_back_when_unhealthy() {
    let mut preferred = GatewayMock::new().await;
    let fallback = GatewayMock::new().await;
    preferred.mock_probe(503);

    let strategy = PreferredWithFallbackRoutingStrategy::with_fallback(
        &preferred.url(),
        transport(),
        Arc::new(FixedRoutingStrategy::new(fallback.gateway_url())),
    )
    .unwrap();

    assert_eq!(strategy.select_gateway(&[]).await.unwrap(), fallback.gateway_url());

    let mut healthy = GatewayMock::new().await;
    healthy.mock_probe(200);
    let strategy = PreferredWithFallbackRoutingStrategy::with_fallback(
        &healthy.url(),
        transport(),
        Arc::new(FixedRoutingStrategy::new(fallback.gateway_url())),
    )
    .unwrap();

    assert_eq!(strategy.select_gateway(&[]).await.unwrap(), healthy.gateway_url());
}
