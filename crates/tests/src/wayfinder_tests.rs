//! End-to-end tests: `ar://` reference in, routed response and verification event out.

use crate::mock_infrastructure::{data_root_of, digest_of, GatewayMock, TX_ID};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast::Receiver;
use wayfinder_core::{
    config::{RoutingStrategyKind, VerificationStrategyKind, WayfinderConfig},
    errors::VerificationError,
    http::{HttpRequest, HttpTransport, ReqwestTransport, StatusCode},
    routing::FixedRoutingStrategy,
    verification::{
        CompositeVerificationStrategy, DataRootVerificationStrategy, HashVerificationStrategy,
        TrustedGatewaysConfig, TrustedGatewaysDataRootProvider, TrustedGatewaysHashProvider,
        VerificationStrategy,
    },
    Wayfinder, WayfinderBuilder, WayfinderError, WayfinderEvent,
};

struct Network {
    data: GatewayMock,
    trusted: [GatewayMock; 2],
}

impl Network {
    async fn new() -> Self {
        Self {
            data: GatewayMock::new().await,
            trusted: [GatewayMock::new().await, GatewayMock::new().await],
        }
    }

    fn trusted_config(&self) -> TrustedGatewaysConfig {
        TrustedGatewaysConfig::new(self.trusted.iter().map(GatewayMock::gateway_url).collect())
            .with_timeout(Duration::from_secs(2))
    }

    fn wayfinder(&self, verification: Arc<dyn VerificationStrategy>, strict: bool) -> Wayfinder {
        Wayfinder::builder()
            .routing_strategy(Arc::new(FixedRoutingStrategy::new(self.data.gateway_url())))
            .http_client(transport())
            .verification_strategy(verification)
            .strict(strict)
            .build()
            .unwrap()
    }

    fn hash_strategy(&self) -> Arc<dyn VerificationStrategy> {
        Arc::new(HashVerificationStrategy::new(Arc::new(TrustedGatewaysHashProvider::new(
            transport(),
            self.trusted_config(),
        ))))
    }

    fn data_root_strategy(&self) -> Arc<dyn VerificationStrategy> {
        Arc::new(DataRootVerificationStrategy::new(Arc::new(TrustedGatewaysDataRootProvider::new(
            transport(),
            self.trusted_config(),
        ))))
    }
}

fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::new().unwrap())
}

async fn verification_event(events: &mut Receiver<WayfinderEvent>) -> WayfinderEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.name().starts_with("verification") {
                return event;
            }
        }
    })
    .await
    .expect("verification outcome")
}

#[tokio::test]
async fn test_verified_stream_end_to_end() {
    let body = vec![42_u8; 700 * 1024];
    let digest = digest_of(&body).await;

    let mut network = Network::new().await;
    network.data.mock_data(TX_ID, &body, Some(&digest));
    for trusted in &mut network.trusted {
        trusted.mock_digest(TX_ID, &digest);
    }

    let wayfinder = network.wayfinder(network.hash_strategy(), false);
    let mut events = wayfinder.subscribe();

    let response =
        wayfinder.request(HttpRequest::get(format!("ar://{TX_ID}")).streaming()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.url.as_str(), format!("{}/{TX_ID}", network.data.url()));
    assert_eq!(response.body.bytes().await.unwrap().len(), body.len());

    let event = verification_event(&mut events).await;
    assert!(matches!(event, WayfinderEvent::VerificationPassed { ref tx_id, .. } if tx_id == TX_ID));
}

#[tokio::test]
async fn test_tampered_data_reports_failure() {
    let trusted_digest = digest_of(b"original").await;

    let mut network = Network::new().await;
    network.data.mock_data(TX_ID, b"tampered", None);
    for trusted in &mut network.trusted {
        trusted.mock_digest(TX_ID, &trusted_digest);
    }

    let wayfinder = network.wayfinder(network.hash_strategy(), false);
    let mut events = wayfinder.subscribe();

    let response = wayfinder.request(HttpRequest::get(format!("ar://{TX_ID}"))).await.unwrap();
    assert_eq!(response.body.bytes().await.unwrap().as_ref(), b"tampered");

    let WayfinderEvent::VerificationFailed { trusted_hash, computed_hash, .. } =
        verification_event(&mut events).await
    else {
        panic!("expected verification failure");
    };
    assert_eq!(trusted_hash, Some(trusted_digest));
    assert_eq!(computed_hash, Some(digest_of(b"tampered").await));
}

#[tokio::test]
async fn test_strict_mode_rejects_tampered_data() {
    let mut network = Network::new().await;
    network.data.mock_data(TX_ID, b"tampered", None);
    for trusted in &mut network.trusted {
        trusted.mock_digest(TX_ID, &digest_of(b"original").await);
    }

    let wayfinder = network.wayfinder(network.hash_strategy(), true);
    let err = wayfinder.request(HttpRequest::get(format!("ar://{TX_ID}"))).await.unwrap_err();

    assert!(matches!(err, WayfinderError::Verification(VerificationError::Mismatch { .. })));
}

#[tokio::test]
async fn test_composite_verification_over_stream() {
    let body: Vec<u8> = (0..600 * 1024).map(|i| (i % 251) as u8).collect();
    let digest = digest_of(&body).await;
    let root = data_root_of(&body).await;

    let mut network = Network::new().await;
    network.data.mock_data(TX_ID, &body, None);
    for trusted in &mut network.trusted {
        trusted.mock_digest(TX_ID, &digest);
        trusted.mock_data_root(TX_ID, &root);
    }

    let composite = CompositeVerificationStrategy::new(vec![
        network.hash_strategy(),
        network.data_root_strategy(),
    ])
    .unwrap();
    let wayfinder = network.wayfinder(Arc::new(composite), false);
    let mut events = wayfinder.subscribe();

    let response =
        wayfinder.request(HttpRequest::get(format!("ar://{TX_ID}")).streaming()).await.unwrap();
    assert_eq!(response.body.bytes().await.unwrap().as_ref(), body.as_slice());

    let event = verification_event(&mut events).await;
    assert!(
        matches!(event, WayfinderEvent::VerificationPassed { ref strategy, .. } if strategy == "composite"),
        "{event:?}"
    );
}

#[tokio::test]
async fn test_root_relative_reference_is_not_verified() {
    let mut network = Network::new().await;
    network.data.mock_path("/info", 200, r#"{"network":"arweave.N.1"}"#);

    let wayfinder = network.wayfinder(network.hash_strategy(), false);
    let mut events = wayfinder.subscribe();

    let response = wayfinder.request(HttpRequest::get("ar:///info")).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);

    assert!(matches!(
        verification_event(&mut events).await,
        WayfinderEvent::VerificationSkipped { .. }
    ));
}

#[tokio::test]
async fn test_from_config_end_to_end() {
    let body = b"configured";
    let digest = digest_of(body).await;

    let mut network = Network::new().await;
    network.data.mock_data(TX_ID, body, None);
    for trusted in &mut network.trusted {
        trusted.mock_digest(TX_ID, &digest);
    }

    let mut config = WayfinderConfig::default();
    config.gateways.urls = vec![network.data.url()];
    config.routing.strategy = RoutingStrategyKind::Fixed;
    config.routing.fixed_gateway = Some(network.data.url());
    config.verification.enabled = true;
    config.verification.strategies = vec![VerificationStrategyKind::Hash];
    config.verification.trusted_gateways = network.trusted.iter().map(GatewayMock::url).collect();
    config.verification.strict = true;

    let wayfinder = WayfinderBuilder::from_config(&config).unwrap().build().unwrap();
    let response = wayfinder.request(HttpRequest::get(format!("ar://{TX_ID}"))).await.unwrap();

    assert_eq!(response.body.bytes().await.unwrap().as_ref(), body);
}
