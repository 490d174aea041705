//! Integration tests for trusted digest and data root providers.
//!
//! Each trusted gateway is an independent mockito server, so agreement, disagreement
//! and silence are exercised over real HTTP.

use crate::mock_infrastructure::{data_root_of, digest_of, GatewayMock, TX_ID};
use std::{sync::Arc, time::Duration};
use url::Url;
use wayfinder_core::{
    errors::VerificationError,
    http::{HttpTransport, ReqwestTransport},
    verification::{
        DataHashProvider, DataRootProvider, TrustedGatewaysConfig, TrustedGatewaysDataRootProvider,
        TrustedGatewaysHashProvider,
    },
};

fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::new().unwrap())
}

fn config(gateways: &[&GatewayMock]) -> TrustedGatewaysConfig {
    TrustedGatewaysConfig::new(gateways.iter().map(|g| g.gateway_url()).collect())
        .with_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_digest_agreed_by_all_trusted_gateways() {
    let digest = digest_of(b"payload").await;
    let mut a = GatewayMock::new().await;
    let mut b = GatewayMock::new().await;
    a.mock_digest(TX_ID, &digest);
    b.mock_digest(TX_ID, &digest);

    let provider = TrustedGatewaysHashProvider::new(transport(), config(&[&a, &b]));
    let trusted = provider.get_digest(TX_ID).await.unwrap();

    assert_eq!(trusted.hash, digest);
}

#[tokio::test]
async fn test_digest_disagreement_is_reported_per_gateway() {
    let mut a = GatewayMock::new().await;
    let mut b = GatewayMock::new().await;
    a.mock_digest(TX_ID, "digest-a");
    b.mock_digest(TX_ID, "digest-b");

    let provider = TrustedGatewaysHashProvider::new(transport(), config(&[&a, &b]));
    let err = provider.get_digest(TX_ID).await.unwrap_err();

    let VerificationError::InconsistentTrustedValues { reports, .. } = &err else {
        panic!("expected inconsistent values, got {err:?}");
    };
    let mut values: Vec<_> = reports.iter().map(|(_, v)| v.as_str()).collect();
    values.sort_unstable();
    assert_eq!(values, ["digest-a", "digest-b"]);
}

#[tokio::test]
async fn test_single_survivor_is_insufficient_by_default() {
    let mut a = GatewayMock::new().await;
    a.mock_digest(TX_ID, "digest");
    let silent = GatewayMock::new().await;

    let provider = TrustedGatewaysHashProvider::new(transport(), config(&[&a, &silent]));
    let err = provider.get_digest(TX_ID).await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::InsufficientTrustedSources { found: 1, required: 2, .. }
    ));
}

#[tokio::test]
async fn test_single_survivor_accepted_when_minimum_is_one() {
    let mut a = GatewayMock::new().await;
    a.mock_digest(TX_ID, "digest");
    let unreachable = Url::parse("http://127.0.0.1:1").unwrap();

    let config = TrustedGatewaysConfig::new(vec![a.gateway_url(), unreachable])
        .with_timeout(Duration::from_secs(2))
        .with_min_responses(1);
    let provider = TrustedGatewaysHashProvider::new(transport(), config);

    assert_eq!(provider.get_digest(TX_ID).await.unwrap().hash, "digest");
}

#[tokio::test]
async fn test_no_trusted_source() {
    let silent = GatewayMock::new().await;
    let provider = TrustedGatewaysHashProvider::new(transport(), config(&[&silent]));

    assert!(matches!(
        provider.get_digest(TX_ID).await,
        Err(VerificationError::NoTrustedSource { .. })
    ));
}

#[tokio::test]
async fn test_data_root_agreed() {
    let root = data_root_of(&[9_u8; 300 * 1024]).await;
    let mut a = GatewayMock::new().await;
    let mut b = GatewayMock::new().await;
    a.mock_data_root(TX_ID, &format!("{root}\n"));
    b.mock_data_root(TX_ID, &root);

    let provider = TrustedGatewaysDataRootProvider::new(transport(), config(&[&a, &b]));
    assert_eq!(provider.get_data_root(TX_ID).await.unwrap(), root);
}
