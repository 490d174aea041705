//! Integration tests for `ReqwestTransport` against a live mock server.

use crate::mock_infrastructure::{GatewayMock, TX_ID};
use bytes::Bytes;
use wayfinder_core::{
    errors::TransportError,
    http::{HttpRequest, HttpTransport, ReqwestTransport, ResponseBody, StatusCode, DIGEST_HEADER},
};

#[tokio::test]
async fn test_buffered_get_returns_body_and_headers() {
    let mut gateway = GatewayMock::new().await;
    gateway.mock_data(TX_ID, b"hello arweave", Some("digest-value"));

    let transport = ReqwestTransport::new().unwrap();
    let response =
        transport.execute(HttpRequest::get(format!("{}/{TX_ID}", gateway.url()))).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(DIGEST_HEADER), Some("digest-value"));
    assert_eq!(response.body.bytes().await.unwrap(), Bytes::from_static(b"hello arweave"));
}

#[tokio::test]
async fn test_streaming_get_yields_whole_body() {
    let body = vec![b'x'; 512 * 1024];
    let mut gateway = GatewayMock::new().await;
    gateway.mock_data(TX_ID, &body, None);

    let transport = ReqwestTransport::new().unwrap();
    let response = transport
        .execute(HttpRequest::get(format!("{}/{TX_ID}", gateway.url())).streaming())
        .await
        .unwrap();

    assert!(matches!(response.body, ResponseBody::Stream(_)));
    assert_eq!(response.body.bytes().await.unwrap().len(), body.len());
}

#[tokio::test]
async fn test_non_success_status_is_not_an_error() {
    let mut gateway = GatewayMock::new().await;
    gateway.mock_path("/missing", 404, "not found");

    let transport = ReqwestTransport::new().unwrap();
    let response =
        transport.execute(HttpRequest::get(format!("{}/missing", gateway.url()))).await.unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_head_has_no_body() {
    let mut gateway = GatewayMock::new().await;
    gateway.mock_digest(TX_ID, "abc");

    let transport = ReqwestTransport::new().unwrap();
    let response =
        transport.execute(HttpRequest::head(format!("{}/{TX_ID}", gateway.url()))).await.unwrap();

    assert_eq!(response.header(DIGEST_HEADER), Some("abc"));
    assert!(response.body.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_transient_and_sanitized() {
    let transport = ReqwestTransport::new().unwrap();
    let err = transport.execute(HttpRequest::get("http://127.0.0.1:1/secret-path")).await.unwrap_err();

    assert!(matches!(err, TransportError::ConnectionFailed(_) | TransportError::Timeout));
    assert!(err.is_transient());
    assert!(!err.to_string().contains("secret-path"));
}
