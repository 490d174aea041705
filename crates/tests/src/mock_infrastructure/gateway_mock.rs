//! Gateway mock builder.
//!
//! Wraps mockito to serve the endpoints the wayfinder talks to: `/<id>` data,
//! `HEAD /<id>` digests, `/tx/<id>/data_root` and the routing probe path.

use bytes::Bytes;
use mockito::{Mock, Server, ServerGuard};
use url::Url;
use wayfinder_core::{
    http::DIGEST_HEADER,
    verification::{
        data_root::compute_data_root, digest::compute_digest, DigestAlgorithm, VerificationData,
    },
};

/// A well-formed transaction id for tests.
pub const TX_ID: &str = "c7wkwt6TKgcWJUfgvpJ5q5qi4DIZyJ1_TqhjXgURh0U";

/// SHA-256 digest of `body` as a gateway reports it in `x-ar-io-digest`.
pub async fn digest_of(body: &[u8]) -> String {
    let data = VerificationData::Buffer(Bytes::copy_from_slice(body));
    match compute_digest(data, DigestAlgorithm::Sha256).await {
        Ok(digest) => digest,
        Err(e) => panic!("digest of an in-memory buffer failed: {e}"),
    }
}

/// Arweave data root of `body`.
pub async fn data_root_of(body: &[u8]) -> String {
    match compute_data_root(VerificationData::Buffer(Bytes::copy_from_slice(body))).await {
        Ok(root) => root,
        Err(e) => panic!("data root of an in-memory buffer failed: {e}"),
    }
}

/// A mockito server posing as an AR.IO gateway.
pub struct GatewayMock {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl GatewayMock {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// The server URL parsed as a gateway.
    #[must_use]
    pub fn gateway_url(&self) -> Url {
        match Url::parse(&self.server.url()) {
            Ok(url) => url,
            Err(e) => panic!("mockito returned an invalid url: {e}"),
        }
    }

    /// Serves `body` on `GET /<id>` and, when `digest` is set, reports it on both
    /// `GET` and `HEAD`.
    pub fn mock_data(&mut self, tx_id: &str, body: &[u8], digest: Option<&str>) -> &mut Self {
        let path = format!("/{tx_id}");

        let mut get = self.server.mock("GET", path.as_str()).with_status(200).with_body(body);
        let mut head = self.server.mock("HEAD", path.as_str()).with_status(200);
        if let Some(digest) = digest {
            get = get.with_header(DIGEST_HEADER, digest);
            head = head.with_header(DIGEST_HEADER, digest);
        }

        self.mocks.push(get.create());
        self.mocks.push(head.create());
        self
    }

    /// Reports `digest` on `HEAD /<id>` only, as a trusted gateway.
    pub fn mock_digest(&mut self, tx_id: &str, digest: &str) -> &mut Self {
        let mock = self
            .server
            .mock("HEAD", format!("/{tx_id}").as_str())
            .with_status(200)
            .with_header(DIGEST_HEADER, digest)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Serves `root` on `GET /tx/<id>/data_root`.
    pub fn mock_data_root(&mut self, tx_id: &str, root: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/tx/{tx_id}/data_root").as_str())
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body(root)
            .create();
        self.mocks.push(mock);
        self
    }

    /// Answers the routing probe (`HEAD /ar-io/info`) with `status`.
    pub fn mock_probe(&mut self, status: usize) -> &mut Self {
        let mock = self.server.mock("HEAD", "/ar-io/info").with_status(status).create();
        self.mocks.push(mock);
        self
    }

    /// Serves `body` with `status` on `GET <path>`.
    pub fn mock_path(&mut self, path: &str, status: usize, body: &str) -> &mut Self {
        let mock = self.server.mock("GET", path).with_status(status).with_body(body).create();
        self.mocks.push(mock);
        self
    }
}
