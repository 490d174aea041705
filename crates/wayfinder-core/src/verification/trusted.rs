use async_trait::async_trait;
use futures::future::join_all;
use std::{collections::BTreeSet, fmt, sync::Arc, time::Duration};
use url::Url;

use crate::{
    errors::VerificationError,
    http::{HttpRequest, HttpTransport, DIGEST_HEADER},
};

/// Default per-gateway timeout of a trusted lookup.
pub const DEFAULT_TRUSTED_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of agreeing trusted responses required.
pub const DEFAULT_MIN_TRUSTED_RESPONSES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-256, base64url encoded without padding.
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Digest agreed on by the trusted gateways for one transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedDigest {
    pub hash: String,
    pub algorithm: DigestAlgorithm,
}

/// Source of trusted content digests.
#[async_trait]
pub trait DataHashProvider: Send + Sync {
    async fn get_digest(&self, tx_id: &str) -> Result<TrustedDigest, VerificationError>;
}

/// Source of trusted Arweave data roots.
#[async_trait]
pub trait DataRootProvider: Send + Sync {
    async fn get_data_root(&self, tx_id: &str) -> Result<String, VerificationError>;
}

/// Gateways and limits shared by both trusted providers.
#[derive(Debug, Clone)]
pub struct TrustedGatewaysConfig {
    pub gateways: Vec<Url>,
    /// Per-gateway timeout. One slow gateway never delays the others past this.
    pub timeout: Duration,
    /// Agreeing responses required before a value is trusted.
    pub min_responses: usize,
}

impl TrustedGatewaysConfig {
    #[must_use]
    pub fn new(gateways: Vec<Url>) -> Self {
        Self {
            gateways,
            timeout: DEFAULT_TRUSTED_TIMEOUT,
            min_responses: DEFAULT_MIN_TRUSTED_RESPONSES,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_min_responses(mut self, min: usize) -> Self {
        self.min_responses = min.max(1);
        self
    }
}

/// Fetches one value from every trusted gateway concurrently and requires them to agree.
///
/// Gateways that fail, time out or omit the value are skipped. The returned value is
/// trusted only if every survivor reported it and at least `min_responses` survived.
async fn query_quorum<F, Fut>(
    config: &TrustedGatewaysConfig,
    tx_id: &str,
    kind: &'static str,
    fetch: F,
) -> Result<String, VerificationError>
where
    F: Fn(Url) -> Fut,
    Fut: std::future::Future<Output = Result<Option<String>, String>>,
{
    let lookups = config.gateways.iter().map(|gateway| {
        let lookup = fetch(gateway.clone());
        async move {
            let result = tokio::time::timeout(config.timeout, lookup).await;
            (gateway, result)
        }
    });

    let mut reports = Vec::new();
    for (gateway, result) in join_all(lookups).await {
        match result {
            Ok(Ok(Some(value))) => reports.push((gateway.to_string(), value)),
            Ok(Ok(None)) => {
                tracing::warn!(gateway = %gateway, tx_id = tx_id, kind = kind, "trusted gateway omitted value");
            }
            Ok(Err(error)) => {
                tracing::warn!(gateway = %gateway, tx_id = tx_id, kind = kind, error = %error, "trusted gateway lookup failed");
            }
            Err(_) => {
                tracing::warn!(
                    gateway = %gateway,
                    tx_id = tx_id,
                    kind = kind,
                    timeout_ms = config.timeout.as_millis(),
                    "trusted gateway lookup timed out"
                );
            }
        }
    }

    let Some((_, first)) = reports.first() else {
        return Err(VerificationError::NoTrustedSource { tx_id: tx_id.to_string() });
    };

    let distinct: BTreeSet<&str> = reports.iter().map(|(_, v)| v.as_str()).collect();
    if distinct.len() > 1 {
        return Err(VerificationError::InconsistentTrustedValues {
            tx_id: tx_id.to_string(),
            reports,
        });
    }

    if reports.len() < config.min_responses {
        return Err(VerificationError::InsufficientTrustedSources {
            tx_id: tx_id.to_string(),
            found: reports.len(),
            required: config.min_responses,
        });
    }

    tracing::debug!(tx_id = tx_id, kind = kind, responders = reports.len(), "trusted value agreed");
    Ok(first.clone())
}

fn join(gateway: &Url, path: &str) -> String {
    format!("{}/{path}", gateway.origin().ascii_serialization())
}

/// Reads `x-ar-io-digest` from `HEAD /<id>` on every trusted gateway.
pub struct TrustedGatewaysHashProvider {
    transport: Arc<dyn HttpTransport>,
    config: TrustedGatewaysConfig,
}

impl TrustedGatewaysHashProvider {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: TrustedGatewaysConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl DataHashProvider for TrustedGatewaysHashProvider {
    async fn get_digest(&self, tx_id: &str) -> Result<TrustedDigest, VerificationError> {
        let transport = self.transport.as_ref();
        let timeout = self.config.timeout;

        let hash = query_quorum(&self.config, tx_id, "digest", |gateway| async move {
            let request = HttpRequest::head(join(&gateway, tx_id)).with_timeout(timeout);
            let response = transport.execute(request).await.map_err(|e| e.to_string())?;
            if !response.status.is_success() {
                return Err(format!("status {}", response.status.as_u16()));
            }
            Ok(response.header(DIGEST_HEADER).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
        })
        .await?;

        Ok(TrustedDigest { hash, algorithm: DigestAlgorithm::Sha256 })
    }
}

/// Reads `GET /tx/<id>/data_root` from every trusted gateway.
pub struct TrustedGatewaysDataRootProvider {
    transport: Arc<dyn HttpTransport>,
    config: TrustedGatewaysConfig,
}

impl TrustedGatewaysDataRootProvider {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: TrustedGatewaysConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl DataRootProvider for TrustedGatewaysDataRootProvider {
    async fn get_data_root(&self, tx_id: &str) -> Result<String, VerificationError> {
        let transport = self.transport.as_ref();
        let timeout = self.config.timeout;

        query_quorum(&self.config, tx_id, "data_root", |gateway| async move {
            let request =
                HttpRequest::get(join(&gateway, &format!("tx/{tx_id}/data_root"))).with_timeout(timeout);
            let response = transport.execute(request).await.map_err(|e| e.to_string())?;
            if !response.status.is_success() {
                return Err(format!("status {}", response.status.as_u16()));
            }
            let body = response.body.bytes().await.map_err(|e| e.to_string())?;
            let root = String::from_utf8_lossy(&body).trim().to_string();
            Ok(Some(root).filter(|r| !r.is_empty()))
        })
        .await
    }
}
