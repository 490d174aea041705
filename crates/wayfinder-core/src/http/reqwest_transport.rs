use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{BodyMode, HttpRequest, HttpResponse, HttpTransport, ResponseBody};
use crate::errors::TransportError;

/// Concurrency and timeout settings of [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum number of requests in flight, streaming bodies included.
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds.
    pub permit_timeout_ms: u64,
    pub connect_timeout: Duration,
    /// Request timeout applied when the request does not carry its own.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 256,
            permit_timeout_ms: 2_000,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("wayfinder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// [`HttpTransport`] backed by `reqwest` with semaphore-bounded concurrency.
///
/// Redirects are followed so that name subdomains which bounce to a sandbox host still
/// resolve. The final URL is reported on the response.
pub struct ReqwestTransport {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: TransportConfig,
}

/// Holds a concurrency permit for as long as the response (or its body stream) lives.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "transport permit released"
        );
    }
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(TransportConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: TransportConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(config.connect_timeout)
            .use_rustls_tls()
            .user_agent(config.user_agent.clone())
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                TransportError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Maps reqwest errors to messages that never echo URLs or addresses.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    fn map_error(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::ConnectionFailed(Self::sanitize_network_error(error))
        }
    }

    async fn acquire_permit(&self, target: &str) -> Result<PermitGuard, TransportError> {
        let permit = tokio::time::timeout(
            Duration::from_millis(self.config.permit_timeout_ms),
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                url = target,
                available_permits = self.concurrent_limit.available_permits(),
                "transport semaphore acquisition timeout"
            );
            TransportError::Timeout
        })?
        .map_err(|_| TransportError::ConcurrencyLimit(target.to_string()))?;

        Ok(PermitGuard::new(permit, Arc::clone(&self.concurrent_limit)))
    }

    #[cfg(test)]
    fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url()?;
        let guard = self.acquire_permit(url.as_str()).await?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers)
            .timeout(request.timeout.unwrap_or(self.config.request_timeout));
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        tracing::trace!(url = %final_url, status = status.as_u16(), "http response received");

        let body = match request.mode {
            BodyMode::Buffered => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::Body(Self::sanitize_network_error(&e)))?;
                drop(guard);
                if bytes.is_empty() {
                    ResponseBody::Empty
                } else {
                    ResponseBody::Buffered(bytes)
                }
            }
            BodyMode::Streaming => {
                let stream = response.bytes_stream().map(move |chunk| {
                    // The permit rides along with the stream until the consumer drops it.
                    let _held = &guard;
                    chunk.map_err(|e| TransportError::Body(Self::sanitize_network_error(&e)))
                });
                ResponseBody::Stream(Box::pin(stream))
            }
        };

        Ok(HttpResponse { status, headers, url: final_url, body })
    }
}
