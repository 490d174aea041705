//! HTTP adapter seam.
//!
//! Everything that talks to a gateway goes through [`HttpTransport`]: routing probes,
//! trusted providers and the intercepted caller requests. The concrete client is
//! swappable; [`ReqwestTransport`] is the default.

pub mod client;
pub mod reqwest_transport;

pub use client::WayfinderClient;
pub use reqwest_transport::{ReqwestTransport, TransportConfig};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::{fmt, pin::Pin, sync::Arc, time::Duration};
use url::Url;

use crate::errors::TransportError;

pub use reqwest::{header::HeaderMap, Method, StatusCode};

/// Response header carrying the base64url SHA-256 digest of the object.
pub const DIGEST_HEADER: &str = "x-ar-io-digest";

/// Response header carrying the transaction id a data request resolved to.
pub const DATA_ID_HEADER: &str = "x-ar-io-data-id";

/// Response header carrying the transaction id an `ArNS` name resolved to.
pub const ARNS_RESOLVED_ID_HEADER: &str = "x-arns-resolved-id";

/// Byte stream of a response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// How the transport should hand back the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// Read the whole body before returning.
    #[default]
    Buffered,
    /// Return as soon as headers arrive and stream the body.
    Streaming,
}

/// An outbound request. The target is a plain string so it can carry an `ar://`
/// reference until it is resolved.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub target: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
    pub mode: BodyMode,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            mode: BodyMode::Buffered,
        }
    }

    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn head(target: impl Into<String>) -> Self {
        Self::new(Method::HEAD, target)
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.mode = BodyMode::Streaming;
        self
    }

    /// Parses the target as a concrete URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the target is not a valid URL.
    pub fn url(&self) -> Result<Url, TransportError> {
        Url::parse(&self.target)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {e}", self.target)))
    }
}

/// Response body, either fully read or still streaming.
pub enum ResponseBody {
    Empty,
    Buffered(Bytes),
    Stream(ByteStream),
}

impl ResponseBody {
    /// Reads the body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first stream error encountered.
    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Buffered(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Converts the body into a stream regardless of how it was read.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        match self {
            Self::Empty => Box::pin(futures::stream::empty()),
            Self::Buffered(bytes) => Box::pin(futures::stream::once(async move { Ok(bytes) })),
            Self::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// A response as returned by a transport.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Final URL the response was served from.
    pub url: Url,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// An HTTP client the wayfinder can route through.
///
/// Implementations return non-2xx responses as `Ok`; only failures to obtain a
/// response at all are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` to its (already concrete) target.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.as_ref().execute(request).await
    }
}
