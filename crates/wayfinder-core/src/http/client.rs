//! A drop-in HTTP client that understands `ar://` targets.

use bytes::Bytes;
use std::sync::Arc;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::{errors::WayfinderError, Wayfinder};

/// Wraps a transport so every request goes through a [`Wayfinder`] first.
///
/// Plain URLs are forwarded untouched; `ar://` targets are routed and, when configured,
/// verified.
pub struct WayfinderClient<T = Arc<dyn HttpTransport>> {
    wayfinder: Wayfinder,
    transport: T,
}

impl<T: HttpTransport> WayfinderClient<T> {
    #[must_use]
    pub fn new(wayfinder: Wayfinder, transport: T) -> Self {
        Self { wayfinder, transport }
    }

    #[must_use]
    pub fn wayfinder(&self) -> &Wayfinder {
        &self.wayfinder
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, WayfinderError> {
        self.wayfinder.execute_with(&self.transport, request).await
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn get(&self, target: impl Into<String>) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::get(target)).await
    }

    /// Like [`WayfinderClient::get`] but leaves the body as a stream.
    ///
    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn stream(&self, target: impl Into<String>) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::get(target).streaming()).await
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn head(&self, target: impl Into<String>) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::head(target)).await
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn post(
        &self,
        target: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::new(Method::POST, target).with_body(body)).await
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn put(
        &self,
        target: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::new(Method::PUT, target).with_body(body)).await
    }

    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn delete(&self, target: impl Into<String>) -> Result<HttpResponse, WayfinderError> {
        self.execute(HttpRequest::new(Method::DELETE, target)).await
    }
}
