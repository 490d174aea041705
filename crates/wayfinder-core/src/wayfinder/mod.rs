//! The wayfinder: reference resolution, request interception and background
//! verification.
//!
//! # Request pipeline
//!
//! ```text
//! target ──parse──► not ar:// ─────────────────────────────► transport (untouched)
//!            │
//!            └──► ar:// ─► gateways provider ─► routing strategy ─► resolved URL
//!                                                                      │
//!                    response ◄──────────────── transport ◄────────────┘
//!                       │
//!                       ├─ strict:     buffer, verify, fail the request on error
//!                       └─ non-strict: tee the body, verify on a detached task
//! ```
//!
//! Verification outcomes are published as [`WayfinderEvent`]s.

pub mod builder;

pub use builder::WayfinderBuilder;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    errors::{VerificationError, WayfinderError},
    events::{EventEmitter, RequestContext, WayfinderEvent},
    gateways::GatewaysProvider,
    http::{
        HttpRequest, HttpResponse, HttpTransport, Method, ResponseBody, ARNS_RESOLVED_ID_HEADER,
        DATA_ID_HEADER,
    },
    metrics::{self, VerificationOutcome},
    reference::Reference,
    routing::RoutingStrategy,
    verification::{
        fanout::{FanOut, DEFAULT_FANOUT_CAPACITY},
        VerificationData, VerificationStrategy,
    },
};

struct Inner {
    gateways_provider: Arc<dyn GatewaysProvider>,
    routing_strategy: Arc<dyn RoutingStrategy>,
    verification_strategy: Option<Arc<dyn VerificationStrategy>>,
    http_client: Arc<dyn HttpTransport>,
    strict: bool,
    lag_timeout: Duration,
    events: EventEmitter,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_initiated: AtomicBool,
}

/// Resolves `ar://` references and proxies requests through the selected gateway.
///
/// Cheap to clone; clones share strategies, events and shutdown state.
#[derive(Clone)]
pub struct Wayfinder {
    inner: Arc<Inner>,
}

/// Outcome of resolving one target.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The URL to send the request to. Equal to the input for non-`ar://` targets.
    pub target: String,
    /// The parsed reference, if the input was an `ar://` reference.
    pub reference: Option<Reference>,
    /// Selected gateway, if routing took place.
    pub gateway: Option<Url>,
}

impl Wayfinder {
    #[must_use]
    pub fn builder() -> WayfinderBuilder {
        WayfinderBuilder::new()
    }

    /// Subscribes to routing and verification events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WayfinderEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.inner.strict
    }

    #[must_use]
    pub fn verification_enabled(&self) -> bool {
        self.inner.verification_strategy.is_some()
    }

    /// Fetches candidates and runs the routing strategy once.
    ///
    /// # Errors
    ///
    /// Returns the provider or strategy error. Nothing is retried.
    pub async fn select_gateway(&self) -> Result<Url, WayfinderError> {
        let strategy = self.inner.routing_strategy.name();
        let result = self.select_from_provider().await;

        match &result {
            Ok(gateway) => {
                metrics::record_gateway_selection(strategy);
                debug!(strategy = strategy, gateway = %gateway, "gateway selected");
            }
            Err(e) => {
                metrics::record_routing_error(strategy);
                warn!(strategy = strategy, error = %e, "gateway selection failed");
            }
        }
        result
    }

    async fn select_from_provider(&self) -> Result<Url, WayfinderError> {
        let gateways = self.inner.gateways_provider.get_gateways().await?;
        Ok(self.inner.routing_strategy.select_gateway(&gateways).await?)
    }

    /// Resolves `target` to a concrete URL. Non-`ar://` inputs are returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`WayfinderError::Reference`] for malformed `ar://` input, before any network call
    /// - routing and provider errors from gateway selection
    pub async fn resolve_url(&self, target: &str) -> Result<String, WayfinderError> {
        Ok(self.resolve(target).await?.target)
    }

    /// Like [`Wayfinder::resolve_url`], also returning the parsed reference and gateway.
    ///
    /// # Errors
    ///
    /// Same as [`Wayfinder::resolve_url`].
    pub async fn resolve(&self, target: &str) -> Result<Resolution, WayfinderError> {
        let mut context = RequestContext::new(target);
        self.resolve_in_context(target, &mut context).await
    }

    async fn resolve_in_context(
        &self,
        target: &str,
        context: &mut RequestContext,
    ) -> Result<Resolution, WayfinderError> {
        let Some(reference) = Reference::parse(target)? else {
            return Ok(Resolution { target: target.to_string(), reference: None, gateway: None });
        };

        let gateway = match self.select_gateway().await {
            Ok(gateway) => gateway,
            Err(e) => {
                self.inner.events.emit(WayfinderEvent::RoutingFailed {
                    context: context.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let url = reference.to_url(&gateway)?;
        context.redirect_url = Some(url.clone());
        self.inner.events.emit(WayfinderEvent::RoutingSucceeded {
            context: context.clone(),
            strategy: self.inner.routing_strategy.name(),
        });

        debug!(reference = %reference, resolved = %url, "reference resolved");
        Ok(Resolution { target: url.to_string(), reference: Some(reference), gateway: Some(gateway) })
    }

    /// Sends `request` through the configured HTTP client.
    ///
    /// # Errors
    ///
    /// See [`Wayfinder::execute_with`].
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, WayfinderError> {
        self.execute_with(self.inner.http_client.as_ref(), request).await
    }

    /// Resolves the request target and forwards it through `transport`.
    ///
    /// Method, headers and body are passed through untouched. Only `ar://` requests are
    /// verified.
    ///
    /// # Errors
    ///
    /// - reference and routing errors, before the request is sent
    /// - transport errors from `transport`
    /// - [`WayfinderError::Verification`] in strict mode
    pub async fn execute_with(
        &self,
        transport: &dyn HttpTransport,
        mut request: HttpRequest,
    ) -> Result<HttpResponse, WayfinderError> {
        let mut context = RequestContext::new(request.target.clone());
        let resolution = self.resolve_in_context(&request.target, &mut context).await?;
        request.target = resolution.target;

        let method = request.method.clone();
        let response = transport.execute(request).await?;

        match (&resolution.reference, &self.inner.verification_strategy) {
            (Some(reference), Some(strategy)) if method != Method::HEAD => {
                self.verify_response(context, reference, strategy.clone(), response).await
            }
            _ => Ok(response),
        }
    }

    async fn verify_response(
        &self,
        context: RequestContext,
        reference: &Reference,
        strategy: Arc<dyn VerificationStrategy>,
        mut response: HttpResponse,
    ) -> Result<HttpResponse, WayfinderError> {
        if !response.status.is_success() {
            self.skip(context, format!("status {}", response.status.as_u16()));
            return Ok(response);
        }

        let Some(tx_id) = identify_transaction(reference, &response) else {
            self.skip(context, "no transaction id could be identified".to_string());
            return Ok(response);
        };

        if self.inner.strict {
            let bytes = std::mem::replace(&mut response.body, ResponseBody::Empty).bytes().await?;
            let result = strategy.verify_data(VerificationData::Buffer(bytes.clone()), &tx_id).await;
            self.report(context, &tx_id, strategy.name(), &result);
            result?;
            response.body = ResponseBody::Buffered(bytes);
            return Ok(response);
        }

        if self.inner.shutdown_initiated.load(Ordering::Acquire) {
            self.skip(context, "wayfinder is shutting down".to_string());
            return Ok(response);
        }

        let data = match std::mem::replace(&mut response.body, ResponseBody::Empty) {
            ResponseBody::Empty => VerificationData::Buffer(bytes::Bytes::new()),
            ResponseBody::Buffered(bytes) => {
                response.body = ResponseBody::Buffered(bytes.clone());
                VerificationData::Buffer(bytes)
            }
            ResponseBody::Stream(stream) => {
                let mut fanout = FanOut::new(stream, DEFAULT_FANOUT_CAPACITY);
                response.body = ResponseBody::Stream(fanout.consumer(None));
                let verifier = fanout.consumer(Some(self.inner.lag_timeout));
                drop(fanout.start());
                VerificationData::Stream(verifier)
            }
        };

        self.spawn_verification(context, tx_id, strategy, data);
        Ok(response)
    }

    fn spawn_verification(
        &self,
        context: RequestContext,
        tx_id: String,
        strategy: Arc<dyn VerificationStrategy>,
        data: VerificationData,
    ) {
        let this = self.clone();
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                result = strategy.verify_data(data, &tx_id) => {
                    this.report(context, &tx_id, strategy.name(), &result);
                }
                _ = shutdown_rx.recv() => {
                    debug!(tx_id = %tx_id, "verification cancelled by shutdown");
                }
            }
        });
    }

    fn skip(&self, context: RequestContext, reason: String) {
        debug!(url = %context.original_url, reason = %reason, "verification skipped");
        metrics::record_verification("none", VerificationOutcome::Skipped);
        self.inner.events.emit(WayfinderEvent::VerificationSkipped { context, reason });
    }

    fn report(
        &self,
        context: RequestContext,
        tx_id: &str,
        strategy: &'static str,
        result: &Result<String, VerificationError>,
    ) {
        metrics::record_verification(strategy, VerificationOutcome::from(result));

        let event = match result {
            Ok(hash) => {
                info!(tx_id = tx_id, strategy = strategy, hash = %hash, "verification passed");
                WayfinderEvent::VerificationPassed {
                    context,
                    tx_id: tx_id.to_string(),
                    strategy: strategy.to_string(),
                    trusted_hash: hash.clone(),
                    computed_hash: hash.clone(),
                }
            }
            Err(e) => {
                info!(tx_id = tx_id, strategy = strategy, error = %e, "verification failed");
                let (trusted, computed) = e.hashes().unzip();
                WayfinderEvent::VerificationFailed {
                    context,
                    tx_id: tx_id.to_string(),
                    trusted_hash: trusted.map(str::to_string),
                    computed_hash: computed.map(str::to_string),
                    error: e.to_string(),
                }
            }
        };
        self.inner.events.emit(event);
    }

    /// Cancels in-flight verification tasks. New non-strict requests are still served
    /// but no longer verified.
    pub fn shutdown(&self) {
        if self.inner.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down wayfinder verification tasks");
        if self.inner.shutdown_tx.send(()).is_err() {
            debug!("no verification tasks in flight");
        }
    }
}

/// Transaction id to verify against: the reference itself, then the data id header,
/// then the resolved `ArNS` id header.
fn identify_transaction(reference: &Reference, response: &HttpResponse) -> Option<String> {
    reference
        .transaction_id()
        .or_else(|| response.header(DATA_ID_HEADER))
        .or_else(|| response.header(ARNS_RESOLVED_ID_HEADER))
        .map(str::to_string)
}
